//! Name-based foreign key inference for dialects whose relation syntax is
//! not modeled (Prisma, Drizzle).
//!
//! A column named `<stem>_id` or `<stem>Id` is linked to `<table>.id` when a
//! table matching the stem exists. This both misses unconventional names and
//! links columns that only happen to match a table name; callers rely on
//! exactly this behavior, so it is kept deliberately loose.

use tracing::debug;

use crate::schema::{PendingRelation, SchemaBuilder};

/// Table names tried for a column, in order of preference.
pub fn candidate_tables(column: &str) -> Vec<String> {
    if column == "id" {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    if let Some(stem) = column.strip_suffix("_id").filter(|s| !s.is_empty()) {
        // snake_case tables are usually plural: user_id -> users
        candidates.push(format!("{stem}s"));
        candidates.push(stem.to_string());
    } else if let Some(stem) = column.strip_suffix("Id").filter(|s| !s.is_empty()) {
        candidates.push(stem.to_string());
        let lower = stem.to_lowercase();
        if lower != stem {
            candidates.push(lower);
        }
    }
    candidates
}

/// Link every foreign-key-shaped column that has no explicit reference yet.
/// Returns the number of relations added.
pub fn infer_relations(builder: &mut SchemaBuilder) -> usize {
    let mut inferred = Vec::new();

    for table_name in builder.table_names() {
        let Some(table) = builder.table(table_name) else {
            continue;
        };
        for (column_name, column) in &table.columns {
            if column.foreign_key.is_some() {
                continue;
            }
            let target = candidate_tables(column_name)
                .into_iter()
                .find(|candidate| builder.contains_table(candidate));
            if let Some(target) = target {
                inferred.push(PendingRelation {
                    from_table: table_name.to_string(),
                    from_column: column_name.clone(),
                    to_table: target,
                    to_column: "id".to_string(),
                });
            }
        }
    }

    let mut count = 0;
    for pending in &inferred {
        if builder.link(pending) {
            debug!(
                table = %pending.from_table,
                column = %pending.from_column,
                target = %pending.to_table,
                "relation inferred"
            );
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Table};

    fn builder_with(tables: &[(&str, &[&str])]) -> SchemaBuilder {
        let mut builder = SchemaBuilder::new();
        for (name, columns) in tables {
            let mut table = Table::default();
            for column in *columns {
                table
                    .columns
                    .insert(column.to_string(), Column::new("integer"));
            }
            builder.insert_table(*name, table);
        }
        builder
    }

    #[test]
    fn test_candidates() {
        assert_eq!(candidate_tables("user_id"), vec!["users", "user"]);
        assert_eq!(candidate_tables("blogPostId"), vec!["blogPost", "blogpost"]);
        assert_eq!(candidate_tables("userId"), vec!["user"]);
        assert!(candidate_tables("id").is_empty());
        assert!(candidate_tables("Id").is_empty());
        assert!(candidate_tables("_id").is_empty());
        assert!(candidate_tables("email").is_empty());
    }

    #[test]
    fn test_plural_preferred_over_singular() {
        let mut builder = builder_with(&[
            ("user", &["id"]),
            ("users", &["id"]),
            ("posts", &["id", "user_id"]),
        ]);
        assert_eq!(infer_relations(&mut builder), 1);
        let schema = builder.finish();
        assert_eq!(
            schema.tables["posts"].columns["user_id"].foreign_key.as_deref(),
            Some("users.id")
        );
        assert_eq!(schema.tables["users"].relations.len(), 1);
        assert!(schema.tables["user"].relations.is_empty());
    }

    #[test]
    fn test_false_positive_is_kept() {
        // `state_id` holds an order's workflow state, yet it still links to
        // the unrelated `states` (regions) table.
        let mut builder = builder_with(&[
            ("states", &["id"]),
            ("orders", &["id", "state_id", "legacy_ref"]),
        ]);
        assert_eq!(infer_relations(&mut builder), 1);
        let schema = builder.finish();
        assert_eq!(
            schema.tables["orders"].columns["state_id"].foreign_key.as_deref(),
            Some("states.id")
        );
        assert_eq!(schema.tables["orders"].columns["legacy_ref"].foreign_key, None);
    }

    #[test]
    fn test_irregular_plural_is_missed() {
        // The plural rule only appends `s`: status_id -> statuss, status.
        let mut builder = builder_with(&[
            ("statuses", &["id"]),
            ("orders", &["id", "status_id"]),
        ]);
        assert_eq!(infer_relations(&mut builder), 0);
        assert_eq!(candidate_tables("status_id"), vec!["statuss", "status"]);
    }

    #[test]
    fn test_unmatched_names_are_not_linked() {
        let mut builder = builder_with(&[("people", &["id"]), ("posts", &["id", "person_id"])]);
        assert_eq!(infer_relations(&mut builder), 0);
    }

    #[test]
    fn test_explicit_reference_not_overridden() {
        let mut builder = builder_with(&[("users", &["id"]), ("posts", &["id", "user_id"])]);
        if let Some(posts) = builder.table_mut("posts") {
            if let Some(column) = posts.columns.get_mut("user_id") {
                column.foreign_key = Some("accounts.id".to_string());
            }
        }
        assert_eq!(infer_relations(&mut builder), 0);
    }
}
