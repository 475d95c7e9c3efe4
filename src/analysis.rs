//! Lint-style checks over a parsed schema.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{NormalizedSchema, RelationType, Table, split_ref};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    MissingPrimaryKey,
    /// A foreign key column that no index leads with, so joins and
    /// cascading deletes scan the whole table.
    UnindexedForeignKey,
    /// A relation whose target table is not part of the schema.
    DanglingRelation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{}.{}: {}", self.table, column, self.message),
            None => write!(f, "{}: {}", self.table, self.message),
        }
    }
}

/// Run every check, in table order.
pub fn analyze(schema: &NormalizedSchema) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (name, table) in &schema.tables {
        if !table.columns.values().any(|c| c.primary) {
            findings.push(Finding {
                kind: FindingKind::MissingPrimaryKey,
                table: name.clone(),
                column: None,
                message: "table has no primary key".to_string(),
            });
        }

        for (column_name, column) in &table.columns {
            if column.foreign_key.is_none() || column.primary || column.unique {
                continue;
            }
            if !leads_index(table, column_name) {
                findings.push(Finding {
                    kind: FindingKind::UnindexedForeignKey,
                    table: name.clone(),
                    column: Some(column_name.clone()),
                    message: format!(
                        "foreign key to {} is not covered by an index",
                        column.foreign_key.as_deref().unwrap_or_default()
                    ),
                });
            }
        }

        for relation in &table.relations {
            if relation.typ != RelationType::ManyToOne {
                continue;
            }
            let Some((target, _)) = split_ref(&relation.to) else {
                continue;
            };
            if !schema.tables.contains_key(target) {
                findings.push(Finding {
                    kind: FindingKind::DanglingRelation,
                    table: name.clone(),
                    column: split_ref(&relation.from).map(|(_, c)| c.to_string()),
                    message: format!("references missing table '{target}'"),
                });
            }
        }
    }

    findings
}

fn leads_index(table: &Table, column: &str) -> bool {
    table
        .indexes
        .iter()
        .any(|index| index.columns.first().map(String::as_str) == Some(column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parse_sql;

    #[test]
    fn test_clean_schema() {
        let schema = parse_sql(
            "CREATE TABLE users (id uuid PRIMARY KEY);
             CREATE TABLE posts (id uuid PRIMARY KEY, user_id uuid REFERENCES users(id));
             CREATE INDEX posts_user_idx ON posts (user_id, id);",
        )
        .schema;
        assert!(analyze(&schema).is_empty());
    }

    #[test]
    fn test_findings() {
        let schema = parse_sql(
            "CREATE TABLE logs (message text);
             CREATE TABLE posts (
               id int PRIMARY KEY,
               author int REFERENCES people(id),
               slug text
             );
             CREATE INDEX posts_slug_author ON posts (slug, author);",
        )
        .schema;

        let findings = analyze(&schema);
        let kinds: Vec<(FindingKind, &str, Option<&str>)> = findings
            .iter()
            .map(|f| (f.kind, f.table.as_str(), f.column.as_deref()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (FindingKind::MissingPrimaryKey, "logs", None),
                (FindingKind::UnindexedForeignKey, "posts", Some("author")),
                (FindingKind::DanglingRelation, "posts", Some("author")),
            ]
        );
        assert_eq!(findings[2].to_string(), "posts.author: references missing table 'people'");
    }

    #[test]
    fn test_unique_foreign_key_counts_as_indexed() {
        let schema = parse_sql(
            "CREATE TABLE users (id int PRIMARY KEY);
             CREATE TABLE profiles (id int PRIMARY KEY, user_id int UNIQUE REFERENCES users(id));",
        )
        .schema;
        assert!(analyze(&schema).is_empty());
    }
}
