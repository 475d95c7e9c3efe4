//! Drizzle ORM table builder parser (`pgTable`).

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::dialect::Dialect;
use crate::error::Error;
use crate::infer::infer_relations;
use crate::result::{ParsingResult, Report, check_extraction};
use crate::schema::{Column, PendingRelation, SchemaBuilder, Table};
use crate::sql::lexer::{enclosed, split_top_level, strip_script_comments};
use crate::sql::types::normalize_type;

/// Parse Drizzle `pgTable` definitions into a normalized schema.
pub fn parse_drizzle(input: &str) -> ParsingResult {
    match extract(input) {
        Ok(result) => result,
        Err(e) => ParsingResult::failure(Dialect::Drizzle, e.to_string()),
    }
}

struct Patterns {
    table: Regex,
    column: Regex,
    references: Regex,
}

impl Patterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            table: Regex::new(
                r#"(?:export\s+)?const\s+(\w+)\s*=\s*pgTable\s*\(\s*["'`]([^"'`]+)["'`]\s*,\s*\{"#,
            )?,
            column: Regex::new(r#"^["']?(\w+)["']?\s*:\s*(\w+)\s*\("#)?,
            references: Regex::new(r"\.references\(\s*\(\s*\)\s*=>\s*(\w+)\.(\w+)")?,
        })
    }
}

static PATTERNS: LazyLock<Result<Patterns, regex::Error>> = LazyLock::new(Patterns::new);

struct TableBlock<'a> {
    table: String,
    body: &'a str,
}

fn extract(input: &str) -> Result<ParsingResult, Error> {
    let patterns = PATTERNS.as_ref().map_err(|e| Error::Pattern(e.clone()))?;
    let mut report = Report::default();
    // Without comments, a property's fragment starts at its key and an
    // apostrophe in `// the user's name` cannot unbalance a body.
    let source = strip_script_comments(input);

    // Variable name -> table name, for resolving `.references(() => var.col)`.
    let mut variables: HashMap<String, String> = HashMap::new();
    let mut blocks = Vec::new();
    let mut found = 0usize;

    for caps in patterns.table.captures_iter(&source) {
        let (Some(whole), Some(variable), Some(table)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        found += 1;
        let table = table.as_str().to_string();
        variables.insert(variable.as_str().to_string(), table.clone());

        match enclosed(&source, whole.end() - 1) {
            Some((body, _)) => blocks.push(TableBlock { table, body }),
            None => report.skip(format!("Table '{table}' skipped: missing closing brace")),
        }
    }

    if found == 0 {
        return Ok(ParsingResult::failure(
            Dialect::Drizzle,
            "No pgTable definitions found",
        ));
    }

    let mut builder = SchemaBuilder::new();
    let mut pending = Vec::new();

    for block in &blocks {
        let mut table = Table::default();
        for fragment in split_top_level(block.body, ',') {
            let Some(caps) = patterns.column.captures(&fragment) else {
                report.skip(format!(
                    "Skipped property in table '{}': {fragment}",
                    block.table
                ));
                continue;
            };
            let name = caps[1].to_string();
            let column = parse_column(&caps[2], &fragment);

            if let Some(refs) = patterns.references.captures(&fragment) {
                let to_table = variables
                    .get(&refs[1])
                    .cloned()
                    .unwrap_or_else(|| refs[1].to_string());
                pending.push(PendingRelation {
                    from_table: block.table.clone(),
                    from_column: name.clone(),
                    to_table,
                    to_column: refs[2].to_string(),
                });
            }
            table.columns.insert(name, column);
        }

        if builder.insert_table(block.table.clone(), table) {
            report.warn(format!(
                "Table '{}' is defined more than once; the last definition wins",
                block.table
            ));
        }
    }

    for relation in &pending {
        if !builder.link(relation) {
            report.skip(format!(
                "Reference {}.{} -> {}.{} skipped",
                relation.from_table, relation.from_column, relation.to_table, relation.to_column
            ));
        }
    }
    infer_relations(&mut builder);

    let schema = builder.finish();
    check_extraction(
        &schema,
        &mut report,
        "no .references() calls or _id/Id columns matched a table",
    );
    Ok(ParsingResult::new(Dialect::Drizzle, schema, report))
}

fn parse_column(builder_fn: &str, fragment: &str) -> Column {
    let mut column = Column::new(normalize_type(builder_fn));
    column.primary = fragment.contains(".primaryKey()");
    column.unique = fragment.contains(".unique(");
    column.nullable = !fragment.contains(".notNull()") && !column.primary;
    column.default = default_value(fragment);
    column
}

fn default_value(fragment: &str) -> Option<String> {
    if fragment.contains(".defaultNow()") {
        return Some("now()".to_string());
    }
    if fragment.contains(".defaultRandom()") {
        return Some("gen_random_uuid()".to_string());
    }

    let start = fragment.find(".default(")?;
    let (inner, _) = enclosed(fragment, start + ".default".len())?;
    let inner = inner.trim();
    // sql`now()` -> now()
    let value = inner
        .strip_prefix("sql`")
        .and_then(|s| s.strip_suffix('`'))
        .unwrap_or(inner);
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ParseStatus;
    use crate::schema::{Relation, RelationType};

    #[test]
    fn test_nullable_rules() {
        let src = r#"
            export const people = pgTable("people", {
              age: integer("age"),
            });
            export const members = pgTable("members", {
              age: integer("age").notNull().primaryKey(),
            });
        "#;
        let result = parse_drizzle(src);
        assert_eq!(result.status, ParseStatus::Success);

        let loose = &result.schema.table("people").unwrap().columns["age"];
        assert_eq!(loose.typ, "integer");
        assert!(loose.nullable);
        assert!(!loose.primary);

        let strict = &result.schema.table("members").unwrap().columns["age"];
        assert!(!strict.nullable);
        assert!(strict.primary);
    }

    #[test]
    fn test_multiline_chains_and_defaults() {
        let src = r#"
            import { pgTable, uuid, text, timestamp, boolean, jsonb } from "drizzle-orm/pg-core";
            import { sql } from "drizzle-orm";

            export const users = pgTable("users", {
              id: uuid("id")
                .primaryKey()
                .defaultRandom(),
              email: text("email").notNull().unique(),
              createdAt: timestamp("created_at").defaultNow(),
              active: boolean("active").default(true),
              settings: jsonb("settings").default(sql`'{}'::jsonb`),
            });
        "#;
        let result = parse_drizzle(src);
        let users = result.schema.table("users").unwrap();

        assert_eq!(users.columns.len(), 5);
        let id = &users.columns["id"];
        assert_eq!(id.typ, "uuid");
        assert!(id.primary);
        assert_eq!(id.default.as_deref(), Some("gen_random_uuid()"));

        let email = &users.columns["email"];
        assert!(email.unique);
        assert!(!email.nullable);

        assert_eq!(
            users.columns["createdAt"].default.as_deref(),
            Some("now()")
        );
        assert_eq!(users.columns["active"].default.as_deref(), Some("true"));
        assert_eq!(
            users.columns["settings"].default.as_deref(),
            Some("'{}'::jsonb")
        );
    }

    #[test]
    fn test_inferred_and_explicit_relations() {
        let src = r#"
            export const users = pgTable("users", {
              id: serial("id").primaryKey(),
            });
            export const accounts = pgTable("accounts", {
              id: serial("id").primaryKey(),
              user_id: integer("user_id").notNull(),
            });
            export const posts = pgTable("posts", {
              id: serial("id").primaryKey(),
              writer: integer("writer").references(() => users.id),
            });
        "#;
        let result = parse_drizzle(src);
        assert_eq!(result.stats.relation_count, 2);

        let accounts = result.schema.table("accounts").unwrap();
        assert_eq!(
            accounts.columns["user_id"].foreign_key.as_deref(),
            Some("users.id")
        );
        let posts = result.schema.table("posts").unwrap();
        assert_eq!(
            posts.relations,
            vec![Relation::new(RelationType::ManyToOne, "posts.writer", "users.id")]
        );
        assert_eq!(result.schema.table("users").unwrap().relations.len(), 2);
    }

    #[test]
    fn test_commented_properties() {
        let src = r#"
            // Accounts. Don't rename: the API depends on it.
            export const users = pgTable("users", {
              // primary key
              id: serial("id").primaryKey(),
              /* the user's login */
              email: text("email").notNull(), // can't be empty
              homepage: text("homepage").default("https://example.com"),
            });

            export const posts = pgTable("posts", {
              id: serial("id").primaryKey(),
              // author's account
              user_id: integer("user_id"),
            });
        "#;
        let result = parse_drizzle(src);
        assert_eq!(result.status, ParseStatus::Success);

        let users = result.schema.table("users").unwrap();
        assert_eq!(
            users.columns.keys().collect::<Vec<_>>(),
            vec!["id", "email", "homepage"]
        );
        assert!(users.columns["id"].primary);
        assert!(!users.columns["email"].nullable);
        assert_eq!(
            users.columns["homepage"].default.as_deref(),
            Some("\"https://example.com\"")
        );
        assert_eq!(
            result.schema.table("posts").unwrap().columns["user_id"].foreign_key.as_deref(),
            Some("users.id")
        );
    }

    #[test]
    fn test_no_tables_is_error() {
        for input in ["", "export const x = 1;", "CREATE TABLE users (id INT);"] {
            let result = parse_drizzle(input);
            assert_eq!(result.status, ParseStatus::Error);
            assert_eq!(result.errors.len(), 1);
        }
    }

    #[test]
    fn test_spread_property_is_partial() {
        let src = r#"
            export const notes = pgTable("notes", {
              id: serial("id").primaryKey(),
              ...timestamps,
            });
        "#;
        let result = parse_drizzle(src);
        assert_eq!(result.status, ParseStatus::Partial);
        assert_eq!(result.schema.table("notes").unwrap().columns.len(), 1);
    }
}
