use pretty_assertions::assert_eq;

use schemalens::{
    ChangeType, Dialect, NormalizedSchema, ParseStatus, RelationType, diff, generate, parse,
    parse_drizzle, parse_prisma, parse_sql,
};

const BLOG_SQL: &str = r#"
-- blog schema
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email TEXT NOT NULL UNIQUE,
    created_at TIMESTAMP DEFAULT now()
);

CREATE TABLE posts (
    id SERIAL PRIMARY KEY,
    user_id UUID REFERENCES users(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    published BOOLEAN DEFAULT false
);

CREATE TABLE comments (
    id SERIAL PRIMARY KEY,
    post_id INTEGER NOT NULL,
    body TEXT,
    FOREIGN KEY (post_id) REFERENCES posts(id)
);
"#;

fn blog() -> NormalizedSchema {
    let result = parse_sql(BLOG_SQL);
    assert_eq!(result.status, ParseStatus::Success);
    result.schema
}

#[test]
fn test_blog_stats() {
    let result = parse_sql(BLOG_SQL);
    assert_eq!(result.input_type, Dialect::Sql);
    assert_eq!(result.stats.table_count, 3);
    assert_eq!(result.stats.column_count, 10);
    assert_eq!(result.stats.relation_count, 2);
    assert!(result.errors.is_empty());
}

#[test]
fn test_round_trip_through_sql() {
    let schema = blog();
    let regenerated = parse(&generate(&schema, Dialect::Sql), Dialect::Sql);
    assert_eq!(regenerated.status, ParseStatus::Success);
    assert_eq!(regenerated.schema, schema);
}

#[test]
fn test_round_trip_through_drizzle() {
    let schema = blog();
    let regenerated = parse(&generate(&schema, Dialect::Drizzle), Dialect::Drizzle);
    assert_eq!(regenerated.schema, schema);
}

#[test]
fn test_prisma_round_trip_keeps_columns() {
    // Prisma has no FK syntax for scalars; `post_id` is re-linked by name
    // and `user_id` by the plural rule, so relations survive too.
    let schema = blog();
    let regenerated = parse(&generate(&schema, Dialect::Prisma), Dialect::Prisma).schema;

    assert_eq!(
        regenerated.tables.keys().collect::<Vec<_>>(),
        schema.tables.keys().collect::<Vec<_>>()
    );
    for (name, table) in &schema.tables {
        let other = &regenerated.tables[name];
        assert_eq!(
            other.columns.keys().collect::<Vec<_>>(),
            table.columns.keys().collect::<Vec<_>>()
        );
        for (column_name, column) in &table.columns {
            assert_eq!(other.columns[column_name].nullable, column.nullable, "{name}.{column_name}");
            assert_eq!(other.columns[column_name].primary, column.primary, "{name}.{column_name}");
            assert_eq!(other.columns[column_name].unique, column.unique, "{name}.{column_name}");
        }
    }
    assert_eq!(regenerated.stats().relation_count, 2);
}

#[test]
fn test_every_foreign_key_is_mirrored() {
    for schema in [
        blog(),
        parse_prisma("model User { id String @id }\nmodel Post { id String @id\n userId String }").schema,
    ] {
        for (name, table) in &schema.tables {
            for relation in table.relations.iter().filter(|r| r.typ == RelationType::ManyToOne) {
                assert!(relation.from.starts_with(&format!("{name}.")));
                let target = relation.to.split('.').next().unwrap();
                let mirrored = schema.tables[target].relations.iter().any(|r| {
                    r.typ == RelationType::OneToMany && r.from == relation.to && r.to == relation.from
                });
                assert!(mirrored, "{} -> {} has no inverse", relation.from, relation.to);
            }
        }
    }
}

#[test]
fn test_diff_is_idempotent_and_symmetric() {
    let before = blog();
    let after = parse_sql(
        "CREATE TABLE users (id UUID PRIMARY KEY, email TEXT NOT NULL, name TEXT);
         CREATE TABLE tags (id SERIAL PRIMARY KEY, label TEXT);",
    )
    .schema;

    assert!(diff(&before, &before).is_empty());
    assert!(diff(&after, &after).is_empty());

    let forward = diff(&before, &after);
    let backward = diff(&after, &before);
    let count = |changes: &[schemalens::Change], t: ChangeType| {
        changes.iter().filter(|c| c.change_type == t).count()
    };
    assert_eq!(
        count(&forward, ChangeType::TableAdded),
        count(&backward, ChangeType::TableRemoved)
    );
    assert_eq!(
        count(&forward, ChangeType::ColumnAdded),
        count(&backward, ChangeType::ColumnRemoved)
    );
    assert_eq!(
        count(&forward, ChangeType::ColumnModified),
        count(&backward, ChangeType::ColumnModified)
    );

    let mut sorted = forward.clone();
    sorted.sort_by_key(|c| c.change_type);
    assert_eq!(sorted, forward);
}

#[test]
fn test_no_tables_is_error_for_every_dialect() {
    for dialect in Dialect::ALL {
        for input in ["", "   \n\t", "hello world"] {
            let result = parse(input, dialect);
            assert_eq!(result.status, ParseStatus::Error, "{dialect}: {input:?}");
            assert_eq!(result.errors.len(), 1);
            assert!(result.schema.is_empty());
            assert_eq!(result.stats.table_count, 0);
        }
    }
}

#[test]
fn test_drizzle_scenario() {
    let result = parse_drizzle(
        r#"
        export const users = pgTable("users", {
          id: uuid("id").primaryKey(),
        });
        export const posts = pgTable("posts", {
          id: uuid("id").primaryKey(),
          user_id: uuid("user_id").notNull(),
        });
        "#,
    );
    assert_eq!(result.status, ParseStatus::Success);
    let posts = result.schema.table("posts").unwrap();
    assert_eq!(posts.columns["user_id"].foreign_key.as_deref(), Some("users.id"));
    assert!(!posts.columns["user_id"].nullable);
}

#[test]
fn test_content_hash_tracks_content() {
    let a = blog();
    let b = parse_sql(&generate(&a, Dialect::Sql)).schema;
    assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());

    let c = parse_sql(&BLOG_SQL.replace("body TEXT", "body VARCHAR(500)")).schema;
    assert_ne!(a.content_hash().unwrap(), c.content_hash().unwrap());
}
