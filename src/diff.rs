//! Structural diff between two schema snapshots.
//!
//! Changes come out grouped by [`ChangeType`] (declaration order), then by
//! table name, then by column or relation key. `diff(x, x)` is empty.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::schema::{Column, NormalizedSchema, Relation, RelationType, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    TableAdded,
    TableRemoved,
    ColumnAdded,
    ColumnRemoved,
    ColumnModified,
    RelationAdded,
    RelationRemoved,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::TableAdded => "table_added",
            ChangeType::TableRemoved => "table_removed",
            ChangeType::ColumnAdded => "column_added",
            ChangeType::ColumnRemoved => "column_removed",
            ChangeType::ColumnModified => "column_modified",
            ChangeType::RelationAdded => "relation_added",
            ChangeType::RelationRemoved => "relation_removed",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural difference.
///
/// `entity_name` is `"<table>"`, `"<table>.<column>"` or
/// `"<from> -> <to>"` depending on the level of the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub change_type: ChangeType,
    pub entity_name: String,
    pub details: Value,
}

impl Change {
    fn new(change_type: ChangeType, entity_name: impl Into<String>, details: Value) -> Self {
        Self {
            change_type,
            entity_name: entity_name.into(),
            details,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.change_type, self.entity_name)
    }
}

/// Compare two snapshots.
pub fn diff(before: &NormalizedSchema, after: &NormalizedSchema) -> Vec<Change> {
    let old_tables: BTreeSet<&str> = before.tables.keys().map(String::as_str).collect();
    let new_tables: BTreeSet<&str> = after.tables.keys().map(String::as_str).collect();

    let mut changes = Vec::new();

    for name in new_tables.difference(&old_tables) {
        changes.push(Change::new(
            ChangeType::TableAdded,
            *name,
            json!({ "table": after.tables[*name] }),
        ));
    }
    for name in old_tables.difference(&new_tables) {
        changes.push(Change::new(
            ChangeType::TableRemoved,
            *name,
            json!({ "table": before.tables[*name] }),
        ));
    }
    for name in old_tables.intersection(&new_tables) {
        diff_table(name, &before.tables[*name], &after.tables[*name], &mut changes);
    }

    // Iteration above is already ordered by table, then by column or
    // relation; a stable sort groups by kind without disturbing that.
    changes.sort_by_key(|c| c.change_type);
    debug!(count = changes.len(), "schema diff computed");
    changes
}

fn diff_table(name: &str, old: &Table, new: &Table, changes: &mut Vec<Change>) {
    let old_columns: BTreeSet<&str> = old.columns.keys().map(String::as_str).collect();
    let new_columns: BTreeSet<&str> = new.columns.keys().map(String::as_str).collect();

    for column in new_columns.difference(&old_columns) {
        changes.push(Change::new(
            ChangeType::ColumnAdded,
            format!("{name}.{column}"),
            json!({ "column": new.columns[*column] }),
        ));
    }
    for column in old_columns.difference(&new_columns) {
        changes.push(Change::new(
            ChangeType::ColumnRemoved,
            format!("{name}.{column}"),
            json!({ "column": old.columns[*column] }),
        ));
    }
    for column in old_columns.intersection(&new_columns) {
        let from = &old.columns[*column];
        let to = &new.columns[*column];
        let changed = changed_attributes(from, to);
        if !changed.is_empty() {
            changes.push(Change::new(
                ChangeType::ColumnModified,
                format!("{name}.{column}"),
                json!({ "from": from, "to": to, "changed": changed }),
            ));
        }
    }

    let old_relations: BTreeSet<(RelationType, &str, &str)> =
        old.relations.iter().map(relation_key).collect();
    let new_relations: BTreeSet<(RelationType, &str, &str)> =
        new.relations.iter().map(relation_key).collect();

    for key in new_relations.difference(&old_relations) {
        changes.push(relation_change(ChangeType::RelationAdded, key));
    }
    for key in old_relations.difference(&new_relations) {
        changes.push(relation_change(ChangeType::RelationRemoved, key));
    }
}

fn changed_attributes(from: &Column, to: &Column) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if from.typ != to.typ {
        changed.push("type");
    }
    if from.nullable != to.nullable {
        changed.push("nullable");
    }
    if from.primary != to.primary {
        changed.push("primary");
    }
    if from.unique != to.unique {
        changed.push("unique");
    }
    if from.default != to.default {
        changed.push("default");
    }
    if from.foreign_key != to.foreign_key {
        changed.push("foreign_key");
    }
    changed
}

fn relation_key(relation: &Relation) -> (RelationType, &str, &str) {
    (relation.typ, relation.from.as_str(), relation.to.as_str())
}

fn relation_change(change_type: ChangeType, key: &(RelationType, &str, &str)) -> Change {
    let (typ, from, to) = *key;
    Change::new(
        change_type,
        format!("{from} -> {to}"),
        json!({ "relation": Relation::new(typ, from, to) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parse_sql;

    fn schema(ddl: &str) -> NormalizedSchema {
        parse_sql(ddl).schema
    }

    #[test]
    fn test_identical_is_empty() {
        let s = schema(
            "CREATE TABLE users (id uuid PRIMARY KEY);
             CREATE TABLE posts (id uuid PRIMARY KEY, user_id uuid REFERENCES users(id));",
        );
        assert!(diff(&s, &s).is_empty());
        assert!(diff(&NormalizedSchema::default(), &NormalizedSchema::default()).is_empty());
    }

    #[test]
    fn test_unique_modification() {
        let a = schema("CREATE TABLE users (id uuid PRIMARY KEY, email text);");
        let b = schema("CREATE TABLE users (id uuid PRIMARY KEY, email text UNIQUE);");

        let changes = diff(&a, &b);
        assert_eq!(changes.len(), 1);
        let change = &changes[0];
        assert_eq!(change.change_type, ChangeType::ColumnModified);
        assert_eq!(change.entity_name, "users.email");
        assert_eq!(change.details["changed"], json!(["unique"]));
        assert_eq!(change.details["from"]["unique"], json!(false));
        assert_eq!(change.details["to"]["unique"], json!(true));
    }

    #[test]
    fn test_ordering_and_symmetry() {
        let a = schema(
            "CREATE TABLE users (id uuid PRIMARY KEY, name text);
             CREATE TABLE legacy (id int);",
        );
        let b = schema(
            "CREATE TABLE users (id uuid PRIMARY KEY, email text, age int);
             CREATE TABLE posts (id uuid PRIMARY KEY, user_id uuid REFERENCES users(id));",
        );

        let forward = diff(&a, &b);
        let kinds: Vec<(ChangeType, &str)> = forward
            .iter()
            .map(|c| (c.change_type, c.entity_name.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ChangeType::TableAdded, "posts"),
                (ChangeType::TableRemoved, "legacy"),
                (ChangeType::ColumnAdded, "users.age"),
                (ChangeType::ColumnAdded, "users.email"),
                (ChangeType::ColumnRemoved, "users.name"),
                (ChangeType::RelationAdded, "users.id -> posts.user_id"),
            ]
        );

        let backward = diff(&b, &a);
        assert_eq!(backward.len(), forward.len());
        let flipped = |t: ChangeType| match t {
            ChangeType::TableAdded => ChangeType::TableRemoved,
            ChangeType::TableRemoved => ChangeType::TableAdded,
            ChangeType::ColumnAdded => ChangeType::ColumnRemoved,
            ChangeType::ColumnRemoved => ChangeType::ColumnAdded,
            ChangeType::RelationAdded => ChangeType::RelationRemoved,
            ChangeType::RelationRemoved => ChangeType::RelationAdded,
            ChangeType::ColumnModified => ChangeType::ColumnModified,
        };
        for change in &forward {
            assert!(backward.iter().any(|c| c.entity_name == change.entity_name
                && c.change_type == flipped(change.change_type)));
        }
    }

    #[test]
    fn test_changed_relation_is_remove_plus_add() {
        let a = schema(
            "CREATE TABLE users (id int PRIMARY KEY);
             CREATE TABLE teams (id int PRIMARY KEY);
             CREATE TABLE posts (id int PRIMARY KEY, owner int REFERENCES users(id));",
        );
        let b = schema(
            "CREATE TABLE users (id int PRIMARY KEY);
             CREATE TABLE teams (id int PRIMARY KEY);
             CREATE TABLE posts (id int PRIMARY KEY, owner int REFERENCES teams(id));",
        );

        let changes = diff(&a, &b);
        let kinds: Vec<ChangeType> = changes.iter().map(|c| c.change_type).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeType::ColumnModified,
                ChangeType::RelationAdded,
                ChangeType::RelationAdded,
                ChangeType::RelationRemoved,
                ChangeType::RelationRemoved,
            ]
        );
        assert_eq!(changes[0].details["changed"], json!(["foreign_key"]));
        assert_eq!(changes[1].entity_name, "posts.owner -> teams.id");
        assert_eq!(changes[2].entity_name, "teams.id -> posts.owner");
    }

    #[test]
    fn test_serialized_tags() {
        let change = Change::new(ChangeType::TableAdded, "users", json!({}));
        let value = serde_json::to_value(&change).unwrap();
        assert_eq!(value["change_type"], json!("table_added"));
        assert_eq!(change.to_string(), "table_added users");
    }
}
