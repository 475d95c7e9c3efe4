//! Normalized, dialect-independent relational model.
//!
//! Every parser fills a [`SchemaBuilder`] and freezes it into a
//! [`NormalizedSchema`]; generators, the differ and the analyzer only ever
//! read the frozen value.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSchema {
    pub tables: IndexMap<String, Table>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: IndexMap<String, Column>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    #[serde(default)]
    pub indexes: Vec<Index>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl RelationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToOne => "one_to_one",
            Self::OneToMany => "one_to_many",
            Self::ManyToOne => "many_to_one",
            Self::ManyToMany => "many_to_many",
        }
    }
}

/// An edge between two columns, both written as `"<table>.<column>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "type")]
    pub typ: RelationType,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub table_count: usize,
    pub column_count: usize,
    pub relation_count: usize,
}

impl Column {
    /// Column of the given type with SQL defaults (nullable, no flags).
    pub fn new(typ: impl Into<String>) -> Self {
        Self {
            typ: typ.into(),
            nullable: true,
            primary: false,
            unique: false,
            default: None,
            foreign_key: None,
        }
    }
}

impl Relation {
    pub fn new(typ: RelationType, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            typ,
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Split `"<table>.<column>"` at the last dot.
pub fn split_ref(reference: &str) -> Option<(&str, &str)> {
    reference.rsplit_once('.')
}

impl NormalizedSchema {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Counts derived from the schema itself. Each resolved foreign key
    /// contributes exactly one `many_to_one` relation, so mirrored
    /// `one_to_many` entries are not counted twice.
    pub fn stats(&self) -> Stats {
        Stats {
            table_count: self.tables.len(),
            column_count: self.tables.values().map(|t| t.columns.len()).sum(),
            relation_count: self
                .tables
                .values()
                .flat_map(|t| &t.relations)
                .filter(|r| r.typ == RelationType::ManyToOne)
                .count(),
        }
    }

    /// JSON with object keys sorted, independent of map insertion order.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        // serde_json::Value keeps object keys in a sorted map.
        let value = serde_json::to_value(self)?;
        serde_json::to_string(&value)
    }

    /// blake3 hex digest of [`canonical_json`](Self::canonical_json), for
    /// spotting resubmissions that did not change anything.
    pub fn content_hash(&self) -> Result<String, serde_json::Error> {
        let json = self.canonical_json()?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// A foreign key found during the scan whose endpoints may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRelation {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// Mutable accumulator used while scanning source text.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    tables: IndexMap<String, Table>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Insert a table, replacing an earlier definition in place. Returns
    /// `true` when a table of that name already existed.
    pub fn insert_table(&mut self, name: impl Into<String>, table: Table) -> bool {
        let name = name.into();
        debug!(table = %name, columns = table.columns.len(), "table parsed");
        self.tables.insert(name, table).is_some()
    }

    /// Record `from_table.from_column -> to_table.to_column` as a foreign key
    /// with its mirrored inverse. A missing target table is tolerated and
    /// only the owning side is recorded. Returns `false` when the owning
    /// column does not exist.
    pub fn link(&mut self, pending: &PendingRelation) -> bool {
        let from = format!("{}.{}", pending.from_table, pending.from_column);
        let to = format!("{}.{}", pending.to_table, pending.to_column);

        let Some(source) = self.tables.get_mut(&pending.from_table) else {
            return false;
        };
        let Some(column) = source.columns.get_mut(&pending.from_column) else {
            return false;
        };
        column.foreign_key = Some(to.clone());
        source
            .relations
            .push(Relation::new(RelationType::ManyToOne, &from, &to));

        match self.tables.get_mut(&pending.to_table) {
            Some(target) => {
                target
                    .relations
                    .push(Relation::new(RelationType::OneToMany, &to, &from));
                debug!(%from, %to, "relation resolved");
            }
            None => warn!(%from, %to, "foreign key references a table not in the schema"),
        }
        true
    }

    pub fn finish(self) -> NormalizedSchema {
        NormalizedSchema {
            tables: self.tables,
        }
    }
}
