//! Prisma schema emitter.

use super::{identifier, split_array};
use crate::schema::{Column, Index, NormalizedSchema, Table};

/// Serialize a schema to Prisma `model` blocks. Only scalar fields are
/// written; foreign keys stay plain scalar columns.
pub fn generate_prisma(schema: &NormalizedSchema) -> String {
    let mut output = String::new();

    for (i, (name, table)) in schema.tables.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        serialize_model(&mut output, name, table);
    }

    output
}

/// `users` -> `Users`. Parsing lowercases model names, so the table name
/// comes back unchanged when it was lowercase to begin with.
fn model_name(table: &str) -> String {
    let ident = identifier(table);
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => ident,
    }
}

fn serialize_model(output: &mut String, name: &str, table: &Table) {
    output.push_str(&format!("model {} {{\n", model_name(name)));

    let primary_count = table.columns.values().filter(|c| c.primary).count();
    for (column_name, column) in &table.columns {
        serialize_field(output, column_name, column, primary_count > 1);
    }

    if primary_count > 1 {
        let columns: Vec<&str> = table
            .columns
            .iter()
            .filter(|(_, c)| c.primary)
            .map(|(n, _)| n.as_str())
            .collect();
        output.push_str(&format!("\n  @@id([{}])\n", columns.join(", ")));
    }
    for index in &table.indexes {
        serialize_index(output, index);
    }

    output.push_str("}\n");
}

fn serialize_field(output: &mut String, name: &str, column: &Column, composite_pk: bool) {
    let (base, list) = split_array(&column.typ);
    let mut field_type = prisma_type(base).to_string();
    if list {
        field_type.push_str("[]");
    } else if column.nullable && !column.primary {
        field_type.push('?');
    }

    output.push_str(&format!("  {} {}", identifier(name), field_type));

    if column.primary && !composite_pk {
        output.push_str(" @id");
    }
    if column.unique {
        output.push_str(" @unique");
    }
    match column.default.as_deref() {
        Some(default) => output.push_str(&format!(" @default({})", prisma_default(default))),
        None if base == "serial" => output.push_str(" @default(autoincrement())"),
        None => {}
    }

    output.push('\n');
}

fn serialize_index(output: &mut String, index: &Index) {
    let attribute = if index.unique { "@@unique" } else { "@@index" };
    output.push_str(&format!(
        "  {}([{}], map: \"{}\")\n",
        attribute,
        index.columns.join(", "),
        index.name
    ));
}

fn prisma_type(typ: &str) -> &'static str {
    let lower = typ.to_lowercase();
    let base = lower.split('(').next().unwrap_or(&lower).trim();
    match base {
        "integer" | "int" | "serial" | "smallint" | "int4" | "int2" => "Int",
        "bigint" | "int8" | "bigserial" => "BigInt",
        "timestamp" | "date" | "datetime" => "DateTime",
        "boolean" | "bool" => "Boolean",
        "jsonb" | "json" => "Json",
        "real" | "float" | "double precision" | "float8" | "float4" => "Float",
        "numeric" | "decimal" => "Decimal",
        "bytea" | "bytes" => "Bytes",
        _ => "String",
    }
}

/// SQL string literals use single quotes; Prisma wants double quotes.
fn prisma_default(default: &str) -> String {
    match default
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
    {
        Some(inner) => format!("\"{}\"", inner.replace('"', "\\\"")),
        None => default.to_string(),
    }
}
