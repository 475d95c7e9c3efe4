//! Drizzle ORM (`drizzle-orm/pg-core`) emitter.

use std::collections::{BTreeSet, HashMap};

use super::{identifier, split_array};
use crate::schema::{Column, NormalizedSchema, Table, split_ref};

/// Serialize a schema to `pgTable` declarations with their imports.
pub fn generate_drizzle(schema: &NormalizedSchema) -> String {
    let variables: HashMap<&str, String> = schema
        .tables
        .keys()
        .map(|name| (name.as_str(), identifier(name)))
        .collect();

    let mut builders: BTreeSet<&'static str> = BTreeSet::new();
    builders.insert("pgTable");
    let mut uses_sql = false;

    let mut body = String::new();
    for (name, table) in &schema.tables {
        body.push('\n');
        serialize_table(
            &mut body,
            name,
            table,
            &variables,
            &mut builders,
            &mut uses_sql,
        );
    }

    let mut output = format!(
        "import {{ {} }} from \"drizzle-orm/pg-core\";\n",
        builders.into_iter().collect::<Vec<_>>().join(", ")
    );
    if uses_sql {
        output.push_str("import { sql } from \"drizzle-orm\";\n");
    }
    output.push_str(&body);
    output
}

fn serialize_table(
    output: &mut String,
    name: &str,
    table: &Table,
    variables: &HashMap<&str, String>,
    builders: &mut BTreeSet<&'static str>,
    uses_sql: &mut bool,
) {
    let variable = variables
        .get(name)
        .cloned()
        .unwrap_or_else(|| identifier(name));
    output.push_str(&format!(
        "export const {} = pgTable(\"{}\", {{\n",
        variable,
        escape(name)
    ));

    for (column_name, column) in &table.columns {
        let (builder, options) = drizzle_builder(&column.typ);
        builders.insert(builder);

        output.push_str(&format!(
            "  {}: {}(\"{}\"{})",
            identifier(column_name),
            builder,
            escape(column_name),
            options
        ));
        if split_array(&column.typ).1 {
            output.push_str(".array()");
        }
        serialize_chain(output, column, variables, uses_sql);
        output.push_str(",\n");
    }

    output.push_str("});\n");
}

fn serialize_chain(
    output: &mut String,
    column: &Column,
    variables: &HashMap<&str, String>,
    uses_sql: &mut bool,
) {
    if column.primary {
        output.push_str(".primaryKey()");
    } else if !column.nullable {
        output.push_str(".notNull()");
    }
    if column.unique {
        output.push_str(".unique()");
    }

    match column.default.as_deref() {
        Some("now()") => output.push_str(".defaultNow()"),
        Some("gen_random_uuid()") => output.push_str(".defaultRandom()"),
        Some(default) if is_js_literal(default) => {
            output.push_str(&format!(".default({default})"));
        }
        Some(default) => {
            *uses_sql = true;
            output.push_str(&format!(".default(sql`{}`)", default.replace('`', "\\`")));
        }
        None => {}
    }

    if let Some((target, target_column)) = column.foreign_key.as_deref().and_then(split_ref) {
        let variable = variables
            .get(target)
            .cloned()
            .unwrap_or_else(|| identifier(target));
        output.push_str(&format!(
            ".references(() => {}.{})",
            variable,
            identifier(target_column)
        ));
    }
}

/// Builder function and extra arguments for a normalized type.
fn drizzle_builder(typ: &str) -> (&'static str, &'static str) {
    let (base, _) = split_array(typ);
    let lower = base.to_lowercase();
    let name = lower.split('(').next().unwrap_or(&lower).trim();
    match name {
        "uuid" => ("uuid", ""),
        "integer" | "int" | "int4" => ("integer", ""),
        "smallint" | "int2" => ("smallint", ""),
        "bigint" | "int8" => ("bigint", ", { mode: \"number\" }"),
        "serial" => ("serial", ""),
        "bigserial" => ("bigserial", ", { mode: \"number\" }"),
        "timestamp" | "datetime" => ("timestamp", ""),
        "date" => ("date", ""),
        "boolean" | "bool" => ("boolean", ""),
        "jsonb" => ("jsonb", ""),
        "json" => ("json", ""),
        "varchar" => ("varchar", ""),
        "numeric" | "decimal" => ("numeric", ""),
        "real" => ("real", ""),
        _ => ("text", ""),
    }
}

fn is_js_literal(value: &str) -> bool {
    value == "true" || value == "false" || value.parse::<f64>().is_ok()
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
