//! SQL DDL emitter.

use crate::schema::{Column, NormalizedSchema, RelationType, Table, split_ref};

/// Serialize a schema to `CREATE TABLE` statements, followed by one
/// `ALTER TABLE ... ADD CONSTRAINT` per foreign key and the indexes, so
/// that every referenced table exists before it is referenced.
pub fn generate_sql(schema: &NormalizedSchema) -> String {
    let mut output = String::new();

    for (i, (name, table)) in schema.tables.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        serialize_table(&mut output, name, table);
    }

    let mut foreign_keys = Vec::new();
    for (name, table) in &schema.tables {
        for relation in &table.relations {
            if relation.typ != RelationType::ManyToOne {
                continue;
            }
            let (Some((_, column)), Some((target, target_column))) =
                (split_ref(&relation.from), split_ref(&relation.to))
            else {
                continue;
            };
            foreign_keys.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});\n",
                quote(name),
                quote(&format!("fk_{name}_{column}")),
                quote(column),
                quote(target),
                quote(target_column)
            ));
        }
    }
    if !foreign_keys.is_empty() {
        output.push('\n');
        for statement in foreign_keys {
            output.push_str(&statement);
        }
    }

    let mut indexes = Vec::new();
    for (name, table) in &schema.tables {
        for index in &table.indexes {
            let columns: Vec<String> = index.columns.iter().map(|c| quote(c)).collect();
            indexes.push(format!(
                "CREATE {}INDEX {} ON {} ({});\n",
                if index.unique { "UNIQUE " } else { "" },
                quote(&index.name),
                quote(name),
                columns.join(", ")
            ));
        }
    }
    if !indexes.is_empty() {
        output.push('\n');
        for statement in indexes {
            output.push_str(&statement);
        }
    }

    output
}

fn serialize_table(output: &mut String, name: &str, table: &Table) {
    output.push_str(&format!("CREATE TABLE {} (\n", quote(name)));

    let primary: Vec<&str> = table
        .columns
        .iter()
        .filter(|(_, c)| c.primary)
        .map(|(n, _)| n.as_str())
        .collect();
    let composite = primary.len() > 1;

    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|(column_name, column)| serialize_column(column_name, column, composite))
        .collect();
    if composite {
        let columns: Vec<String> = primary.iter().map(|c| quote(c)).collect();
        lines.push(format!("    PRIMARY KEY ({})", columns.join(", ")));
    }

    output.push_str(&lines.join(",\n"));
    output.push_str("\n);\n");
}

fn serialize_column(name: &str, column: &Column, composite_pk: bool) -> String {
    let mut line = format!("    {} {}", quote(name), sql_type(&column.typ));

    // Modifiers in order: primary key, unique, not null, default
    let inline_pk = column.primary && !composite_pk;
    if inline_pk {
        line.push_str(" PRIMARY KEY");
    }
    if column.unique {
        line.push_str(" UNIQUE");
    }
    if !column.nullable && !inline_pk {
        line.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        line.push_str(&format!(" DEFAULT {default}"));
    }
    line
}

/// Map a normalized type to a SQL type. Types from other dialects are
/// translated; anything unrecognizable becomes `text`.
fn sql_type(typ: &str) -> String {
    let mapped = match typ {
        "String" => "text",
        "Int" => "integer",
        "BigInt" => "bigint",
        "Float" => "double precision",
        "Decimal" => "numeric",
        "Bytes" => "bytea",
        "DateTime" => "timestamp",
        "Boolean" => "boolean",
        "Json" => "jsonb",
        _ => "",
    };
    if !mapped.is_empty() {
        return mapped.to_string();
    }

    let plausible = !typ.is_empty()
        && typ.starts_with(|c: char| c.is_ascii_alphabetic())
        && typ
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || " _(),[]".contains(c));
    if plausible {
        typ.to_lowercase()
    } else {
        "text".to_string()
    }
}

/// Quote identifiers that would not survive unquoted.
fn quote(ident: &str) -> String {
    let plain = !ident.is_empty()
        && !ident.starts_with(|c: char| c.is_ascii_digit())
        && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}
