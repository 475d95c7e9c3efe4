//! Prisma schema parser.
//!
//! Only scalar fields become columns. Relation fields (`author User
//! @relation(...)`, `posts Post[]`) are left out; the foreign-key-shaped
//! scalar next to them is linked by [`infer_relations`].

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::dialect::Dialect;
use crate::error::Error;
use crate::infer::infer_relations;
use crate::result::{ParsingResult, Report, check_extraction};
use crate::schema::{Column, Index, SchemaBuilder, Table};
use crate::sql::lexer::{enclosed, name_list, strip_script_comments};

/// Parse a Prisma schema into a normalized schema.
pub fn parse_prisma(input: &str) -> ParsingResult {
    match extract(input) {
        Ok(result) => result,
        Err(e) => ParsingResult::failure(Dialect::Prisma, e.to_string()),
    }
}

/// Map a Prisma scalar type to the shared vocabulary.
pub fn map_prisma_type(prisma_type: &str) -> String {
    match prisma_type {
        "String" => "text".to_string(),
        "Int" => "integer".to_string(),
        "DateTime" => "timestamp".to_string(),
        "Boolean" => "boolean".to_string(),
        "Json" => "jsonb".to_string(),
        other => other.to_string(),
    }
}

struct ModelBlock<'a> {
    name: &'a str,
    body: &'a str,
}

static MODEL_HEADER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*model\s+(\w+)\s*\{"));

fn extract(input: &str) -> Result<ParsingResult, Error> {
    let header = MODEL_HEADER.as_ref().map_err(|e| Error::Pattern(e.clone()))?;
    let mut report = Report::default();

    // Comments go first: an apostrophe in `// the user's email` must not
    // read as an open string while bodies are bounded.
    let source = strip_script_comments(input);
    let mut blocks = Vec::new();
    for caps in header.captures_iter(&source) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        match enclosed(&source, whole.end() - 1) {
            Some((body, _)) => blocks.push(ModelBlock {
                name: name.as_str(),
                body,
            }),
            None => report.skip(format!("Model '{}' skipped: missing closing brace", name.as_str())),
        }
    }

    if blocks.is_empty() {
        return Ok(ParsingResult::failure(Dialect::Prisma, "No model blocks found"));
    }

    let models: HashSet<&str> = blocks.iter().map(|b| b.name).collect();
    let mut builder = SchemaBuilder::new();

    for block in &blocks {
        let table_name = block.name.to_lowercase();
        let table = parse_model(&table_name, block.body, &models, &mut report);
        if builder.insert_table(table_name.clone(), table) {
            report.warn(format!(
                "Model '{}' maps to table '{table_name}' more than once; the last definition wins",
                block.name
            ));
        }
    }

    infer_relations(&mut builder);

    let schema = builder.finish();
    check_extraction(
        &schema,
        &mut report,
        "no <model>Id or <model>_id columns matched a model",
    );
    Ok(ParsingResult::new(Dialect::Prisma, schema, report))
}

fn parse_model(
    table_name: &str,
    body: &str,
    models: &HashSet<&str>,
    report: &mut Report,
) -> Table {
    let mut table = Table::default();
    let mut block_attributes = Vec::new();

    for raw in body.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("@@") {
            block_attributes.push(line);
            continue;
        }

        let mut tokens = line.split_whitespace();
        let (Some(field), Some(field_type)) = (tokens.next(), tokens.next()) else {
            report.skip(format!("Skipped field in model '{table_name}': {line}"));
            continue;
        };
        let attributes: Vec<&str> = tokens.collect();

        let optional = field_type.ends_with('?');
        let list = field_type.trim_end_matches('?').ends_with("[]");
        let base = field_type.trim_end_matches('?').trim_end_matches("[]");

        if models.contains(base) || attributes.iter().any(|a| a.starts_with("@relation")) {
            trace!(model = table_name, field, "relation field skipped");
            continue;
        }

        let mut typ = map_prisma_type(base);
        if list {
            typ.push_str("[]");
        }

        let mut column = Column::new(typ);
        column.nullable = optional;
        column.primary = attributes
            .iter()
            .any(|a| *a == "@id" || a.starts_with("@id("));
        column.unique = attributes
            .iter()
            .any(|a| *a == "@unique" || a.starts_with("@unique("));
        column.default = attribute_argument(line, "@default(").map(str::to_string);

        table.columns.insert(field.to_string(), column);
    }

    for attribute in block_attributes {
        apply_block_attribute(table_name, &mut table, attribute);
    }
    table
}

/// `@@index([a, b])`, `@@unique([a, b])` and `@@id([a, b])`.
fn apply_block_attribute(table_name: &str, table: &mut Table, attribute: &str) {
    let (kind, unique) = if attribute.starts_with("@@index(") {
        ("idx", false)
    } else if attribute.starts_with("@@unique(") {
        ("key", true)
    } else if attribute.starts_with("@@id(") {
        ("pkey", true)
    } else {
        return;
    };

    let Some(args) = attribute_argument(attribute, "(") else {
        return;
    };
    let Some(open) = args.find('[') else {
        return;
    };
    let Some((list, _)) = enclosed(args, open) else {
        return;
    };
    let columns = name_list(list);
    if columns.is_empty() {
        return;
    }

    if kind == "pkey" {
        for name in &columns {
            if let Some(column) = table.columns.get_mut(name) {
                column.primary = true;
            }
        }
        return;
    }

    let name = named_argument(args, "map")
        .or_else(|| named_argument(args, "name"))
        .unwrap_or_else(|| format!("{table_name}_{}_{kind}", columns.join("_")));
    table.indexes.push(Index {
        name,
        columns,
        unique,
    });
}

/// Text inside the parentheses that follow `prefix` (which must end in `(`).
fn attribute_argument<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let start = line.find(prefix)?;
    let open = start + prefix.len() - 1;
    enclosed(line, open).map(|(inner, _)| inner.trim())
}

/// Value of `key: "value"` inside an attribute argument list.
fn named_argument(args: &str, key: &str) -> Option<String> {
    let start = args.find(&format!("{key}:"))?;
    let rest = args[start + key.len() + 1..].trim_start();
    let rest = rest.strip_prefix('"')?;
    rest.find('"').map(|end| rest[..end].to_string())
}
