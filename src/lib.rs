//! Schema ingestion for SQL DDL, Prisma and Drizzle sources.
//!
//! Each dialect parser produces a [`ParsingResult`] around one shared
//! [`NormalizedSchema`]. Schemas can be rendered back into any dialect,
//! diffed against an earlier version, or checked for common mistakes.

pub mod analysis;
pub mod dialect;
pub mod diff;
pub mod drizzle;
pub mod error;
pub mod generate;
pub mod infer;
pub mod prisma;
pub mod result;
pub mod schema;
pub mod sql;

use wasm_bindgen::prelude::*;

pub use analysis::{Finding, FindingKind, analyze};
pub use dialect::Dialect;
pub use diff::{Change, ChangeType, diff};
pub use drizzle::parse_drizzle;
pub use error::Error;
pub use generate::{generate, generate_drizzle, generate_prisma, generate_sql};
pub use prisma::parse_prisma;
pub use result::{ParseStatus, ParsingResult};
pub use schema::{Column, Index, NormalizedSchema, Relation, RelationType, Stats, Table};
pub use sql::parse_sql;

/// Parse `input` with the parser for `dialect`.
pub fn parse(input: &str, dialect: Dialect) -> ParsingResult {
    match dialect {
        Dialect::Sql => parse_sql(input),
        Dialect::Prisma => parse_prisma(input),
        Dialect::Drizzle => parse_drizzle(input),
    }
}

/// Resolve an optional dialect name, sniffing `source` when it is absent.
pub fn resolve_dialect(name: Option<&str>, source: &str) -> Result<Dialect, Error> {
    match name {
        Some(name) => name.parse(),
        None => Ok(Dialect::detect(source)),
    }
}

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Parse schema source to `ParsingResult` JSON
#[wasm_bindgen(js_name = "parseSchema")]
pub fn parse_schema(source: &str, dialect: Option<String>) -> Result<String, String> {
    let dialect = resolve_dialect(dialect.as_deref(), source).map_err(|e| e.to_string())?;
    let result = parse(source, dialect);
    serde_json::to_string(&result).map_err(|e| e.to_string())
}

/// Diff two `NormalizedSchema` JSON documents
#[wasm_bindgen(js_name = "diffSchemas")]
pub fn diff_schemas(before: &str, after: &str) -> Result<String, String> {
    let before = schema_from_json(before).map_err(|e| e.to_string())?;
    let after = schema_from_json(after).map_err(|e| e.to_string())?;
    serde_json::to_string(&diff(&before, &after)).map_err(|e| e.to_string())
}

/// Parse source in one dialect and render it in another
#[wasm_bindgen(js_name = "convertSchema")]
pub fn convert_schema(source: &str, from: Option<String>, to: &str) -> Result<String, String> {
    let from = resolve_dialect(from.as_deref(), source).map_err(|e| e.to_string())?;
    let to: Dialect = to.parse().map_err(|e: Error| e.to_string())?;

    let result = parse(source, from);
    if result.is_error() {
        return Err(result.errors.join("; "));
    }
    Ok(generate(&result.schema, to))
}

/// Run the schema checks on `NormalizedSchema` JSON
#[wasm_bindgen(js_name = "analyzeSchema")]
pub fn analyze_schema(schema: &str) -> Result<String, String> {
    let schema = schema_from_json(schema).map_err(|e| e.to_string())?;
    serde_json::to_string(&analyze(&schema)).map_err(|e| e.to_string())
}

fn schema_from_json(json: &str) -> Result<NormalizedSchema, Error> {
    Ok(serde_json::from_str(json)?)
}
