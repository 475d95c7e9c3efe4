//! Normalized column type vocabulary.

/// Map a dialect type token to the shared vocabulary
/// (`uuid, integer, text, timestamp, boolean, serial, jsonb`).
/// Anything else passes through lowercased, parameters included.
pub fn normalize_type(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let base = lower.split('(').next().unwrap_or(&lower).trim();

    match base {
        "uuid" => "uuid".to_string(),

        "int" | "int4" | "integer" => "integer".to_string(),

        "text" | "string" => "text".to_string(),

        "timestamp" | "timestamptz" | "timestamp with time zone"
        | "timestamp without time zone" | "datetime" => "timestamp".to_string(),

        "bool" | "boolean" => "boolean".to_string(),

        "serial" | "serial4" => "serial".to_string(),

        "json" | "jsonb" => "jsonb".to_string(),

        // Keep the original spelling, e.g. varchar(255) or numeric(10, 2).
        _ => lower,
    }
}
