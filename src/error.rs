//! Error type for failures that are not reported through
//! [`ParsingResult`](crate::ParsingResult).

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown dialect: {0} (expected sql, prisma or drizzle)")]
    UnknownDialect(String),
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),
}
