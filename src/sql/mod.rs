//! SQL DDL parsing.
//!
//! The lexer helpers and the type vocabulary are shared with the Prisma
//! and Drizzle parsers.

pub(crate) mod lexer;
mod parser;
pub mod types;

pub use parser::parse_sql;
pub use types::normalize_type;
