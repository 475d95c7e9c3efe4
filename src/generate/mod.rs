//! Emitters that turn a [`NormalizedSchema`] back into dialect source.
//!
//! Generators are total: a type with no mapping in the target dialect falls
//! back to that dialect's text type. Tables and columns are written in
//! schema order.

mod drizzle;
mod prisma;
mod sql;

pub use drizzle::generate_drizzle;
pub use prisma::generate_prisma;
pub use sql::generate_sql;

use crate::dialect::Dialect;
use crate::schema::NormalizedSchema;

/// Render `schema` as source text in `dialect`.
pub fn generate(schema: &NormalizedSchema, dialect: Dialect) -> String {
    match dialect {
        Dialect::Sql => generate_sql(schema),
        Dialect::Prisma => generate_prisma(schema),
        Dialect::Drizzle => generate_drizzle(schema),
    }
}

/// Replace anything that is not a valid identifier character with `_`.
fn identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

/// Base type name and whether it carries an array suffix.
fn split_array(typ: &str) -> (&str, bool) {
    match typ.strip_suffix("[]") {
        Some(base) => (base, true),
        None => (typ, false),
    }
}
