//! Schema source dialects and detection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Source language of a schema submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `CREATE TABLE` style DDL
    Sql,
    /// `model X { ... }` blocks
    Prisma,
    /// `pgTable("x", { ... })` builders
    Drizzle,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Self::Sql, Self::Prisma, Self::Drizzle];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sql => "sql",
            Self::Prisma => "prisma",
            Self::Drizzle => "drizzle",
        }
    }

    /// Guess the dialect from source content. Falls back to SQL.
    pub fn detect(content: &str) -> Self {
        if content.contains("pgTable(") {
            return Self::Drizzle;
        }

        let has_model_block = content.lines().any(|line| {
            let mut words = line.split_whitespace();
            words.next() == Some("model")
                && words.next().is_some()
                && line.trim_end().ends_with('{')
        });
        if has_model_block {
            return Self::Prisma;
        }

        Self::Sql
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sql" | "ddl" | "postgres" | "postgresql" | "mysql" => Ok(Self::Sql),
            "prisma" => Ok(Self::Prisma),
            "drizzle" => Ok(Self::Drizzle),
            _ => Err(Error::UnknownDialect(s.to_string())),
        }
    }
}
