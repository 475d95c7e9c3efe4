//! Parser output contract.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::schema::{NormalizedSchema, Stats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    Success,
    /// Tables were extracted but some fragments had to be skipped.
    Partial,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingResult {
    pub status: ParseStatus,
    pub input_type: Dialect,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub schema: NormalizedSchema,
    pub stats: Stats,
}

/// Diagnostics collected by a parser while it scans.
#[derive(Debug, Default)]
pub(crate) struct Report {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Set when part of the input was skipped.
    pub partial: bool,
}

impl Report {
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn skip(&mut self, message: impl Into<String>) {
        self.partial = true;
        self.warnings.push(message.into());
    }
}

impl ParsingResult {
    pub(crate) fn new(input_type: Dialect, schema: NormalizedSchema, report: Report) -> Self {
        let status = if !report.errors.is_empty() {
            ParseStatus::Error
        } else if report.partial {
            ParseStatus::Partial
        } else {
            ParseStatus::Success
        };

        Self {
            status,
            input_type,
            errors: report.errors,
            warnings: report.warnings,
            stats: schema.stats(),
            schema,
        }
    }

    /// Result for input with no recognizable structure, or for an internal
    /// failure while parsing it.
    pub(crate) fn failure(input_type: Dialect, message: impl Into<String>) -> Self {
        let report = Report {
            errors: vec![message.into()],
            ..Report::default()
        };
        Self::new(input_type, NormalizedSchema::default(), report)
    }

    pub fn is_error(&self) -> bool {
        self.status == ParseStatus::Error
    }
}

/// Warnings shared by every dialect for a schema that parsed but looks thin.
pub(crate) fn check_extraction(schema: &NormalizedSchema, report: &mut Report, relation_hint: &str) {
    for (name, table) in &schema.tables {
        if table.columns.is_empty() {
            report.warn(format!("Table '{name}' has no columns"));
        }
    }
    if schema.stats().relation_count == 0 {
        report.warn(format!(
            "No relationships found ({relation_hint}); the diagram will show tables only"
        ));
    }
}
