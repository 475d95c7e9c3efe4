//! SQL parser for CREATE TABLE, ALTER TABLE ... ADD and CREATE INDEX
//! statements.
//!
//! Best-effort textual extraction: each statement is matched by its header,
//! table bodies are split into top-level fragments and every fragment is
//! classified on its own. Foreign keys are queued while scanning and
//! resolved once every table is known.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::lexer::{
    collapse_whitespace, enclosed, name_list, object_name, split_top_level, strip_comments,
    unquote, words,
};
use super::types::normalize_type;
use crate::dialect::Dialect;
use crate::error::Error;
use crate::result::{ParsingResult, Report, check_extraction};
use crate::schema::{Column, Index, PendingRelation, SchemaBuilder, Table};

/// Optionally schema-qualified, optionally quoted identifier.
const IDENT: &str = r#"(?:(?:"[^"]*"|`[^`]*`|\[[^\]]*\]|[^\s(),."`\[]+)\.)*(?:"[^"]*"|`[^`]*`|\[[^\]]*\]|[^\s(),."`\[]+)"#;

/// Words that end a column's type or default expression.
const COLUMN_KEYWORDS: &[&str] = &[
    "NOT",
    "NULL",
    "PRIMARY",
    "UNIQUE",
    "DEFAULT",
    "REFERENCES",
    "CONSTRAINT",
    "CHECK",
    "GENERATED",
    "AUTO_INCREMENT",
    "AUTOINCREMENT",
    "COLLATE",
    "ON",
];

/// Parse SQL DDL into a normalized schema.
pub fn parse_sql(input: &str) -> ParsingResult {
    match extract(input) {
        Ok(result) => result,
        Err(e) => ParsingResult::failure(Dialect::Sql, e.to_string()),
    }
}

fn extract(input: &str) -> Result<ParsingResult, Error> {
    let patterns = PATTERNS.as_ref().map_err(|e| Error::Pattern(e.clone()))?;
    let cleaned = collapse_whitespace(&strip_comments(input));

    let mut parser = Parser {
        patterns,
        builder: SchemaBuilder::new(),
        pending: Vec::new(),
        report: Report::default(),
    };
    for statement in split_top_level(&cleaned, ';') {
        parser.statement(&statement);
    }

    if parser.builder.table_names().next().is_none() {
        return Ok(ParsingResult::failure(
            Dialect::Sql,
            "No CREATE TABLE statements found",
        ));
    }

    Ok(parser.finish())
}

struct Patterns {
    create_table: Regex,
    alter_table: Regex,
    create_index: Regex,
    foreign_key: Regex,
    primary_key: Regex,
    unique: Regex,
    ignored_constraint: Regex,
    references: Regex,
    add_prefix: Regex,
}

static PATTERNS: LazyLock<Result<Patterns, regex::Error>> = LazyLock::new(Patterns::new);

impl Patterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            create_table: Regex::new(&format!(
                r"(?i)^CREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:GLOBAL|LOCAL)\s+)?(?:(?:TEMP|TEMPORARY|UNLOGGED)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?({IDENT})\s*\("
            ))?,
            alter_table: Regex::new(&format!(
                r"(?i)^ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?({IDENT})\s+(ADD\b.*)$"
            ))?,
            create_index: Regex::new(&format!(
                r"(?i)^CREATE\s+(UNIQUE\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?(?:({IDENT})\s+)?ON\s+(?:ONLY\s+)?({IDENT})\s*(?:USING\s+\w+\s*)?\("
            ))?,
            foreign_key: Regex::new(&format!(
                r"(?i)FOREIGN\s+KEY\s*\(([^)]*)\)\s*REFERENCES\s+({IDENT})\s*(?:\(([^)]*)\))?"
            ))?,
            primary_key: Regex::new(&format!(
                r"(?i)^(?:CONSTRAINT\s+{IDENT}\s+)?PRIMARY\s+KEY\s*\(([^)]*)\)"
            ))?,
            unique: Regex::new(&format!(
                r"(?i)^(?:CONSTRAINT\s+({IDENT})\s+)?UNIQUE(?:\s+(?:KEY|INDEX))?(?:\s+({IDENT}))?\s*\(([^)]*)\)"
            ))?,
            ignored_constraint: Regex::new(&format!(
                r"(?i)^(?:CONSTRAINT\s+{IDENT}\s+)?(?:CHECK\s*\(|(?:KEY|INDEX)(?:\s+{IDENT})?\s*\(\s*[^\d\s]|(?:FULLTEXT|SPATIAL)\s+(?:KEY|INDEX)\b|EXCLUDE\b)"
            ))?,
            references: Regex::new(&format!(
                r"(?i)\bREFERENCES\s+({IDENT})\s*(?:\(([^)]*)\))?"
            ))?,
            add_prefix: Regex::new(r"(?i)^ADD\s+(COLUMN\s+(?:IF\s+NOT\s+EXISTS\s+)?)?")?,
        })
    }
}

/// How a single body fragment reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fragment {
    ForeignKey,
    PrimaryKey,
    Unique,
    Ignored,
    Column,
}

struct Parser<'p> {
    patterns: &'p Patterns,
    builder: SchemaBuilder,
    pending: Vec<PendingRelation>,
    report: Report,
}

impl Parser<'_> {
    fn statement(&mut self, statement: &str) {
        if let Some(caps) = self.patterns.create_table.captures(statement) {
            let name = object_name(&caps[1]);
            // The match ends on the opening paren of the body.
            let open = caps.get(0).map_or(0, |m| m.end() - 1);
            self.create_table(name, statement, open);
        } else if let Some(caps) = self.patterns.alter_table.captures(statement) {
            let name = object_name(&caps[1]);
            self.alter_table(&name, &caps[2]);
        } else if let Some(caps) = self.patterns.create_index.captures(statement) {
            let unique = caps.get(1).is_some();
            let name = caps.get(2).map(|m| object_name(m.as_str()));
            let table = object_name(&caps[3]);
            let open = caps.get(0).map_or(0, |m| m.end() - 1);
            self.create_index(name, &table, unique, statement, open);
        } else {
            trace!(statement, "statement ignored");
        }
    }

    fn create_table(&mut self, name: String, statement: &str, open: usize) {
        let Some((body, _)) = enclosed(statement, open) else {
            self.report
                .skip(format!("Table '{name}' skipped: unterminated column list"));
            return;
        };

        let mut table = Table::default();
        for fragment in split_top_level(body, ',') {
            apply_fragment(
                self.patterns,
                &name,
                &mut table,
                &fragment,
                false,
                &mut self.pending,
                &mut self.report,
            );
        }

        if self.builder.insert_table(name.clone(), table) {
            self.report.warn(format!(
                "Table '{name}' is defined more than once; the last definition wins"
            ));
        }
    }

    fn alter_table(&mut self, name: &str, actions: &str) {
        for action in split_top_level(actions, ',') {
            let Some(caps) = self.patterns.add_prefix.captures(&action) else {
                trace!(table = name, action = %action, "alter action ignored");
                continue;
            };
            let force_column = caps.get(1).is_some();
            let clause = &action[caps.get(0).map_or(0, |m| m.end())..];

            if classify(self.patterns, clause, force_column) == Fragment::ForeignKey {
                // The owning table may legitimately appear later in the dump.
                queue_foreign_key(self.patterns, name, clause, &mut self.pending, &mut self.report);
                continue;
            }

            match self.builder.table_mut(name) {
                Some(table) => apply_fragment(
                    self.patterns,
                    name,
                    table,
                    clause,
                    force_column,
                    &mut self.pending,
                    &mut self.report,
                ),
                None => self.report.skip(format!(
                    "ALTER TABLE on unknown table '{name}' skipped: {clause}"
                )),
            }
        }
    }

    fn create_index(
        &mut self,
        name: Option<String>,
        table: &str,
        unique: bool,
        statement: &str,
        open: usize,
    ) {
        let Some((body, _)) = enclosed(statement, open) else {
            self.report
                .skip(format!("Index on '{table}' skipped: unterminated column list"));
            return;
        };
        let columns = name_list(body);
        let name = name.unwrap_or_else(|| format!("{table}_{}_idx", columns.join("_")));

        match self.builder.table_mut(table) {
            Some(t) => t.indexes.push(Index {
                name,
                columns,
                unique,
            }),
            None => self
                .report
                .warn(format!("Index '{name}' references unknown table '{table}'")),
        }
    }

    fn finish(mut self) -> ParsingResult {
        for pending in &self.pending {
            if !self.builder.link(pending) {
                self.report.skip(format!(
                    "Foreign key {}.{} -> {}.{} skipped: column {}.{} not found",
                    pending.from_table,
                    pending.from_column,
                    pending.to_table,
                    pending.to_column,
                    pending.from_table,
                    pending.from_column
                ));
            }
        }

        let schema = self.builder.finish();
        check_extraction(
            &schema,
            &mut self.report,
            "no FOREIGN KEY or REFERENCES clauses",
        );
        ParsingResult::new(Dialect::Sql, schema, self.report)
    }
}

fn classify(patterns: &Patterns, fragment: &str, force_column: bool) -> Fragment {
    if force_column {
        return Fragment::Column;
    }
    if fragment.to_uppercase().contains("FOREIGN KEY") {
        Fragment::ForeignKey
    } else if patterns.primary_key.is_match(fragment) {
        Fragment::PrimaryKey
    } else if patterns.unique.is_match(fragment) {
        Fragment::Unique
    } else if patterns.ignored_constraint.is_match(fragment) {
        Fragment::Ignored
    } else {
        Fragment::Column
    }
}

fn apply_fragment(
    patterns: &Patterns,
    table_name: &str,
    table: &mut Table,
    fragment: &str,
    force_column: bool,
    pending: &mut Vec<PendingRelation>,
    report: &mut Report,
) {
    match classify(patterns, fragment, force_column) {
        Fragment::ForeignKey => queue_foreign_key(patterns, table_name, fragment, pending, report),
        Fragment::PrimaryKey => {
            let Some(caps) = patterns.primary_key.captures(fragment) else {
                return;
            };
            // Columns declared after the constraint are not marked.
            for name in name_list(&caps[1]) {
                if let Some(column) = table.columns.get_mut(&name) {
                    column.primary = true;
                    column.nullable = false;
                }
            }
        }
        Fragment::Unique => {
            let Some(caps) = patterns.unique.captures(fragment) else {
                return;
            };
            let columns = name_list(&caps[3]);
            if let [single] = columns.as_slice() {
                if let Some(column) = table.columns.get_mut(single) {
                    column.unique = true;
                }
            } else if !columns.is_empty() {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| object_name(m.as_str()))
                    .unwrap_or_else(|| format!("{table_name}_{}_key", columns.join("_")));
                table.indexes.push(Index {
                    name,
                    columns,
                    unique: true,
                });
            }
        }
        Fragment::Ignored => trace!(table = table_name, fragment, "constraint ignored"),
        Fragment::Column => match parse_column(fragment) {
            Some((name, column)) => {
                if let Some(caps) = patterns.references.captures(fragment) {
                    pending.push(PendingRelation {
                        from_table: table_name.to_string(),
                        from_column: name.clone(),
                        to_table: object_name(&caps[1]),
                        to_column: first_or_id(caps.get(2).map(|m| m.as_str())),
                    });
                }
                table.columns.insert(name, column);
            }
            None => report.skip(format!(
                "Skipped unrecognized definition in table '{table_name}': {fragment}"
            )),
        },
    }
}

fn queue_foreign_key(
    patterns: &Patterns,
    table_name: &str,
    fragment: &str,
    pending: &mut Vec<PendingRelation>,
    report: &mut Report,
) {
    let Some(caps) = patterns.foreign_key.captures(fragment) else {
        report.skip(format!(
            "Skipped malformed foreign key in table '{table_name}': {fragment}"
        ));
        return;
    };
    let columns = name_list(&caps[1]);
    let Some(from_column) = columns.first() else {
        report.skip(format!(
            "Skipped foreign key without columns in table '{table_name}'"
        ));
        return;
    };
    if columns.len() > 1 {
        report.warn(format!(
            "Composite foreign key on {table_name}({}) is modeled by its first column only",
            columns.join(", ")
        ));
    }

    let relation = PendingRelation {
        from_table: table_name.to_string(),
        from_column: from_column.clone(),
        to_table: object_name(&caps[2]),
        to_column: first_or_id(caps.get(3).map(|m| m.as_str())),
    };
    debug!(
        from = %format!("{}.{}", relation.from_table, relation.from_column),
        to = %format!("{}.{}", relation.to_table, relation.to_column),
        "foreign key queued"
    );
    pending.push(relation);
}

/// First column of a referenced column list; `id` when the list is omitted.
fn first_or_id(list: Option<&str>) -> String {
    list.and_then(|l| name_list(l).into_iter().next())
        .unwrap_or_else(|| "id".to_string())
}

fn is_keyword(word: &str) -> bool {
    let upper = word.to_uppercase();
    let base = upper.split('(').next().unwrap_or(&upper);
    COLUMN_KEYWORDS.contains(&base)
}

/// Parse `<name> <type> <modifiers...>`. `None` when no type is present.
fn parse_column(fragment: &str) -> Option<(String, Column)> {
    let words = words(fragment);
    let name = unquote(words.first()?);

    let mut pos = 1;
    let mut raw_type = String::new();
    while let Some(word) = words.get(pos) {
        if is_keyword(word) {
            break;
        }
        if !raw_type.is_empty() && !word.starts_with('(') {
            raw_type.push(' ');
        }
        raw_type.push_str(word);
        pos += 1;
    }
    if raw_type.is_empty() {
        return None;
    }

    let mut column = Column::new(normalize_type(&raw_type));
    let mut cursor = Cursor { words: &words, pos };
    column_modifiers(&mut cursor, &mut column);
    Some((name, column))
}

struct Cursor<'a> {
    words: &'a [String],
    pos: usize,
}

impl Cursor<'_> {
    fn current(&self) -> Option<String> {
        self.words.get(self.pos).map(|w| w.to_uppercase())
    }

    fn advance(&mut self) {
        if self.pos < self.words.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, keyword: &str) -> bool {
        if self.current().as_deref() == Some(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_parenthesized(&mut self) {
        if self
            .words
            .get(self.pos)
            .is_some_and(|w| w.starts_with('('))
        {
            self.advance();
        }
    }

    fn skip_on_actions(&mut self) {
        while self.eat("ON") {
            // DELETE or UPDATE
            if !(self.eat("DELETE") || self.eat("UPDATE")) {
                continue;
            }
            // Action: CASCADE, RESTRICT, SET NULL, SET DEFAULT, NO ACTION
            if self.eat("SET") {
                if !self.eat("NULL") {
                    self.eat("DEFAULT");
                }
            } else if self.eat("NO") {
                self.eat("ACTION");
            } else if !self.eat("CASCADE") {
                self.eat("RESTRICT");
            }
        }
    }
}

fn column_modifiers(cursor: &mut Cursor<'_>, column: &mut Column) {
    while let Some(word) = cursor.current() {
        match word.as_str() {
            "NOT" => {
                cursor.advance();
                if cursor.eat("NULL") {
                    column.nullable = false;
                }
            }
            "NULL" => {
                cursor.advance();
                column.nullable = true;
            }
            "PRIMARY" => {
                cursor.advance();
                cursor.eat("KEY");
                column.primary = true;
                column.nullable = false;
            }
            "UNIQUE" => {
                cursor.advance();
                cursor.eat("KEY");
                column.unique = true;
            }
            "DEFAULT" => {
                cursor.advance();
                let mut parts = Vec::new();
                while let Some(part) = cursor.words.get(cursor.pos) {
                    if !parts.is_empty() && is_keyword(part) {
                        break;
                    }
                    parts.push(part.as_str());
                    cursor.advance();
                }
                if !parts.is_empty() {
                    column.default = Some(parts.join(" "));
                }
            }
            "REFERENCES" => {
                // Target is captured from the whole fragment.
                cursor.advance();
                cursor.advance();
                cursor.skip_parenthesized();
                cursor.skip_on_actions();
            }
            "ON" => cursor.skip_on_actions(),
            "CONSTRAINT" => {
                cursor.advance();
                cursor.advance();
            }
            "CHECK" => {
                cursor.advance();
                cursor.skip_parenthesized();
            }
            _ => cursor.advance(),
        }
    }
}
