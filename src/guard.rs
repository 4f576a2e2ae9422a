//! Statement-type restriction applied before any generated SQL reaches the
//! database.

use crate::error::{AssistantError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Only `SELECT`, `WITH ... SELECT` and `EXPLAIN` are permitted.
    #[default]
    ReadOnly,
    /// Reads plus `INSERT`, `UPDATE` and `DELETE`.
    ReadWrite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Read,
    Write,
    /// Not understood by sqlparser; left for SQLite to accept or reject.
    Unparsed,
    Other(String),
}

#[derive(Debug, Clone, Copy)]
pub struct StatementGuard {
    mode: AccessMode,
}

impl StatementGuard {
    pub fn new(mode: AccessMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Parses `sql` and returns its kind when exactly one permitted statement
    /// is present.
    ///
    /// In read-only mode SQL that sqlparser cannot parse is passed through as
    /// [`StatementKind::Unparsed`]; the read-only connection still refuses
    /// writes and SQLite reports its own syntax errors.
    pub fn check(&self, sql: &str) -> Result<StatementKind> {
        let statements = match Parser::parse_sql(&SQLiteDialect {}, sql) {
            Ok(statements) => statements,
            Err(e) if self.mode == AccessMode::ReadOnly && !sql.trim().is_empty() => {
                debug!("sqlparser could not parse query, deferring to SQLite: {}", e);
                return Ok(StatementKind::Unparsed);
            }
            Err(e) => {
                return Err(AssistantError::StatementRejected(format!(
                    "could not parse SQL: {}",
                    e
                )))
            }
        };

        let statement = match statements.as_slice() {
            [] => {
                return Err(AssistantError::StatementRejected(
                    "empty statement".to_string(),
                ))
            }
            [single] => single,
            many => {
                return Err(AssistantError::StatementRejected(format!(
                    "expected a single statement, found {}",
                    many.len()
                )))
            }
        };

        let kind = classify(statement, sql);
        match (&kind, self.mode) {
            (StatementKind::Read | StatementKind::Unparsed, _) => Ok(kind),
            (StatementKind::Write, AccessMode::ReadWrite) => Ok(kind),
            (StatementKind::Write, AccessMode::ReadOnly) => Err(AssistantError::StatementRejected(
                format!(
                    "only SELECT statements are permitted in read-only mode, got {}",
                    leading_keyword(sql)
                ),
            )),
            (StatementKind::Other(name), _) => Err(AssistantError::StatementRejected(format!(
                "{} statements are not permitted",
                name
            ))),
        }
    }
}

fn classify(statement: &Statement, sql: &str) -> StatementKind {
    match statement {
        Statement::Query(_) | Statement::Explain { .. } | Statement::ExplainTable { .. } => {
            StatementKind::Read
        }
        Statement::Insert(_) | Statement::Update { .. } | Statement::Delete(_) => {
            StatementKind::Write
        }
        _ => StatementKind::Other(leading_keyword(sql)),
    }
}

fn leading_keyword(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_end_matches(';')
        .to_ascii_uppercase()
}
