//! Query Executor: runs one SQL statement and reports rows or an error
//! message. Faults are returned as data, never raised.

use crate::guard::StatementGuard;
use async_trait::async_trait;
use log::debug;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, Statement};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use crate::guard::AccessMode;

/// A single scalar column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Real(f) => Some(*f),
            CellValue::Text(s) => s.trim().parse().ok(),
            CellValue::Null | CellValue::Blob(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) => CellValue::Integer(i),
            ValueRef::Real(f) => CellValue::Real(f),
            ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => CellValue::Blob(bytes.to_vec()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Real(value)
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            CellValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

/// Ordered rows of ordered column values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl QueryRows {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Rows(QueryRows),
    Failed { message: String },
}

impl ExecutionOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        ExecutionOutcome::Failed {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Rows(_))
    }
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Runs `query` with optional bound `params`.
    async fn execute(&self, query: &str, params: &[CellValue]) -> ExecutionOutcome;
}

/// Executes statements against a SQLite file, one connection per call.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    path: PathBuf,
    guard: StatementGuard,
}

impl SqliteExecutor {
    pub fn new(path: impl Into<PathBuf>, mode: AccessMode) -> Self {
        Self {
            path: path.into(),
            guard: StatementGuard::new(mode),
        }
    }

    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self::new(path, AccessMode::ReadOnly)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn execute(&self, query: &str, params: &[CellValue]) -> ExecutionOutcome {
        if let Err(e) = self.guard.check(query) {
            return ExecutionOutcome::failed(e.to_string());
        }

        let path = self.path.clone();
        let mode = self.guard.mode();
        let query = query.to_string();
        let params = params.to_vec();

        let joined =
            tokio::task::spawn_blocking(move || run_statement(&path, mode, &query, &params)).await;

        match joined {
            Ok(Ok(rows)) => {
                debug!("Statement returned {} rows", rows.len());
                ExecutionOutcome::Rows(rows)
            }
            Ok(Err(e)) => ExecutionOutcome::failed(e.to_string()),
            Err(e) => ExecutionOutcome::failed(format!("execution task failed: {}", e)),
        }
    }
}

fn open_connection(path: &Path, mode: AccessMode) -> rusqlite::Result<Connection> {
    match mode {
        AccessMode::ReadOnly => {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.pragma_update(None, "query_only", true)?;
            Ok(conn)
        }
        AccessMode::ReadWrite => Connection::open(path),
    }
}

// The connection is dropped, and therefore closed, on every return path.
// An uncommitted transaction rolls back on drop.
fn run_statement(
    path: &Path,
    mode: AccessMode,
    query: &str,
    params: &[CellValue],
) -> rusqlite::Result<QueryRows> {
    let mut conn = open_connection(path, mode)?;
    let tx = conn.transaction()?;
    let rows = {
        let mut stmt = tx.prepare(query)?;
        collect_rows(&mut stmt, params)?
    };
    tx.commit()?;
    Ok(rows)
}

fn collect_rows(stmt: &mut Statement<'_>, params: &[CellValue]) -> rusqlite::Result<QueryRows> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    if columns.is_empty() {
        stmt.execute(params_from_iter(params.iter()))?;
        return Ok(QueryRows::empty());
    }

    let width = columns.len();
    let mut result = QueryRows {
        columns,
        rows: Vec::new(),
    };
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(CellValue::from(row.get_ref(idx)?));
        }
        result.rows.push(values);
    }
    Ok(result)
}
