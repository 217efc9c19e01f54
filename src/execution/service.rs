//! SQLite execution of compiled indicators.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ExecutionError;

/// One row, keys in column order.
pub type Row = Map<String, Value>;

/// Rows returned by one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The statement that was run, after schema resolution.
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    /// Set when the indicator comes from a stored definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indicator_title: Option<String>,
}

impl ExecutionResult {
    /// Attach the stored indicator this result belongs to.
    pub fn with_indicator(mut self, id: i64, title: &str) -> Self {
        self.indicator_id = Some(id);
        self.indicator_title = Some(title.to_string());
        self
    }
}

/// A database session.
///
/// Every session replaces SQLite's ASCII-only `lower()` with a Unicode
/// aware one, which case-insensitive matches rely on.
pub struct ExecutionService {
    conn: Connection,
}

impl ExecutionService {
    /// Open the SQLite database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ExecutionError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| ExecutionError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, ExecutionError> {
        let conn = Connection::open_in_memory().map_err(|source| ExecutionError::Open {
            path: ":memory:".into(),
            source,
        })?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, ExecutionError> {
        register_lower(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `sql` inside a transaction and collect every row.
    ///
    /// On failure the transaction is rolled back before the error is returned.
    pub fn execute(&mut self, sql: &str) -> Result<ExecutionResult, ExecutionError> {
        debug!(sql = %sql, "executing statement");

        let tx = self.conn.transaction().map_err(|source| ExecutionError::Query {
            sql: sql.to_string(),
            source,
        })?;

        match fetch(&tx, sql) {
            Ok((columns, rows)) => {
                tx.commit().map_err(|source| ExecutionError::Query {
                    sql: sql.to_string(),
                    source,
                })?;
                debug!(rows = rows.len(), "statement returned");
                Ok(ExecutionResult {
                    sql: sql.to_string(),
                    columns,
                    row_count: rows.len(),
                    rows,
                    indicator_id: None,
                    indicator_title: None,
                })
            }
            Err(source) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(error = %rollback, "rollback failed");
                }
                warn!(sql = %sql, error = %source, "statement rolled back");
                Err(ExecutionError::Query {
                    sql: sql.to_string(),
                    source,
                })
            }
        }
    }
}

fn register_lower(conn: &Connection) -> Result<(), ExecutionError> {
    conn.create_scalar_function(
        "lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(match ctx.get_raw(0) {
                ValueRef::Null => SqlValue::Null,
                ValueRef::Integer(i) => SqlValue::Text(i.to_string()),
                ValueRef::Real(f) => SqlValue::Text(f.to_string()),
                ValueRef::Text(text) | ValueRef::Blob(text) => {
                    SqlValue::Text(String::from_utf8_lossy(text).to_lowercase())
                }
            })
        },
    )
    .map_err(|source| ExecutionError::Function {
        name: "lower",
        source,
    })
}

fn fetch(tx: &Transaction<'_>, sql: &str) -> rusqlite::Result<(Vec<String>, Vec<Row>)> {
    let mut stmt = tx.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut map = Map::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            map.insert(name.clone(), json_value(row.get_ref(i)?));
        }
        rows.push(map);
    }
    Ok((columns, rows))
}

/// SQLite value to JSON; blobs become base64, non-finite reals null.
pub fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => Value::String(BASE64.encode(bytes)),
    }
}

/// Hands out short-lived sessions, one per unit of work.
pub trait SessionFactory {
    fn open_session(&self) -> Result<ExecutionService, ExecutionError>;
}

/// Sessions on a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteSessionFactory {
    path: PathBuf,
}

impl SqliteSessionFactory {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionFactory for SqliteSessionFactory {
    fn open_session(&self) -> Result<ExecutionService, ExecutionError> {
        ExecutionService::open(&self.path)
    }
}
