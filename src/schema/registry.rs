//! Import registry: which physical table each spreadsheet import produced.
//!
//! The ingestion pipeline writes one row per import into `import_registry`:
//!
//! | column        | content                                         |
//! |---------------|-------------------------------------------------|
//! | `data_type`   | tag such as `insertion_2022_6m`                 |
//! | `table_name`  | physical table minted for the batch             |
//! | `imported_at` | `YYYY-MM-DD HH:MM:SS` or RFC 3339               |

use chrono::{DateTime, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ExecutionError;

/// Name of the registry table.
pub const REGISTRY_TABLE: &str = "import_registry";

/// One import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub data_type: String,
    pub table_name: String,
    pub imported_at: NaiveDateTime,
}

impl ImportRecord {
    pub fn new(data_type: &str, table_name: &str, imported_at: NaiveDateTime) -> Self {
        Self {
            data_type: data_type.into(),
            table_name: table_name.into(),
            imported_at,
        }
    }
}

/// Snapshot of the import registry.
#[derive(Debug, Clone, Default)]
pub struct ImportRegistry {
    records: Vec<ImportRecord>,
}

impl ImportRegistry {
    pub fn from_records(records: Vec<ImportRecord>) -> Self {
        Self { records }
    }

    /// Read the registry table; an absent table is an empty registry.
    pub fn load(conn: &Connection) -> Result<Self, ExecutionError> {
        let exists = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![REGISTRY_TABLE],
                |_| Ok(()),
            )
            .optional()
            .map_err(ExecutionError::Introspection)?
            .is_some();
        if !exists {
            return Ok(Self::default());
        }

        let mut stmt = conn
            .prepare("SELECT data_type, table_name, imported_at FROM import_registry")
            .map_err(ExecutionError::Introspection)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(ExecutionError::Introspection)?;

        let mut records = Vec::new();
        for row in rows {
            let (data_type, table_name, imported_at) = row.map_err(ExecutionError::Introspection)?;
            // Unparseable timestamps sort first rather than failing the lookup
            let imported_at = parse_timestamp(&imported_at).unwrap_or_default();
            records.push(ImportRecord {
                data_type,
                table_name,
                imported_at,
            });
        }
        Ok(Self { records })
    }

    /// Create the registry table if needed.
    pub fn ensure_table(conn: &Connection) -> Result<(), ExecutionError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS import_registry (
                data_type   TEXT NOT NULL,
                table_name  TEXT NOT NULL,
                imported_at TEXT NOT NULL
            )",
        )
        .map_err(ExecutionError::Introspection)
    }

    /// Append a record to the registry table.
    pub fn record(conn: &Connection, record: &ImportRecord) -> Result<(), ExecutionError> {
        Self::ensure_table(conn)?;
        conn.execute(
            "INSERT INTO import_registry (data_type, table_name, imported_at) VALUES (?1, ?2, ?3)",
            params![
                record.data_type,
                record.table_name,
                record.imported_at.format("%Y-%m-%d %H:%M:%S").to_string()
            ],
        )
        .map_err(ExecutionError::Introspection)?;
        Ok(())
    }

    pub fn records(&self) -> &[ImportRecord] {
        &self.records
    }

    /// Distinct tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.records.iter().map(|r| r.data_type.clone()).collect();
        tags.sort();
        tags.dedup();
        tags
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.naive_utc());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}
