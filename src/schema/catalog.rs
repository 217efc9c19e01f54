//! Live database catalog and logical-to-physical renaming.

use std::collections::BTreeMap;

use rusqlite::{params, Connection};

use crate::error::ExecutionError;
use crate::model::{IndicatorSpec, NameVisitor};
use crate::translation::CompileOptions;

/// Tables and their columns as they exist in the database right now.
#[derive(Debug, Clone, Default)]
pub struct LiveSchema {
    tables: BTreeMap<String, Vec<String>>,
}

impl LiveSchema {
    /// Read every user table and its columns, in declaration order.
    pub fn introspect(conn: &Connection) -> Result<Self, ExecutionError> {
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(ExecutionError::Introspection)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(ExecutionError::Introspection)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(ExecutionError::Introspection)?;

        let mut columns_stmt = conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(ExecutionError::Introspection)?;

        let mut tables = BTreeMap::new();
        for name in names {
            let columns = columns_stmt
                .query_map(params![name], |row| row.get::<_, String>(0))
                .map_err(ExecutionError::Introspection)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(ExecutionError::Introspection)?;
            tables.insert(name, columns);
        }
        Ok(Self { tables })
    }

    /// Build from known tables (used by tests and callers with a cached catalog).
    pub fn from_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(|(t, c)| (t.into(), c)).collect(),
        }
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Columns of `table`, empty when the table does not exist.
    pub fn columns(&self, table: &str) -> &[String] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Request-scoped logical to physical mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaCatalog {
    /// Logical table name to physical table name.
    pub tables: BTreeMap<String, String>,
    /// Logical table name to its logical to physical column names.
    pub columns: BTreeMap<String, BTreeMap<String, String>>,
}

impl SchemaCatalog {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.columns.values().all(BTreeMap::is_empty)
    }

    /// Physical name of `column` as read from `scope`: the mapping of the
    /// first scope table that has one.
    pub fn column(&self, scope: &[String], column: &str) -> Option<&str> {
        scope
            .iter()
            .find_map(|table| self.columns.get(table)?.get(column))
            .map(String::as_str)
    }

    /// The indicator with every logical name replaced by its physical name.
    ///
    /// Columns are looked up per FROM clause, so a nested subject reads its
    /// own tables' columns. Names without a mapping are kept.
    pub fn apply(&self, spec: &IndicatorSpec) -> IndicatorSpec {
        let mut resolved = spec.clone();
        resolved.visit_names(&mut Renamer { catalog: self });
        resolved
    }

    /// Join rules rewritten to physical table and column names.
    pub fn apply_joins(&self, options: &CompileOptions) -> CompileOptions {
        let mut options = options.clone();
        for rule in &mut options.joins {
            rename_join_side(self, &mut rule.left, &mut rule.left_column);
            rename_join_side(self, &mut rule.right, &mut rule.right_column);
        }
        options
    }
}

fn rename_join_side(catalog: &SchemaCatalog, table: &mut String, column: &mut String) {
    if let Some(physical) = catalog.column(std::slice::from_ref(table), column) {
        *column = physical.to_string();
    }
    if let Some(physical) = catalog.tables.get(table.as_str()) {
        *table = physical.clone();
    }
}

struct Renamer<'a> {
    catalog: &'a SchemaCatalog,
}

impl NameVisitor for Renamer<'_> {
    fn table(&mut self, name: &mut String) {
        if let Some(physical) = self.catalog.tables.get(name.as_str()) {
            *name = physical.clone();
        }
    }

    fn column(&mut self, scope: &[String], name: &mut String) {
        if let Some(physical) = self.catalog.column(scope, name) {
            *name = physical.to_string();
        }
    }
}
