//! Logical to physical schema resolution.
//!
//! Indicators name stable logical tables (`insertion_diplomes`) and columns
//! (`situation`). Every spreadsheet import mints a fresh physical table whose
//! columns are derived from the form's question text, so both must be looked
//! up per request:
//!
//! - [`ImportRegistry`]: which physical table each import produced.
//! - [`LiveSchema`]: the columns those tables have right now.
//! - [`SchemaResolver`]: picks an import and the physical columns.
//! - [`SchemaCatalog`]: the resulting mapping, applied to the indicator
//!   before it is compiled again.

mod catalog;
mod registry;
mod resolver;

pub use catalog::{LiveSchema, SchemaCatalog};
pub use registry::{ImportRecord, ImportRegistry, REGISTRY_TABLE};
pub use resolver::{resolve_schema, ResolveRequest, SchemaResolver};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `[schema]` section of the settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Period key to tag suffix, e.g. `6_mois` to `_6m`.
    pub periods: BTreeMap<String, String>,

    /// Logical tables that go through resolution.
    pub tables: BTreeMap<String, LogicalTable>,
}

impl SchemaConfig {
    /// Whether any of `tables` is a configured logical table.
    pub fn covers(&self, tables: &[String]) -> bool {
        tables.iter().any(|t| self.tables.contains_key(t))
    }
}

/// One logical table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicalTable {
    /// Accepted import tags; a registry tag matches when equal or prefixed.
    pub data_types: Vec<String>,

    /// Free-text columns whose physical name varies between imports.
    pub columns: Vec<LogicalColumn>,
}

/// A logical column matched by prefix against the live column list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicalColumn {
    pub name: String,
    pub prefixes: Vec<String>,
    /// Tiebreak keywords, tried in order.
    pub priority: Vec<String>,
}
