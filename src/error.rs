//! Error types for compiling and running indicators.
//!
//! The taxonomy follows who can fix the problem:
//!
//! - [`SpecificationError`]: the indicator JSON is malformed. Raised before any
//!   database access; fixed by editing the indicator.
//! - [`DataAvailabilityError`]: a logical table or column has no physical
//!   counterpart. Fixed by importing data.
//! - [`ExecutionError`]: the database rejected the generated SQL. The
//!   transaction is always rolled back before this is returned.

use thiserror::Error;

use crate::config::SettingsError;

/// Result type for indicator operations.
pub type IndicatorResult<T> = Result<T, IndicatorError>;

/// Top-level error for every public operation of the crate.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error(transparent)]
    Specification(#[from] SpecificationError),

    #[error(transparent)]
    DataAvailability(#[from] DataAvailabilityError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl IndicatorError {
    /// Short machine-readable category, used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            IndicatorError::Specification(_) => "specification",
            IndicatorError::DataAvailability(_) => "data_availability",
            IndicatorError::Execution(_) => "execution",
            IndicatorError::Settings(_) => "settings",
            IndicatorError::Export(_) => "export",
        }
    }
}

/// Malformed or unrecognized indicator specification.
#[derive(Error, Debug)]
pub enum SpecificationError {
    /// A required key is missing from a node.
    #[error("missing required key '{key}' in {context}: {node}")]
    MissingKey {
        context: &'static str,
        key: &'static str,
        node: String,
    },

    /// A node does not have any recognized shape.
    #[error("unrecognized {context} node: {node}")]
    InvalidNode { context: &'static str, node: String },

    /// An operator outside the supported set.
    #[error("unsupported {context} operator '{op}'")]
    UnknownOperator { context: &'static str, op: String },

    /// An aggregate function outside the supported set.
    #[error("unknown aggregate function '{0}'")]
    UnknownFunction(String),

    /// The subject names no table.
    #[error("indicator subject has no tables")]
    NoTables,

    /// The input is not valid JSON at all.
    #[error("invalid indicator JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpecificationError {
    pub(crate) fn invalid(context: &'static str, node: &serde_json::Value) -> Self {
        SpecificationError::InvalidNode {
            context,
            node: node.to_string(),
        }
    }

    pub(crate) fn missing(context: &'static str, key: &'static str, node: &serde_json::Value) -> Self {
        SpecificationError::MissingKey {
            context,
            key,
            node: node.to_string(),
        }
    }
}

/// A logical reference has no physical counterpart in the live database.
#[derive(Error, Debug)]
pub enum DataAvailabilityError {
    /// No import matches the logical table for the requested filters.
    #[error(
        "no imported data for logical table '{table}' \
         (requested tags: {requested:?}, period: {period:?}, year: {year:?}; \
         available tags: {available:?})"
    )]
    Table {
        table: String,
        requested: Vec<String>,
        period: Option<String>,
        year: Option<String>,
        available: Vec<String>,
    },

    /// No physical column matches a free-text logical column.
    #[error("no column of '{table}' matches logical column '{column}' (prefixes: {prefixes:?})")]
    Column {
        table: String,
        column: String,
        prefixes: Vec<String>,
    },
}

/// The database failed to run a statement.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Failed to open the database.
    #[error("failed to open database '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The statement was rejected or failed while running.
    #[error("query failed: {source}")]
    Query {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Reading the catalog or the import registry failed.
    #[error("schema introspection failed: {0}")]
    Introspection(#[source] rusqlite::Error),

    /// Registering the session's SQL functions failed.
    #[error("failed to register SQL function '{name}': {source}")]
    Function {
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

/// Writing a report or result in an export format failed.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Only `,`, `;` and tab are accepted as CSV delimiters.
    #[error("unsupported CSV delimiter {0:?}, expected ',', ';' or tab")]
    Delimiter(char),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
