//! Running indicators against the embedded SQLite database.
//!
//! ```text
//! JSON ─▶ IndicatorSpec ─▶ compile (sqlite) ─▶ resolve schema ─▶ recompile ─▶ execute
//!          Specification     Specification     DataAvailability                Execution
//! ```
//!
//! The first failing stage aborts a single run. [`ReportRunner`] runs many
//! indicators and keeps going.

mod export;
mod report;
mod service;

pub use export::{report_to_csv, report_to_json, result_to_csv, CSV_BOM, REPORT_CSV_DELIMITER};
pub use report::{
    FailedExecution, GeneratedReport, ReportDefinition, ReportIndicator, ReportResult,
    ReportRunner, SlotOutcome,
};
pub use service::{
    json_value, ExecutionResult, ExecutionService, Row, SessionFactory, SqliteSessionFactory,
};

use serde_json::Value;
use tracing::debug;

use crate::config::Settings;
use crate::error::IndicatorResult;
use crate::model::IndicatorSpec;
use crate::schema::{resolve_schema, ResolveRequest, SchemaConfig};
use crate::sql::Dialect;
use crate::translation::{compile_indicator, CompileOptions};

/// Everything a run needs besides the session.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub compile: CompileOptions,
    pub schema: SchemaConfig,
    pub request: ResolveRequest,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            compile: CompileOptions::default().with_dialect(Dialect::Sqlite),
            schema: SchemaConfig::default(),
            request: ResolveRequest::default(),
        }
    }
}

impl RunOptions {
    /// Options from settings; execution always targets SQLite.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            compile: settings.compile_options().with_dialect(Dialect::Sqlite),
            schema: settings.schema.clone(),
            request: ResolveRequest::default(),
        }
    }

    pub fn with_request(mut self, request: ResolveRequest) -> Self {
        self.request = request;
        self
    }
}

/// Parse, compile, resolve and execute one indicator.
pub fn run_indicator(
    service: &mut ExecutionService,
    indicator: &Value,
    options: &RunOptions,
) -> IndicatorResult<ExecutionResult> {
    let spec = IndicatorSpec::parse(indicator)?;
    run_spec(service, &spec, options)
}

/// Compile, resolve and execute an already parsed indicator.
///
/// The logical indicator is compiled first so that malformed input fails
/// before the database is read.
pub fn run_spec(
    service: &mut ExecutionService,
    spec: &IndicatorSpec,
    options: &RunOptions,
) -> IndicatorResult<ExecutionResult> {
    let compiled = compile_indicator(spec, &options.compile)?;

    let catalog = resolve_schema(service.connection(), &options.schema, spec, &options.request)?;
    let sql = if catalog.is_empty() {
        compiled.sql
    } else {
        let resolved = compile_indicator(
            &catalog.apply(spec),
            &catalog.apply_joins(&options.compile),
        )?;
        debug!(sql = %resolved.sql, "resolved physical names");
        resolved.sql
    };

    Ok(service.execute(&sql)?)
}
