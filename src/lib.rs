//! # indicator-sql
//!
//! Compiles JSON indicator specifications into SQL and runs them against the
//! survey database.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │           Indicator JSON (sujet + colonnes)              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [model]
//! ┌─────────────────────────────────────────────────────────┐
//! │        IndicatorSpec (validated, typed nodes)            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [translation + normalize]
//! ┌─────────────────────────────────────────────────────────┐
//! │         SQL Query AST ─▶ dialect-specific text           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [schema]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Logical names ─▶ physical tables/columns (per run)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [execution]
//! ┌─────────────────────────────────────────────────────────┐
//! │     Rows (JSON) ─▶ reports ─▶ JSON / CSV export          │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod model;
pub mod normalize;
pub mod schema;
pub mod sql;
pub mod translation;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::error::{
        DataAvailabilityError, ExecutionError, IndicatorError, IndicatorResult,
        SpecificationError,
    };
    pub use crate::execution::{
        run_indicator, ExecutionResult, ExecutionService, GeneratedReport, ReportDefinition,
        ReportRunner, RunOptions, SessionFactory, SqliteSessionFactory,
    };
    pub use crate::model::{Condition, Expression, IndicatorSpec};
    pub use crate::schema::{ResolveRequest, SchemaCatalog, SchemaConfig};
    pub use crate::sql::{Dialect, SqlDialect};
    pub use crate::translation::{compile_indicator, compile_json, CompileOptions, JoinRule};
}

// Also export at crate root for convenience
pub use error::{IndicatorError, IndicatorResult};
pub use model::IndicatorSpec;
pub use sql::Dialect;
pub use translation::{compile_indicator, compile_json, CompileOptions, CompiledQuery};
