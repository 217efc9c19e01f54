//! Logical table and column resolution against the import registry.
//!
//! ```text
//! logical table ──data_types──▶ registry tags ──period/year──▶ newest import
//!                                                                  │
//! logical column ──prefixes──▶ live columns ──priority──▶ physical column
//! ```

use rusqlite::Connection;
use tracing::debug;

use super::{ImportRecord, ImportRegistry, LiveSchema, LogicalColumn, SchemaCatalog, SchemaConfig};
use crate::error::{DataAvailabilityError, IndicatorResult};
use crate::model::{IndicatorSpec, Scope};

/// Run-time filters for picking an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Period key such as `6_mois`; mapped to a tag suffix via `[schema.periods]`.
    pub period: Option<String>,
    /// Year, matched as a substring of the tag.
    pub year: Option<String>,
}

impl ResolveRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_period(mut self, period: &str) -> Self {
        self.period = Some(period.into());
        self
    }

    pub fn with_year(mut self, year: &str) -> Self {
        self.year = Some(year.into());
        self
    }
}

/// Resolves logical names for one request.
pub struct SchemaResolver<'a> {
    config: &'a SchemaConfig,
    registry: &'a ImportRegistry,
    live: &'a LiveSchema,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(config: &'a SchemaConfig, registry: &'a ImportRegistry, live: &'a LiveSchema) -> Self {
        Self {
            config,
            registry,
            live,
        }
    }

    /// Build the catalog for `tables`.
    ///
    /// Tables without a `[schema.tables]` entry are left untouched. A
    /// free-text column is only resolved when a scope reads it, against the
    /// first table of that scope which configures it.
    pub fn resolve(
        &self,
        tables: &[String],
        request: &ResolveRequest,
        scopes: &[Scope],
    ) -> Result<SchemaCatalog, DataAvailabilityError> {
        let mut catalog = SchemaCatalog::default();

        for logical in tables {
            let Some(table) = self.config.tables.get(logical) else {
                continue;
            };
            let record = self.resolve_table(logical, &table.data_types, request)?;
            debug!(
                logical = %logical,
                physical = %record.table_name,
                tag = %record.data_type,
                "resolved table"
            );
            catalog
                .tables
                .insert(logical.clone(), record.table_name.clone());
        }

        for scope in scopes {
            for name in &scope.columns {
                let Some((owner, column)) = self.configured_column(&scope.tables, name) else {
                    continue;
                };
                let Some(physical_table) = catalog.tables.get(owner) else {
                    continue;
                };
                if catalog.columns.get(owner).is_some_and(|c| c.contains_key(name)) {
                    continue;
                }
                let physical = self.resolve_column(physical_table, column)?;
                catalog
                    .columns
                    .entry(owner.to_string())
                    .or_default()
                    .insert(name.clone(), physical);
            }
        }

        Ok(catalog)
    }

    /// The first table of `scope` configuring a free-text column `name`.
    fn configured_column<'s>(
        &self,
        scope: &'s [String],
        name: &str,
    ) -> Option<(&'s str, &'a LogicalColumn)> {
        let config: &'a SchemaConfig = self.config;
        scope.iter().find_map(|table| {
            let column = config.tables.get(table)?.columns.iter().find(|c| c.name == name)?;
            Some((table.as_str(), column))
        })
    }

    /// The newest import whose tag matches the accepted tags and filters.
    pub fn resolve_table(
        &self,
        logical: &str,
        data_types: &[String],
        request: &ResolveRequest,
    ) -> Result<&'a ImportRecord, DataAvailabilityError> {
        let suffix = request
            .period
            .as_deref()
            .map(|p| self.config.periods.get(p).map(String::as_str).unwrap_or(p));

        self.registry
            .records()
            .iter()
            .filter(|r| {
                data_types
                    .iter()
                    .any(|t| r.data_type == *t || r.data_type.starts_with(t.as_str()))
            })
            .filter(|r| suffix.map_or(true, |s| r.data_type.ends_with(s)))
            .filter(|r| {
                request
                    .year
                    .as_deref()
                    .map_or(true, |y| r.data_type.contains(y))
            })
            .max_by_key(|r| r.imported_at)
            .ok_or_else(|| DataAvailabilityError::Table {
                table: logical.to_string(),
                requested: data_types.to_vec(),
                period: request.period.clone(),
                year: request.year.clone(),
                available: self.registry.tags(),
            })
    }

    /// Pick the physical column of `table` for a free-text logical column.
    ///
    /// An exact name wins. Otherwise candidates are the columns starting with
    /// one of the prefixes (case-insensitive); the first priority keyword
    /// contained in a candidate decides, then column order.
    pub fn resolve_column(
        &self,
        table: &str,
        column: &LogicalColumn,
    ) -> Result<String, DataAvailabilityError> {
        let live = self.live.columns(table);
        if let Some(exact) = live.iter().find(|c| **c == column.name) {
            return Ok(exact.clone());
        }

        let prefixes: Vec<String> = column.prefixes.iter().map(|p| p.to_lowercase()).collect();
        let candidates: Vec<&String> = live
            .iter()
            .filter(|c| {
                let lower = c.to_lowercase();
                prefixes.iter().any(|p| lower.starts_with(p.as_str()))
            })
            .collect();

        let chosen = column
            .priority
            .iter()
            .map(|k| k.to_lowercase())
            .find_map(|keyword| {
                candidates
                    .iter()
                    .find(|c| c.to_lowercase().contains(&keyword))
                    .copied()
            })
            .or_else(|| candidates.first().copied());

        chosen.cloned().ok_or_else(|| DataAvailabilityError::Column {
            table: table.to_string(),
            column: column.name.clone(),
            prefixes: column.prefixes.clone(),
        })
    }
}

/// Introspect `conn` and resolve the names of `spec` for one request.
pub fn resolve_schema(
    conn: &Connection,
    config: &SchemaConfig,
    spec: &IndicatorSpec,
    request: &ResolveRequest,
) -> IndicatorResult<SchemaCatalog> {
    let tables = spec.referenced_tables();
    if !config.covers(&tables) {
        return Ok(SchemaCatalog::default());
    }
    let registry = ImportRegistry::load(conn)?;
    let live = LiveSchema::introspect(conn)?;
    let catalog =
        SchemaResolver::new(config, &registry, &live).resolve(&tables, request, &spec.scopes())?;
    Ok(catalog)
}
