//! Indicator-to-SQL translation.
//!
//! ```text
//! IndicatorSpec ─┬─ subject.tables      → FROM / JOIN
//!                ├─ subject.conditions  → WHERE            [condition]
//!                └─ colonnes, in order  → SELECT items     [expression]
//!                     group_by / case   → + GROUP BY       [aggregation]
//! ```
//!
//! Translation is a pure walk over the validated model: no database access,
//! no caching, same input gives byte-identical SQL.
//!
//! # Example
//!
//! ```
//! use indicator_sql::model::IndicatorSpec;
//! use indicator_sql::translation::{compile_indicator, CompileOptions};
//!
//! let spec = IndicatorSpec::from_json_str(r#"{
//!     "sujet": {"tables": ["t"], "conditions": {"=": [{"col": "genre"}, "F"]}},
//!     "colonnes": [{"type": "aggregation", "titre": "Nombre",
//!                   "expr": {"agg": "count", "col": "1"}}]
//! }"#).unwrap();
//!
//! let compiled = compile_indicator(&spec, &CompileOptions::default()).unwrap();
//! assert_eq!(compiled.sql, r#"SELECT COUNT(1) AS "Nombre" FROM t WHERE genre = 'f';"#);
//! ```

mod aggregation;
mod condition;
mod expression;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::SpecificationError;
use crate::model::{CaseArm, ColumnKind, Condition, IndicatorSpec};
use crate::sql::expr::{lit_str, table_col, Expr, ExprExt};
use crate::sql::query::{Query, SelectExpr, TableRef};
use crate::sql::Dialect;

// ============================================================================
// Options
// ============================================================================

/// Explicit join predicate between two tables.
///
/// `left.left_column = right.right_column`; matched in either orientation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRule {
    pub left: String,
    pub right: String,
    pub left_column: String,
    pub right_column: String,
}

/// Options for compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// SQL dialect to generate.
    pub dialect: Dialect,
    /// Column shared by every joinable table, used when no [`JoinRule`]
    /// covers a pair.
    pub identity_column: String,
    /// Per table pair join predicates.
    pub joins: Vec<JoinRule>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            identity_column: "id".into(),
            joins: vec![],
        }
    }
}

impl CompileOptions {
    /// Set the SQL dialect.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the fallback identity column.
    pub fn with_identity_column(mut self, column: &str) -> Self {
        self.identity_column = column.into();
        self
    }

    /// Add a join rule.
    pub fn with_join(mut self, rule: JoinRule) -> Self {
        self.joins.push(rule);
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result of compiling an indicator to SQL.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    /// The generated SQL statement, terminated with `;`.
    pub sql: String,
    /// The SQL query AST.
    pub query: Query,
    /// The dialect used for generation.
    pub dialect: Dialect,
}

// ============================================================================
// Compilation Functions
// ============================================================================

/// Compile a validated indicator to SQL.
pub fn compile_indicator(
    spec: &IndicatorSpec,
    options: &CompileOptions,
) -> Result<CompiledQuery, SpecificationError> {
    let compiler = Compiler::new(options);
    let query = compiler.indicator(spec)?;
    let sql = query.to_statement(options.dialect);

    debug!(dialect = %options.dialect, sql = %sql, "compiled indicator");

    Ok(CompiledQuery {
        sql,
        query,
        dialect: options.dialect,
    })
}

/// Parse and compile an indicator given as JSON.
pub fn compile_json(
    value: &Value,
    options: &CompileOptions,
) -> Result<CompiledQuery, SpecificationError> {
    let spec = IndicatorSpec::parse(value)?;
    compile_indicator(&spec, options)
}

/// Shared state of one compilation; the per-node compilers are split across
/// the submodules as `impl Compiler` blocks.
pub(crate) struct Compiler<'a> {
    options: &'a CompileOptions,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(options: &'a CompileOptions) -> Self {
        Self { options }
    }

    fn indicator(&self, spec: &IndicatorSpec) -> Result<Query, SpecificationError> {
        let mut query = self.from_tables(&spec.subject.tables)?;

        if !spec.subject.conditions.is_empty() {
            query = query.filter(self.condition(&spec.subject.conditions)?);
        }

        let mut select: Vec<SelectExpr> = Vec::with_capacity(spec.columns.len());
        let mut group_by = Vec::new();

        for column in &spec.columns {
            match &column.kind {
                ColumnKind::GroupBy(expr) => {
                    let expr = self.expression(expr)?;
                    group_by.push(expr.clone());
                    select.push(expr.alias(&column.title));
                }
                ColumnKind::Case(arms) => {
                    let expr = self.case(arms)?;
                    group_by.push(expr.clone());
                    select.push(expr.alias(&column.title));
                }
                ColumnKind::Aggregation(expr) => {
                    select.push(self.expression(expr)?.alias(&column.title));
                }
            }
        }

        Ok(query.select(select).group_by(group_by))
    }

    /// `CASE WHEN <cond> THEN '<label>' ... END`
    ///
    /// Labels are display values: escaped, not normalized.
    fn case(&self, arms: &[CaseArm]) -> Result<Expr, SpecificationError> {
        let when_clauses = arms
            .iter()
            .map(|arm| Ok((self.condition(&arm.when)?, lit_str(&arm.label))))
            .collect::<Result<Vec<_>, SpecificationError>>()?;
        Ok(Expr::Case {
            when_clauses,
            else_clause: None,
        })
    }

    /// A query skeleton with FROM and JOINs for `tables`, left to right.
    fn from_tables(&self, tables: &[String]) -> Result<Query, SpecificationError> {
        let (first, rest) = tables.split_first().ok_or(SpecificationError::NoTables)?;

        let mut query = Query::new().from(TableRef::new(first));
        for (i, table) in rest.iter().enumerate() {
            let on = self.join_predicate(&tables[..=i], table);
            query = query.join(TableRef::new(table), on);
        }
        Ok(query)
    }

    /// Join predicate for `table` against the tables already in FROM.
    fn join_predicate(&self, joined: &[String], table: &str) -> Expr {
        for rule in &self.options.joins {
            if rule.right == table && joined.contains(&rule.left) {
                return table_col(&rule.left, &rule.left_column)
                    .eq(table_col(&rule.right, &rule.right_column));
            }
            if rule.left == table && joined.contains(&rule.right) {
                return table_col(&rule.right, &rule.right_column)
                    .eq(table_col(&rule.left, &rule.left_column));
            }
        }

        let identity = &self.options.identity_column;
        let first = joined.first().map(String::as_str).unwrap_or(table);
        table_col(first, identity).eq(table_col(table, identity))
    }

    /// Combine a nested subject's conditions with an aggregation condition.
    fn combined(conditions: &[&Condition]) -> Condition {
        let parts: Vec<Condition> = conditions
            .iter()
            .filter(|c| !c.is_empty())
            .map(|c| (*c).clone())
            .collect();
        match parts.len() {
            0 => Condition::Empty,
            1 => parts.into_iter().next().unwrap_or(Condition::Empty),
            _ => Condition::All(parts),
        }
    }
}
