//! Aggregation nodes to SQL aggregates.
//!
//! Two shapes cover every indicator:
//!
//! - same base rows, filtered per aggregate: `COUNT(CASE WHEN c THEN 1 END)`;
//! - a different base table: `(SELECT FUNC(col) FROM t WHERE c)`.

use super::Compiler;
use crate::error::SpecificationError;
use crate::model::{AggregateFunction, Aggregation};
use crate::sql::expr::{col, count_distinct, count_star, func, lit_int, Expr};

impl Compiler<'_> {
    pub(crate) fn aggregation(&self, agg: &Aggregation) -> Result<Expr, SpecificationError> {
        if let Some(subject) = &agg.subject {
            let condition = Self::combined(&[&subject.conditions, &agg.condition]);
            let mut query = self
                .from_tables(&subject.tables)?
                .select(vec![aggregate(agg.function, agg.column.as_deref().map(col))?]);
            if !condition.is_empty() {
                query = query.filter(self.condition(&condition)?);
            }
            return Ok(query.into());
        }

        if agg.condition.is_empty() {
            return aggregate(agg.function, agg.column.as_deref().map(col));
        }

        let when = self.condition(&agg.condition)?;
        let then = if agg.function.is_count() {
            lit_int(1)
        } else {
            match &agg.column {
                Some(name) => col(name),
                None => return Err(missing_column(agg.function)),
            }
        };
        let filtered = Expr::Case {
            when_clauses: vec![(when, then)],
            else_clause: None,
        };
        aggregate(agg.function, Some(filtered))
    }
}

/// `FUNC(arg)`; `COUNT(*)` for a count without argument.
fn aggregate(function: AggregateFunction, arg: Option<Expr>) -> Result<Expr, SpecificationError> {
    match (function, arg) {
        (AggregateFunction::Count, None) => Ok(count_star()),
        (AggregateFunction::CountDistinct, Some(arg)) => Ok(count_distinct(arg)),
        (function, Some(arg)) => Ok(func(function.sql_name(), vec![arg])),
        (function, None) => Err(missing_column(function)),
    }
}

fn missing_column(function: AggregateFunction) -> SpecificationError {
    SpecificationError::MissingKey {
        context: "aggregation",
        key: "col",
        node: function.sql_name().to_lowercase(),
    }
}
