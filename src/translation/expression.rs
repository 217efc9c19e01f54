//! Expression nodes to SQL expressions.

use super::Compiler;
use crate::error::SpecificationError;
use crate::model::{Expression, Scalar};
use crate::normalize::normalize_text;
use crate::sql::expr::{col, lit_bool, lit_float, lit_int, lit_null, lit_str, Expr};

impl Compiler<'_> {
    /// Compile an expression node.
    ///
    /// Column names are emitted as-is when they are plain identifiers and
    /// double-quoted otherwise; operator chains are always parenthesized.
    pub(crate) fn expression(&self, expr: &Expression) -> Result<Expr, SpecificationError> {
        Ok(match expr {
            Expression::Literal(scalar) => literal(scalar),
            Expression::Column(name) => col(name),
            Expression::Operator { op, args } => Expr::Operator {
                op: op.as_str().to_string(),
                args: args
                    .iter()
                    .map(|arg| self.expression(arg))
                    .collect::<Result<Vec<_>, _>>()?,
            },
            Expression::Aggregate(agg) => self.aggregation(agg)?,
        })
    }
}

/// Render a scalar as a SQL literal. Text is normalized; text that
/// normalizes to nothing becomes `NULL`.
pub(crate) fn literal(scalar: &Scalar) -> Expr {
    match scalar {
        Scalar::Null => lit_null(),
        Scalar::Int(n) => lit_int(*n),
        Scalar::Float(f) if f.is_finite() => lit_float(*f),
        Scalar::Float(_) => lit_null(),
        Scalar::Bool(b) => lit_bool(*b),
        Scalar::Text(s) => match normalize_text(s) {
            Some(text) => lit_str(&text),
            None => lit_null(),
        },
    }
}
