//! Condition trees to SQL boolean expressions.
//!
//! Rules applied to a comparison, in order:
//!
//! 1. absent right operand: `=` becomes `IS NULL`, every other operator
//!    `IS NOT NULL`;
//! 2. `like` / `not_like`: case-insensitive pattern match;
//! 3. `=` / `!=` with a `%` in a text operand: promoted to a (negated)
//!    case-insensitive pattern match;
//! 4. anything else is a plain comparison.

use super::expression::literal;
use super::Compiler;
use crate::error::SpecificationError;
use crate::model::{ComparisonOp, Condition, Expression};
use crate::sql::expr::{CompareOp, Expr, ExprExt};

impl Compiler<'_> {
    /// Compile a condition tree. An empty condition is `1=1`.
    pub(crate) fn condition(&self, cond: &Condition) -> Result<Expr, SpecificationError> {
        match cond {
            Condition::Empty => Ok(Expr::AlwaysTrue),
            Condition::All(items) => match items.as_slice() {
                [] => Ok(Expr::AlwaysTrue),
                [single] => self.condition(single),
                _ => Ok(Expr::And(self.conditions(items)?)),
            },
            Condition::And(items) if items.is_empty() => Ok(Expr::AlwaysTrue),
            Condition::And(items) => Ok(Expr::And(self.conditions(items)?)),
            Condition::Or(items) if items.is_empty() => Ok(Expr::AlwaysTrue),
            Condition::Or(items) => Ok(Expr::Or(self.conditions(items)?)),
            Condition::Compare { op, left, right } => self.comparison(*op, left, right),
        }
    }

    fn conditions(&self, items: &[Condition]) -> Result<Vec<Expr>, SpecificationError> {
        items.iter().map(|c| self.condition(c)).collect()
    }

    fn comparison(
        &self,
        op: ComparisonOp,
        left: &Expression,
        right: &Expression,
    ) -> Result<Expr, SpecificationError> {
        let left_sql = self.expression(left)?;

        if is_absent(right) {
            return Ok(match op {
                ComparisonOp::Eq => left_sql.is_null(),
                _ => left_sql.is_not_null(),
            });
        }

        match op {
            ComparisonOp::Like => return Ok(left_sql.ilike(self.pattern(right)?)),
            ComparisonOp::NotLike => return Ok(left_sql.not_ilike(self.pattern(right)?)),
            _ => {}
        }

        if op.is_equality() {
            let negated = op == ComparisonOp::Ne;
            if has_wildcard(right) {
                return Ok(wildcard_match(left_sql, self.pattern(right)?, negated));
            }
            if has_wildcard(left) {
                // Keep the pattern on the right-hand side
                let subject = self.expression(right)?;
                return Ok(wildcard_match(subject, self.pattern(left)?, negated));
            }
        }

        let right_sql = self.expression(right)?;
        Ok(left_sql.compare(compare_op(op), right_sql))
    }

    /// LIKE pattern: literals are normalized and quoted as text whatever
    /// their JSON type; other expressions compile normally.
    fn pattern(&self, expr: &Expression) -> Result<Expr, SpecificationError> {
        match expr {
            Expression::Literal(scalar) => Ok(match scalar.normalized_text() {
                Some(text) => Expr::from(text.as_str()),
                None => literal(scalar),
            }),
            other => self.expression(other),
        }
    }
}

fn is_absent(expr: &Expression) -> bool {
    matches!(expr, Expression::Literal(scalar) if scalar.is_absent())
}

fn has_wildcard(expr: &Expression) -> bool {
    matches!(expr, Expression::Literal(scalar) if scalar.has_wildcard())
}

fn wildcard_match(subject: Expr, pattern: Expr, negated: bool) -> Expr {
    if negated {
        subject.not_ilike(pattern)
    } else {
        subject.ilike(pattern)
    }
}

fn compare_op(op: ComparisonOp) -> CompareOp {
    match op {
        ComparisonOp::Eq => CompareOp::Eq,
        ComparisonOp::Ne => CompareOp::Ne,
        ComparisonOp::Lt => CompareOp::Lt,
        ComparisonOp::Lte => CompareOp::Lte,
        ComparisonOp::Gt => CompareOp::Gt,
        ComparisonOp::Gte => CompareOp::Gte,
        // Handled before reaching here; kept total for the match.
        ComparisonOp::Like | ComparisonOp::NotLike => CompareOp::Eq,
    }
}
