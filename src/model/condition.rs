//! Condition trees.

use serde_json::Value;

use super::expression::Expression;
use crate::error::SpecificationError;

/// Comparison operators accepted as condition keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// `=` or `==`
    Eq,
    /// `!=` or `<>`
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
}

impl ComparisonOp {
    /// Parse a condition key. `like` / `not_like` match case-insensitively.
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim();
        match key {
            "=" | "==" => return Some(ComparisonOp::Eq),
            "!=" | "<>" => return Some(ComparisonOp::Ne),
            "<" => return Some(ComparisonOp::Lt),
            "<=" => return Some(ComparisonOp::Lte),
            ">" => return Some(ComparisonOp::Gt),
            ">=" => return Some(ComparisonOp::Gte),
            _ => {}
        }
        match key.to_lowercase().as_str() {
            "like" => Some(ComparisonOp::Like),
            "not_like" => Some(ComparisonOp::NotLike),
            _ => None,
        }
    }

    /// Whether this is an equality-style operator (`=`, `!=`) eligible for
    /// wildcard promotion.
    pub fn is_equality(&self) -> bool {
        matches!(self, ComparisonOp::Eq | ComparisonOp::Ne)
    }
}

/// A recursive condition node.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// No filter.
    Empty,
    /// A bare JSON list: implicit AND.
    All(Vec<Condition>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Compare {
        op: ComparisonOp,
        left: Expression,
        right: Expression,
    },
}

impl Condition {
    pub fn parse(value: &Value) -> Result<Self, SpecificationError> {
        match value {
            Value::Null => Ok(Condition::Empty),
            Value::Array(items) if items.is_empty() => Ok(Condition::Empty),
            Value::Array(items) => Ok(Condition::All(parse_children(items)?)),
            Value::Object(obj) if obj.is_empty() => Ok(Condition::Empty),
            Value::Object(obj) => {
                if obj.len() != 1 {
                    return Err(SpecificationError::invalid("condition", value));
                }
                let Some((key, operands)) = obj.iter().next() else {
                    return Err(SpecificationError::invalid("condition", value));
                };

                match key.to_lowercase().as_str() {
                    "and" => return Ok(Condition::And(junction_children(operands, value)?)),
                    "or" => return Ok(Condition::Or(junction_children(operands, value)?)),
                    _ => {}
                }

                let op = ComparisonOp::parse(key).ok_or_else(|| {
                    SpecificationError::UnknownOperator {
                        context: "comparison",
                        op: key.clone(),
                    }
                })?;
                match operands {
                    Value::Array(pair) if pair.len() == 2 => Ok(Condition::Compare {
                        op,
                        left: Expression::parse(&pair[0])?,
                        right: Expression::parse(&pair[1])?,
                    }),
                    _ => Err(SpecificationError::invalid("comparison", value)),
                }
            }
            _ => Err(SpecificationError::invalid("condition", value)),
        }
    }

    /// Whether this condition filters nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, Condition::Empty)
    }
}

fn junction_children(operands: &Value, node: &Value) -> Result<Vec<Condition>, SpecificationError> {
    match operands {
        Value::Array(items) => parse_children(items),
        Value::Null => Ok(vec![]),
        _ => Err(SpecificationError::invalid("condition", node)),
    }
}

fn parse_children(items: &[Value]) -> Result<Vec<Condition>, SpecificationError> {
    items.iter().map(Condition::parse).collect()
}
