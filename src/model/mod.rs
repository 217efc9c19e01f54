//! Typed indicator specifications.
//!
//! Indicators arrive as JSON written by non-programmers through the editor.
//! Everything is validated here, up front, so the compilers downstream only
//! ever see well-formed trees:
//!
//! ```text
//! { "sujet": { "tables": [..], "conditions": <condition | []> },
//!   "colonnes": [ { "type": "group_by" | "case" | "aggregation",
//!                   "titre": "..",
//!                   "expr"?: <expression>,
//!                   "cases"?: [ { "when": <condition>, "label": ".." } ] } ] }
//! ```

mod condition;
mod expression;
mod scope;

pub use condition::{ComparisonOp, Condition};
pub use expression::{AggregateFunction, Aggregation, ArithmeticOp, Expression, Scalar};
pub use scope::{NameVisitor, Scope};

use serde_json::Value;

use crate::error::SpecificationError;

/// A complete indicator specification.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSpec {
    pub subject: Subject,
    pub columns: Vec<ColumnSpec>,
}

impl IndicatorSpec {
    /// Parse an indicator from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, SpecificationError> {
        let value: Value = serde_json::from_str(text)?;
        Self::parse(&value)
    }

    /// Parse an indicator from a JSON value.
    pub fn parse(value: &Value) -> Result<Self, SpecificationError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SpecificationError::invalid("indicator", value))?;

        let subject = obj
            .get("sujet")
            .ok_or_else(|| SpecificationError::missing("indicator", "sujet", value))?;
        let subject = Subject::parse(subject)?;

        let columns = match obj.get("colonnes") {
            Some(Value::Array(cols)) => cols
                .iter()
                .map(ColumnSpec::parse)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(SpecificationError::invalid("indicator columns", value)),
            None => return Err(SpecificationError::missing("indicator", "colonnes", value)),
        };

        Ok(IndicatorSpec { subject, columns })
    }

    /// Every table name referenced, including nested aggregation subjects,
    /// in first-seen order.
    pub fn referenced_tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = Vec::new();
        let mut add = |names: &[String]| {
            for name in names {
                if !tables.contains(name) {
                    tables.push(name.clone());
                }
            }
        };

        add(&self.subject.tables);
        for column in &self.columns {
            if let ColumnKind::Aggregation(expr) = &column.kind {
                for subject in expr.nested_subjects() {
                    add(&subject.tables);
                }
            }
        }
        tables
    }
}

/// The base row set: tables plus filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub tables: Vec<String>,
    pub conditions: Condition,
}

impl Subject {
    pub fn parse(value: &Value) -> Result<Self, SpecificationError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SpecificationError::invalid("subject", value))?;

        let tables = match obj.get("tables") {
            Some(Value::Array(tables)) => tables
                .iter()
                .map(|t| match t {
                    Value::String(name) if !name.trim().is_empty() => Ok(name.clone()),
                    _ => Err(SpecificationError::invalid("subject table", value)),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(SpecificationError::invalid("subject tables", value)),
            None => return Err(SpecificationError::missing("subject", "tables", value)),
        };

        // Nested subjects written by the editor use the singular key
        let conditions = match obj.get("conditions").or_else(|| obj.get("condition")) {
            Some(cond) => Condition::parse(cond)?,
            None => Condition::Empty,
        };

        Ok(Subject { tables, conditions })
    }
}

/// One output column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Display title, used as the column alias.
    pub title: String,
    pub kind: ColumnKind,
}

/// What a column computes.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    /// Grouping expression.
    GroupBy(Expression),
    /// Bucketing into labels, also grouped on.
    Case(Vec<CaseArm>),
    /// Aggregate (possibly a ratio of aggregates).
    Aggregation(Expression),
}

/// `{"when": <condition>, "label": ".."}`
#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    pub when: Condition,
    pub label: String,
}

impl ColumnSpec {
    pub fn parse(value: &Value) -> Result<Self, SpecificationError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SpecificationError::invalid("column", value))?;

        let kind = match obj.get("type") {
            Some(Value::String(kind)) => kind.as_str(),
            Some(_) => return Err(SpecificationError::invalid("column", value)),
            None => return Err(SpecificationError::missing("column", "type", value)),
        };
        let title = match obj.get("titre") {
            Some(Value::String(title)) => title.clone(),
            Some(_) => return Err(SpecificationError::invalid("column title", value)),
            None => return Err(SpecificationError::missing("column", "titre", value)),
        };

        let kind = match kind {
            "group_by" => {
                let expr = obj
                    .get("expr")
                    .ok_or_else(|| SpecificationError::missing("group_by column", "expr", value))?;
                ColumnKind::GroupBy(Expression::parse(expr)?)
            }
            "aggregation" => {
                let expr = obj.get("expr").ok_or_else(|| {
                    SpecificationError::missing("aggregation column", "expr", value)
                })?;
                ColumnKind::Aggregation(Expression::parse_aggregate(expr)?)
            }
            "case" => {
                let cases = match obj.get("cases") {
                    Some(Value::Array(cases)) if !cases.is_empty() => cases,
                    Some(_) => return Err(SpecificationError::invalid("case column", value)),
                    None => return Err(SpecificationError::missing("case column", "cases", value)),
                };
                ColumnKind::Case(
                    cases
                        .iter()
                        .map(CaseArm::parse)
                        .collect::<Result<Vec<_>, _>>()?,
                )
            }
            _ => return Err(SpecificationError::invalid("column type", value)),
        };

        Ok(ColumnSpec { title, kind })
    }

    /// Whether this column contributes a GROUP BY entry.
    pub fn is_grouping(&self) -> bool {
        matches!(self.kind, ColumnKind::GroupBy(_) | ColumnKind::Case(_))
    }
}

impl CaseArm {
    pub fn parse(value: &Value) -> Result<Self, SpecificationError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SpecificationError::invalid("case", value))?;
        let when = obj
            .get("when")
            .ok_or_else(|| SpecificationError::missing("case", "when", value))?;
        let label = match obj.get("label") {
            Some(Value::String(label)) => label.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => return Err(SpecificationError::invalid("case label", value)),
            None => return Err(SpecificationError::missing("case", "label", value)),
        };
        Ok(CaseArm {
            when: Condition::parse(when)?,
            label,
        })
    }
}
