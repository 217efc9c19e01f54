//! Expression and aggregation nodes.

use serde_json::{Map, Value};

use super::condition::Condition;
use super::Subject;
use crate::error::SpecificationError;
use crate::normalize::{normalize_text, normalize_scalar};

/// A JSON scalar embedded in an indicator.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Scalar {
    /// Convert a JSON value; `None` for arrays and objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            Value::String(s) => Some(Scalar::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Whether this operand stands for "no value": JSON null, or text that
    /// normalizes to nothing.
    pub fn is_absent(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Text(s) => normalize_text(s).is_none(),
            _ => false,
        }
    }

    /// Whether this is text carrying a `%` wildcard.
    pub fn has_wildcard(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.contains('%'))
    }

    /// Normalized text form, used for LIKE patterns.
    pub fn normalized_text(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Int(i) => normalize_scalar(&Value::from(*i)),
            Scalar::Float(f) => normalize_scalar(&Value::from(*f)),
            Scalar::Bool(b) => normalize_scalar(&Value::from(*b)),
            Scalar::Text(s) => normalize_text(s),
        }
    }
}

/// Arithmetic and concatenation operators allowed in `{"op": .., "args": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
}

impl ArithmeticOp {
    pub fn parse(op: &str) -> Option<Self> {
        match op.trim() {
            "+" => Some(ArithmeticOp::Add),
            "-" => Some(ArithmeticOp::Sub),
            "*" => Some(ArithmeticOp::Mul),
            "/" => Some(ArithmeticOp::Div),
            "%" => Some(ArithmeticOp::Mod),
            "||" => Some(ArithmeticOp::Concat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
            ArithmeticOp::Concat => "||",
        }
    }
}

/// A recursive expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Scalar),
    /// Column reference, already physically resolved (or resolved later by
    /// the schema resolver).
    Column(String),
    Operator {
        op: ArithmeticOp,
        args: Vec<Expression>,
    },
    /// Only valid inside aggregation columns (ratio indicators).
    Aggregate(Box<Aggregation>),
}

impl Expression {
    /// Parse an expression where aggregates are not allowed.
    pub fn parse(value: &Value) -> Result<Self, SpecificationError> {
        Self::parse_node(value, false)
    }

    /// Parse the expression of an aggregation column.
    pub fn parse_aggregate(value: &Value) -> Result<Self, SpecificationError> {
        Self::parse_node(value, true)
    }

    fn parse_node(value: &Value, allow_aggregates: bool) -> Result<Self, SpecificationError> {
        if let Some(scalar) = Scalar::from_json(value) {
            return Ok(Expression::Literal(scalar));
        }

        let obj = match value {
            Value::Object(obj) => obj,
            _ => return Err(SpecificationError::invalid("expression", value)),
        };

        // Aggregations carry their own `col` key
        if obj.contains_key("agg") {
            if !allow_aggregates {
                return Err(SpecificationError::invalid(
                    "expression (aggregate outside an aggregation column)",
                    value,
                ));
            }
            return Ok(Expression::Aggregate(Box::new(Aggregation::parse_object(obj, value)?)));
        }

        if let Some(name) = obj.get("col") {
            return match name {
                Value::String(s) if !s.trim().is_empty() => Ok(Expression::Column(s.clone())),
                _ => Err(SpecificationError::invalid("column reference", value)),
            };
        }

        if let Some(op) = obj.get("op") {
            let op_text = op
                .as_str()
                .ok_or_else(|| SpecificationError::invalid("operator", value))?;
            let op = ArithmeticOp::parse(op_text).ok_or_else(|| {
                SpecificationError::UnknownOperator {
                    context: "arithmetic",
                    op: op_text.to_string(),
                }
            })?;
            let args = match obj.get("args") {
                Some(Value::Array(args)) if !args.is_empty() => args,
                Some(_) => return Err(SpecificationError::invalid("operator arguments", value)),
                None => return Err(SpecificationError::missing("operator", "args", value)),
            };
            let args = args
                .iter()
                .map(|arg| Self::parse_node(arg, allow_aggregates))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Expression::Operator { op, args });
        }

        Err(SpecificationError::invalid("expression", value))
    }

    /// Whether any aggregate appears in this tree.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::Aggregate(_) => true,
            Expression::Operator { args, .. } => args.iter().any(Expression::contains_aggregate),
            Expression::Literal(_) | Expression::Column(_) => false,
        }
    }

    /// Subjects of cross-table aggregates in this tree.
    pub fn nested_subjects(&self) -> Vec<&Subject> {
        match self {
            Expression::Aggregate(agg) => agg.subject.iter().collect(),
            Expression::Operator { args, .. } => {
                args.iter().flat_map(Expression::nested_subjects).collect()
            }
            Expression::Literal(_) | Expression::Column(_) => vec![],
        }
    }
}

/// Supported aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "count" => Some(AggregateFunction::Count),
            "count_distinct" => Some(AggregateFunction::CountDistinct),
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            _ => None,
        }
    }

    /// SQL function name.
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggregateFunction::Count | AggregateFunction::CountDistinct => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }

    pub fn is_count(&self) -> bool {
        matches!(self, AggregateFunction::Count)
    }
}

/// `{"agg": .., "col"?: .., "condition"?: .., "subject"?: ..}`
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub function: AggregateFunction,
    /// `None` means "count rows" (`COUNT(*)`).
    pub column: Option<String>,
    pub condition: Condition,
    /// Cross-table subject; evaluated as a scalar subquery.
    pub subject: Option<Subject>,
}

impl Aggregation {
    pub fn parse(value: &Value) -> Result<Self, SpecificationError> {
        match value {
            Value::Object(obj) => Self::parse_object(obj, value),
            _ => Err(SpecificationError::invalid("aggregation", value)),
        }
    }

    fn parse_object(obj: &Map<String, Value>, value: &Value) -> Result<Self, SpecificationError> {
        let name = match obj.get("agg") {
            Some(Value::String(name)) => name,
            Some(_) => return Err(SpecificationError::invalid("aggregation", value)),
            None => return Err(SpecificationError::missing("aggregation", "agg", value)),
        };
        let function = AggregateFunction::parse(name)
            .ok_or_else(|| SpecificationError::UnknownFunction(name.clone()))?;

        let column = match obj.get("col") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Object(inner)) => match inner.get("col") {
                Some(Value::String(s)) => Some(s.clone()),
                _ => return Err(SpecificationError::invalid("aggregation column", value)),
            },
            Some(_) => return Err(SpecificationError::invalid("aggregation column", value)),
        };

        if column.is_none() && !function.is_count() {
            return Err(SpecificationError::missing("aggregation", "col", value));
        }

        let condition = match obj.get("condition") {
            Some(cond) => Condition::parse(cond)?,
            None => Condition::Empty,
        };

        // Editors emit an empty nested subject by default; it means "none".
        let subject = match obj.get("subject").or_else(|| obj.get("sujet")) {
            None | Some(Value::Null) => None,
            Some(raw) => {
                let subject = Subject::parse(raw)?;
                if subject.tables.is_empty() {
                    None
                } else {
                    Some(subject)
                }
            }
        };

        Ok(Aggregation {
            function,
            column,
            condition,
            subject,
        })
    }
}
