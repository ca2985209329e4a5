//! Guard rule representation.
//!
//! A `Rule` is an immutable predicate tree attached to transitions and
//! steps. Evaluation lives in `formflow-eval`; this module only owns the
//! shape and its structural invariants.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InvalidGuardError;

/// Comparison operators accepted by `Rule::Comparison`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Matches,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "eq",
            ComparisonOp::Neq => "neq",
            ComparisonOp::Gt => "gt",
            ComparisonOp::Gte => "gte",
            ComparisonOp::Lt => "lt",
            ComparisonOp::Lte => "lte",
            ComparisonOp::In => "in",
            ComparisonOp::Matches => "matches",
        }
    }

    /// True for the four ordering operators.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            ComparisonOp::Gt | ComparisonOp::Gte | ComparisonOp::Lt | ComparisonOp::Lte
        )
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical combinators accepted by `Rule::Logical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => f.write_str("and"),
            LogicalOp::Or => f.write_str("or"),
            LogicalOp::Not => f.write_str("not"),
        }
    }
}

/// A guard predicate.
///
/// Serialized as an internally tagged object, e.g.
/// `{"kind": "comparison", "field": "age", "operator": "gte", "value": 18}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    Comparison {
        field: String,
        operator: ComparisonOp,
        #[serde(default)]
        value: Value,
    },
    Logical {
        operator: LogicalOp,
        children: Vec<Rule>,
    },
    Custom {
        #[serde(rename = "functionName")]
        function_name: String,
        #[serde(default)]
        args: Vec<Value>,
    },
}

impl Rule {
    /// Check the structural invariants of the whole tree.
    ///
    /// `not` takes exactly one child, `and`/`or` at least one, `in`
    /// compares against an array literal and `matches` against a string.
    pub fn validate(&self) -> Result<(), InvalidGuardError> {
        match self {
            Rule::Comparison {
                field,
                operator,
                value,
            } => {
                if field.is_empty() {
                    return Err(InvalidGuardError::new("comparison has an empty field path"));
                }
                match operator {
                    ComparisonOp::In if !value.is_array() => Err(InvalidGuardError::new(format!(
                        "'in' on field '{}' requires an array value",
                        field
                    ))),
                    ComparisonOp::Matches if !value.is_string() => {
                        Err(InvalidGuardError::new(format!(
                            "'matches' on field '{}' requires a string pattern",
                            field
                        )))
                    }
                    _ => Ok(()),
                }
            }
            Rule::Logical { operator, children } => {
                match operator {
                    LogicalOp::Not if children.len() != 1 => {
                        return Err(InvalidGuardError::new(format!(
                            "'not' requires exactly one child, got {}",
                            children.len()
                        )));
                    }
                    LogicalOp::And | LogicalOp::Or if children.is_empty() => {
                        return Err(InvalidGuardError::new(format!(
                            "'{}' requires at least one child",
                            operator
                        )));
                    }
                    _ => {}
                }
                children.iter().try_for_each(Rule::validate)
            }
            Rule::Custom { function_name, .. } => {
                if function_name.is_empty() {
                    Err(InvalidGuardError::new("custom rule has an empty function name"))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Every field path the rule reads, in first-use order.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Rule::Comparison { field, .. } => {
                if !out.contains(&field.as_str()) {
                    out.push(field);
                }
            }
            Rule::Logical { children, .. } => {
                for child in children {
                    child.collect_fields(out);
                }
            }
            Rule::Custom { .. } => {}
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Comparison {
                field,
                operator,
                value,
            } => write!(f, "{} {} {}", field, operator, value),
            Rule::Logical {
                operator: LogicalOp::Not,
                children,
            } => match children.first() {
                Some(child) => write!(f, "not ({})", child),
                None => f.write_str("not ()"),
            },
            Rule::Logical { operator, children } => {
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", operator)?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
            Rule::Custom {
                function_name,
                args,
            } => {
                write!(f, "{}(", function_name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}
