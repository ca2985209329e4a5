//! Guard rule evaluator.
//!
//! Evaluation is pure and total over form data: a field that is missing,
//! null or of the wrong type makes its comparison `false` instead of
//! failing, so one malformed answer cannot stop navigation. The two hard
//! failures are an unresolved custom predicate and a malformed rule shape.
//!
//! Logical operators short-circuit left to right.

use formflow_core::{ComparisonOp, InvalidGuardError, LogicalOp, Rule, Transition, UnifiedFormSchema};
use regex::Regex;
use serde_json::Value;

use crate::error::RuleError;
use crate::numeric;
use crate::path;
use crate::registry::CustomRuleRegistry;

static NULL: Value = Value::Null;

/// Evaluate `rule` against `data`.
pub fn evaluate(
    rule: &Rule,
    data: &Value,
    registry: &CustomRuleRegistry,
) -> Result<bool, RuleError> {
    match rule {
        Rule::Comparison {
            field,
            operator,
            value,
        } => {
            let actual = path::resolve(data, field).unwrap_or(&NULL);
            compare(field, actual, *operator, value)
        }

        Rule::Logical { operator, children } => match operator {
            LogicalOp::And => {
                require_children(*operator, children)?;
                for child in children {
                    if !evaluate(child, data, registry)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            LogicalOp::Or => {
                require_children(*operator, children)?;
                for child in children {
                    if evaluate(child, data, registry)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            LogicalOp::Not => match children.as_slice() {
                [child] => Ok(!evaluate(child, data, registry)?),
                _ => Err(InvalidGuardError::new(format!(
                    "'not' requires exactly one child, got {}",
                    children.len()
                ))
                .into()),
            },
        },

        Rule::Custom {
            function_name,
            args,
        } => {
            let predicate =
                registry
                    .get(function_name)
                    .ok_or_else(|| RuleError::UnknownCustomRule {
                        name: function_name.clone(),
                    })?;
            Ok(predicate(args, data))
        }
    }
}

fn require_children(operator: LogicalOp, children: &[Rule]) -> Result<(), RuleError> {
    if children.is_empty() {
        return Err(InvalidGuardError::new(format!("'{}' requires at least one child", operator)).into());
    }
    Ok(())
}

fn compare(field: &str, actual: &Value, op: ComparisonOp, expected: &Value) -> Result<bool, RuleError> {
    match op {
        ComparisonOp::Eq => Ok(numeric::values_equal(actual, expected)),
        ComparisonOp::Neq => Ok(!numeric::values_equal(actual, expected)),
        ComparisonOp::Gt | ComparisonOp::Gte | ComparisonOp::Lt | ComparisonOp::Lte => {
            match (numeric::to_decimal(actual), numeric::to_decimal(expected)) {
                (Some(l), Some(r)) => Ok(numeric::compare_decimals(l, r, op)),
                _ => Ok(false),
            }
        }
        ComparisonOp::In => {
            let Value::Array(candidates) = expected else {
                return Err(InvalidGuardError::new(format!(
                    "'in' on field '{}' requires an array value",
                    field
                ))
                .into());
            };
            Ok(candidates.iter().any(|c| numeric::values_equal(actual, c)))
        }
        ComparisonOp::Matches => {
            let Value::String(pattern) = expected else {
                return Err(InvalidGuardError::new(format!(
                    "'matches' on field '{}' requires a string pattern",
                    field
                ))
                .into());
            };
            let re = Regex::new(pattern).map_err(|e| {
                InvalidGuardError::new(format!("bad pattern for field '{}': {}", field, e))
            })?;
            Ok(match_text(actual).is_some_and(|text| re.is_match(&text)))
        }
    }
}

/// String coercion used by `matches`. Null, arrays and objects have none.
pub fn match_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Evaluate an optional guard; an absent guard always holds.
pub fn guard_holds(
    guard: Option<&Rule>,
    data: &Value,
    registry: &CustomRuleRegistry,
) -> Result<bool, RuleError> {
    match guard {
        Some(rule) => evaluate(rule, data, registry),
        None => Ok(true),
    }
}

/// The rule that must hold for `transition` to be taken: its own guard
/// and the entry guard of its target step, in that order.
pub fn admission_rule(schema: &UnifiedFormSchema, transition: &Transition) -> Option<Rule> {
    let entry = schema.step(&transition.target).and_then(|s| s.guard.as_ref());
    match (transition.guard.as_ref(), entry) {
        (Some(g), Some(e)) => Some(Rule::Logical {
            operator: LogicalOp::And,
            children: vec![g.clone(), e.clone()],
        }),
        (Some(g), None) => Some(g.clone()),
        (None, Some(e)) => Some(e.clone()),
        (None, None) => None,
    }
}

/// True when `transition` may be taken for `data`.
pub fn admits(
    schema: &UnifiedFormSchema,
    transition: &Transition,
    data: &Value,
    registry: &CustomRuleRegistry,
) -> Result<bool, RuleError> {
    if !guard_holds(transition.guard.as_ref(), data, registry)? {
        return Ok(false);
    }
    let entry = schema.step(&transition.target).and_then(|s| s.guard.as_ref());
    guard_holds(entry, data, registry)
}

/// The transition taken out of `step_id` for `data`: the first one, in
/// priority order, that admits the data. `None` means navigation is
/// blocked, or the step is terminal.
pub fn select_transition<'s>(
    schema: &'s UnifiedFormSchema,
    step_id: &str,
    data: &Value,
    registry: &CustomRuleRegistry,
) -> Result<Option<&'s Transition>, RuleError> {
    for transition in schema.transitions_from(step_id) {
        if admits(schema, transition, data, registry)? {
            return Ok(Some(transition));
        }
    }
    Ok(None)
}
