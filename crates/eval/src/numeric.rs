//! Numeric coercion for guard comparisons.
//!
//! Form data arrives loosely typed: numbers may be JSON numbers or numeric
//! strings typed into an input. Everything is coerced to `Decimal` so that
//! `0.1 + 0.2`-style float noise never changes a guard outcome. Values that
//! do not coerce make ordering comparisons evaluate to `false`.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};

use formflow_core::ComparisonOp;

/// Coerce a JSON number or numeric string to a decimal.
pub fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => number_to_decimal(n),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

fn number_to_decimal(n: &Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    parse_decimal(&n.to_string()).or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok()))
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

/// Convert a decimal back to JSON, preferring an integer representation.
pub fn decimal_to_json(d: Decimal) -> Value {
    let d = d.normalize();
    if d.scale() == 0 {
        if let Some(i) = d.to_i64() {
            return Value::from(i);
        }
    }
    d.to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(d.to_string()))
}

/// Smallest increment at the precision of `d`: `1` for integers, `0.1`
/// for one decimal place, and so on.
pub fn unit_step(d: Decimal) -> Decimal {
    let scale = d.normalize().scale();
    if scale == 0 {
        Decimal::ONE
    } else {
        Decimal::new(1, scale)
    }
}

/// Apply an ordering operator to two decimals.
pub fn compare_decimals(left: Decimal, right: Decimal, op: ComparisonOp) -> bool {
    match op {
        ComparisonOp::Gt => left > right,
        ComparisonOp::Gte => left >= right,
        ComparisonOp::Lt => left < right,
        ComparisonOp::Lte => left <= right,
        ComparisonOp::Eq => left == right,
        ComparisonOp::Neq => left != right,
        ComparisonOp::In | ComparisonOp::Matches => false,
    }
}

/// Equality used by `eq`, `neq` and `in`: two numbers compare by value,
/// everything else structurally.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            match (number_to_decimal(l), number_to_decimal(r)) {
                (Some(l), Some(r)) => l == r,
                _ => l == r,
            }
        }
        _ => left == right,
    }
}
