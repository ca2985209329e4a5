//! Declarative field operations usable as migration transforms.
//!
//! ```json
//! [
//!   {"op": "rename", "from": "zip", "to": "address.postalCode"},
//!   {"op": "set_default", "field": "newsletter", "value": false},
//!   {"op": "remove", "field": "fax"}
//! ]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TransformError;
use super::version::Transform;
use crate::path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldOp {
    /// Move a value. A missing source is a no-op.
    Rename { from: String, to: String },
    /// Write `value` unless the field already holds a non-null value.
    SetDefault { field: String, value: Value },
    Remove { field: String },
    /// Duplicate a value. A missing source is a no-op.
    Copy { from: String, to: String },
}

/// An ordered list of field operations, applied in sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldOps(pub Vec<FieldOp>);

impl FieldOps {
    pub fn new(ops: Vec<FieldOp>) -> Self {
        FieldOps(ops)
    }
}

impl FieldOp {
    fn apply_to(&self, data: &mut Value) -> Result<(), TransformError> {
        match self {
            FieldOp::Rename { from, to } => {
                if let Some(value) = path::remove_path(data, from) {
                    write(data, to, value)?;
                }
            }
            FieldOp::SetDefault { field, value } => {
                if !path::is_set(data, field) {
                    write(data, field, value.clone())?;
                }
            }
            FieldOp::Remove { field } => {
                path::remove_path(data, field);
            }
            FieldOp::Copy { from, to } => {
                if let Some(value) = path::resolve(data, from).cloned() {
                    write(data, to, value)?;
                }
            }
        }
        Ok(())
    }
}

fn write(data: &mut Value, field: &str, value: Value) -> Result<(), TransformError> {
    if path::set_path(data, field, value) {
        Ok(())
    } else {
        Err(TransformError::new(format!(
            "cannot write '{}': a non-container value is in the way",
            field
        )))
    }
}

impl Transform for FieldOps {
    fn apply(&self, mut data: Value) -> Result<Value, TransformError> {
        if !data.is_object() {
            return Err(TransformError::new("field operations require object data"));
        }
        for op in &self.0 {
            op.apply_to(&mut data)?;
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ops(value: Value) -> FieldOps {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn applies_operations_in_order() {
        let ops = ops(json!([
            {"op": "rename", "from": "zip", "to": "address.postalCode"},
            {"op": "set_default", "field": "newsletter", "value": false},
            {"op": "copy", "from": "email", "to": "contact.email"},
            {"op": "remove", "field": "fax"}
        ]));
        let out = ops
            .apply(json!({"zip": "0150", "email": "a@b.no", "fax": "123"}))
            .unwrap();
        assert_eq!(
            out,
            json!({
                "address": {"postalCode": "0150"},
                "newsletter": false,
                "email": "a@b.no",
                "contact": {"email": "a@b.no"}
            })
        );
    }

    #[test]
    fn set_default_keeps_existing_values() {
        let ops = ops(json!([{"op": "set_default", "field": "n", "value": 1}]));
        assert_eq!(ops.apply(json!({"n": 5})).unwrap(), json!({"n": 5}));
        assert_eq!(ops.apply(json!({"n": null})).unwrap(), json!({"n": 1}));
    }

    #[test]
    fn missing_sources_are_no_ops() {
        let ops = ops(json!([
            {"op": "rename", "from": "gone", "to": "here"},
            {"op": "remove", "field": "also_gone"}
        ]));
        assert_eq!(ops.apply(json!({"a": 1})).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn blocked_writes_fail() {
        let ops = ops(json!([{"op": "copy", "from": "a", "to": "b.c"}]));
        assert!(ops.apply(json!({"a": 1, "b": "scalar"})).is_err());
        assert!(ops.apply(json!([1, 2])).is_err());
    }
}
