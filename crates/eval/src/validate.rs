//! Step data validation.
//!
//! Checks the answers collected for a step against its field definitions:
//! required fields must be present and non-empty, and present values must
//! satisfy the field's JSON Schema.

use formflow_core::Step;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Missing,
    Invalid,
}

/// One problem with one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub kind: ViolationKind,
    pub message: String,
}

/// True when `value` counts as an answer for a required field.
pub fn is_answered(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Validate `data` against every field of `step`. An empty result means
/// the step's data is acceptable.
pub fn validate_step_data(step: &Step, data: &Value) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    for field in &step.fields {
        let value = path::resolve(data, &field.name);
        if !is_answered(value) {
            if field.required {
                violations.push(FieldViolation {
                    field: field.name.clone(),
                    kind: ViolationKind::Missing,
                    message: format!("required field '{}' is missing", field.name),
                });
            }
            continue;
        }
        let (Some(schema), Some(value)) = (&field.validation, value) else {
            continue;
        };
        let validator = match jsonschema::validator_for(schema) {
            Ok(v) => v,
            Err(e) => {
                violations.push(FieldViolation {
                    field: field.name.clone(),
                    kind: ViolationKind::Invalid,
                    message: format!("validation schema does not compile: {}", e),
                });
                continue;
            }
        };
        violations.extend(validator.iter_errors(value).map(|e| FieldViolation {
            field: field.name.clone(),
            kind: ViolationKind::Invalid,
            message: e.to_string(),
        }));
    }
    violations
}
