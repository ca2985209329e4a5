//! Replays synthesized data through a schema.
//!
//! Every candidate path is checked against the evaluator's own navigation
//! (`select_transition`) before it is emitted, so emitted paths are exactly
//! the ones a renderer would follow.

use formflow_core::UnifiedFormSchema;
use formflow_eval::{guard_holds, select_transition, validate_step_data, CustomRuleRegistry, RuleError};
use serde_json::Value;

use crate::report::Outcome;

pub struct Navigator<'a> {
    schema: &'a UnifiedFormSchema,
    registry: &'a CustomRuleRegistry,
}

impl<'a> Navigator<'a> {
    pub fn new(schema: &'a UnifiedFormSchema, registry: &'a CustomRuleRegistry) -> Self {
        Navigator { schema, registry }
    }

    /// True when navigation with `data` visits exactly `steps`, entry first.
    pub fn follows(&self, steps: &[String], data: &Value) -> Result<bool, RuleError> {
        let Some(first) = steps.first() else {
            return Ok(false);
        };
        let entry = self.schema.step(first).and_then(|s| s.guard.as_ref());
        if !guard_holds(entry, data, self.registry)? {
            return Ok(false);
        }
        for pair in steps.windows(2) {
            match select_transition(self.schema, &pair[0], data, self.registry)? {
                Some(t) if t.target == pair[1] => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    /// True when `steps` is followed and navigation then ends the way
    /// `outcome` says.
    pub fn confirms(&self, steps: &[String], data: &Value, outcome: Outcome) -> Result<bool, RuleError> {
        if !self.follows(steps, data)? {
            return Ok(false);
        }
        let Some(last) = steps.last() else {
            return Ok(false);
        };
        match outcome {
            Outcome::Success => Ok(self.schema.transitions_from(last).is_empty()),
            Outcome::Blocked => Ok(!self.schema.transitions_from(last).is_empty()
                && select_transition(self.schema, last, data, self.registry)?.is_none()),
            Outcome::ValidationError => Ok(true),
        }
    }

    /// Index of the first visited step whose data does not validate.
    pub fn first_invalid_step(&self, steps: &[String], data: &Value) -> Option<usize> {
        steps.iter().position(|id| {
            self.schema
                .step(id)
                .is_some_and(|step| !validate_step_data(step, data).is_empty())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> UnifiedFormSchema {
        serde_json::from_value(json!({
            "id": "f", "version": "1",
            "steps": [
                {"id": "a", "fields": [{"name": "age", "kind": "number", "required": true}]},
                {"id": "b"},
                {"id": "c"}
            ],
            "transitions": [
                {"source": "a", "target": "b",
                 "guard": {"kind": "comparison", "field": "age", "operator": "gte", "value": 18}},
                {"source": "a", "target": "c",
                 "guard": {"kind": "comparison", "field": "age", "operator": "lt", "value": 13}}
            ]
        }))
        .unwrap()
    }

    fn ids(steps: &[&str]) -> Vec<String> {
        steps.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn confirms_success_and_blocked() {
        let schema = schema();
        let registry = CustomRuleRegistry::new();
        let nav = Navigator::new(&schema, &registry);
        assert!(nav.confirms(&ids(&["a", "b"]), &json!({"age": 20}), Outcome::Success).unwrap());
        assert!(!nav.confirms(&ids(&["a", "b"]), &json!({"age": 10}), Outcome::Success).unwrap());
        assert!(nav.confirms(&ids(&["a"]), &json!({"age": 15}), Outcome::Blocked).unwrap());
        assert!(!nav.confirms(&ids(&["a"]), &json!({"age": 20}), Outcome::Blocked).unwrap());
    }

    #[test]
    fn finds_first_invalid_step() {
        let schema = schema();
        let registry = CustomRuleRegistry::new();
        let nav = Navigator::new(&schema, &registry);
        assert_eq!(nav.first_invalid_step(&ids(&["a", "b"]), &json!({})), Some(0));
        assert_eq!(nav.first_invalid_step(&ids(&["a", "b"]), &json!({"age": 1})), None);
    }
}
