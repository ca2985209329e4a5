//! Guard-driven step data synthesis.
//!
//! A branch decision says "this rule must evaluate to `want`". The
//! synthesizer writes field values that make it so, preferring boundary
//! values for numeric comparisons: `age gte 18` is satisfied with `18` and
//! violated with `17`. Fields already written on the path are never
//! overwritten; the generator re-checks every decision afterwards and drops
//! branches whose data cannot be made consistent.

use std::collections::{BTreeMap, BTreeSet};

use formflow_core::{ComparisonOp, Field, LogicalOp, Rule, Step, UnifiedFormSchema};
use formflow_eval::numeric::{decimal_to_json, to_decimal, unit_step};
use formflow_eval::predicate::match_text;
use formflow_eval::{evaluate, path, CustomRuleRegistry};
use rand::rngs::StdRng;
use regex::Regex;
use serde_json::{Map, Value};

use crate::synth::{synthesize, synthesize_outside};

/// Probe strings tried when a `matches` guard must hold or fail.
const PATTERN_PROBES: &[&str] = &[
    "a",
    "A",
    "abc",
    "ABC",
    "Abc123",
    "0",
    "1",
    "42",
    "0000",
    "12345",
    "123456789",
    "test@example.com",
    "https://example.com",
    "2024-01-01",
    "yes",
    "no",
    "true",
    "",
    "~",
];

/// Form data under construction plus the fields pinned by decisions.
///
/// A pinned field keeps its value even when that value is `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub data: Value,
    pinned: BTreeSet<String>,
}

impl Default for Draft {
    fn default() -> Self {
        Draft {
            data: Value::Object(Map::new()),
            pinned: BTreeSet::new(),
        }
    }
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing data. Nothing is pinned.
    pub fn from_data(data: Value) -> Self {
        Draft {
            data,
            pinned: BTreeSet::new(),
        }
    }

    /// True when `field` must not be written again.
    pub fn is_fixed(&self, field: &str) -> bool {
        self.pinned.contains(field) || path::is_set(&self.data, field)
    }

    fn pin(&mut self, field: &str, value: Value) {
        if path::set_path(&mut self.data, field, value) {
            self.pinned.insert(field.to_string());
        }
    }

    /// Forget `field` entirely so a later decision may write it.
    pub fn clear(&mut self, field: &str) {
        path::remove_path(&mut self.data, field);
        self.pinned.remove(field);
    }

    pub fn into_data(self) -> Value {
        self.data
    }
}

/// Writes field values that satisfy branch decisions.
pub struct DataSynth<'a> {
    fields: BTreeMap<&'a str, &'a Field>,
    registry: &'a CustomRuleRegistry,
}

impl<'a> DataSynth<'a> {
    pub fn new(schema: &'a UnifiedFormSchema, registry: &'a CustomRuleRegistry) -> Self {
        DataSynth {
            fields: schema.field_index(),
            registry,
        }
    }

    /// Apply the decisions taken when leaving `step`, then fill the step's
    /// remaining fields, except those in `deferred` (fields some later guard
    /// may still need to pin).
    pub fn generate_step_data(
        &self,
        step: &Step,
        decisions: &[(&Rule, bool)],
        draft: &mut Draft,
        deferred: &BTreeSet<String>,
        rng: &mut StdRng,
    ) {
        for (rule, want) in decisions {
            self.constrain(rule, *want, draft, rng);
        }
        self.fill(step, draft, deferred, rng);
    }

    /// Synthesize every unset field of `step` not listed in `skip`.
    pub fn fill(&self, step: &Step, draft: &mut Draft, skip: &BTreeSet<String>, rng: &mut StdRng) {
        for field in &step.fields {
            if skip.contains(&field.name) || draft.is_fixed(&field.name) {
                continue;
            }
            let value = synthesize(Some(field), rng);
            path::set_path(&mut draft.data, &field.name, value);
        }
    }

    /// Write values so that `rule` evaluates to `want`, as far as unset
    /// fields allow. Custom rules are opaque and left alone.
    pub fn constrain(&self, rule: &Rule, want: bool, draft: &mut Draft, rng: &mut StdRng) {
        match rule {
            Rule::Comparison {
                field,
                operator,
                value,
            } => {
                if draft.is_fixed(field) {
                    return;
                }
                if let Some(v) = self.comparison_value(field, *operator, value, want, rng) {
                    draft.pin(field, v);
                }
            }
            Rule::Logical { operator, children } => match (operator, want) {
                (LogicalOp::And, true) | (LogicalOp::Or, false) => {
                    for child in children {
                        self.constrain(child, want, draft, rng);
                    }
                }
                (LogicalOp::And, false) | (LogicalOp::Or, true) => {
                    self.constrain_one(children, want, draft, rng);
                }
                (LogicalOp::Not, _) => {
                    if let Some(child) = children.first() {
                        self.constrain(child, !want, draft, rng);
                    }
                }
            },
            Rule::Custom { .. } => {}
        }
    }

    /// Make one child evaluate to `want`: the first one that can be driven
    /// there, else the first child.
    fn constrain_one(&self, children: &[Rule], want: bool, draft: &mut Draft, rng: &mut StdRng) {
        for child in children {
            let mut trial = draft.clone();
            self.constrain(child, want, &mut trial, rng);
            if evaluate(child, &trial.data, self.registry).ok() == Some(want) {
                *draft = trial;
                return;
            }
        }
        if let Some(first) = children.first() {
            self.constrain(first, want, draft, rng);
        }
    }

    fn comparison_value(
        &self,
        field: &str,
        op: ComparisonOp,
        value: &Value,
        want: bool,
        rng: &mut StdRng,
    ) -> Option<Value> {
        let def = self.fields.get(field).copied();
        match (op, want) {
            (ComparisonOp::Eq, true) | (ComparisonOp::Neq, false) => Some(value.clone()),
            (ComparisonOp::Eq, false) | (ComparisonOp::Neq, true) => {
                Some(synthesize_outside(def, std::slice::from_ref(value), rng))
            }
            (ComparisonOp::Gt | ComparisonOp::Gte | ComparisonOp::Lt | ComparisonOp::Lte, _) => {
                let bound = to_decimal(value)?;
                let step = unit_step(bound);
                // no value lies past the edge of the decimal range
                let chosen = match (op, want) {
                    (ComparisonOp::Gt, true) | (ComparisonOp::Lte, false) => {
                        bound.checked_add(step)?
                    }
                    (ComparisonOp::Lt, true) | (ComparisonOp::Gte, false) => {
                        bound.checked_sub(step)?
                    }
                    _ => bound,
                };
                Some(decimal_to_json(chosen))
            }
            (ComparisonOp::In, _) => {
                let Value::Array(list) = value else {
                    return None;
                };
                if want {
                    list.first().cloned()
                } else {
                    Some(synthesize_outside(def, list, rng))
                }
            }
            (ComparisonOp::Matches, _) => {
                let re = Regex::new(value.as_str()?).ok()?;
                let accepts = |candidate: &Value| {
                    match_text(candidate).is_some_and(|text| re.is_match(&text)) == want
                };
                let synthesized = synthesize(def, rng);
                if accepts(&synthesized) {
                    return Some(synthesized);
                }
                PATTERN_PROBES
                    .iter()
                    .map(|probe| Value::String(probe.to_string()))
                    .find(|candidate| accepts(candidate))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow_eval::RuleBuilder as R;
    use rand::SeedableRng;
    use serde_json::json;

    fn schema() -> UnifiedFormSchema {
        serde_json::from_value(json!({
            "id": "f", "version": "1",
            "steps": [{"id": "a", "fields": [
                {"name": "age", "kind": "number"},
                {"name": "email", "kind": "email", "required": true},
                {"name": "plan", "validation": {"enum": ["basic", "pro"]}}
            ]}]
        }))
        .unwrap()
    }

    fn drive(rule: &Rule, want: bool) -> Value {
        let schema = schema();
        let registry = CustomRuleRegistry::new();
        let synth = DataSynth::new(&schema, &registry);
        let mut draft = Draft::new();
        synth.constrain(rule, want, &mut draft, &mut StdRng::seed_from_u64(1));
        assert_eq!(
            evaluate(rule, &draft.data, &registry).unwrap(),
            want,
            "{} should be {} for {}",
            rule,
            want,
            draft.data
        );
        draft.into_data()
    }

    #[test]
    fn numeric_comparisons_use_boundaries() {
        assert_eq!(drive(&R::greater_than_or_equal("age", 5), true), json!({"age": 5}));
        assert_eq!(drive(&R::greater_than_or_equal("age", 5), false), json!({"age": 4}));
        assert_eq!(drive(&R::greater_than("age", 5), true), json!({"age": 6}));
        assert_eq!(drive(&R::greater_than("age", 5), false), json!({"age": 5}));
        assert_eq!(drive(&R::less_than("age", 5), true), json!({"age": 4}));
        assert_eq!(drive(&R::less_than_or_equal("age", 5), false), json!({"age": 6}));
        assert_eq!(drive(&R::less_than("price", 2.5), false), json!({"price": 2.5}));
        assert_eq!(drive(&R::greater_than("price", 2.5), true), json!({"price": 2.6}));
    }

    #[test]
    fn bounds_at_the_decimal_edge_stay_unpinned() {
        let schema = schema();
        let registry = CustomRuleRegistry::new();
        let synth = DataSynth::new(&schema, &registry);
        let mut rng = StdRng::seed_from_u64(1);

        let mut draft = Draft::new();
        let above_max = R::greater_than("n", "79228162514264337593543950335");
        synth.constrain(&above_max, true, &mut draft, &mut rng);
        assert_eq!(draft.data, json!({}));

        let mut draft = Draft::new();
        let below_min = R::less_than("n", "-79228162514264337593543950335");
        synth.constrain(&below_min, true, &mut draft, &mut rng);
        assert_eq!(draft.data, json!({}));

        // the reachable side of the same bound is still driven
        drive(&above_max, false);
    }

    #[test]
    fn equality_membership_and_patterns() {
        assert_eq!(drive(&R::equals("plan", "pro"), true), json!({"plan": "pro"}));
        drive(&R::equals("plan", "pro"), false);
        assert_eq!(drive(&R::is_in("plan", ["basic"]), true), json!({"plan": "basic"}));
        drive(&R::is_in("plan", ["basic", "pro"]), false);
        drive(&R::matches("zip", r"^\d{4}$"), true);
        drive(&R::matches("zip", r"^\d{4}$"), false);
    }

    #[test]
    fn logical_rules() {
        let rule = R::and([R::greater_than_or_equal("age", 18), R::equals("plan", "pro")]);
        assert_eq!(drive(&rule, true), json!({"age": 18, "plan": "pro"}));
        assert_eq!(drive(&rule, false), json!({"age": 17}));
        drive(&R::or([R::less_than("age", 0), R::equals("plan", "basic")]), false);
        drive(&R::not(R::equals("plan", "pro")), true);
        drive(&R::required("email"), true);
        drive(&R::required("email"), false);
    }

    #[test]
    fn null_pins_survive_filling() {
        let schema = schema();
        let registry = CustomRuleRegistry::new();
        let synth = DataSynth::new(&schema, &registry);
        let mut draft = Draft::new();
        let mut rng = StdRng::seed_from_u64(2);
        let rule = R::optional("age", R::greater_than("age", 100));
        synth.generate_step_data(
            &schema.steps[0],
            &[(&rule, true)],
            &mut draft,
            &BTreeSet::new(),
            &mut rng,
        );
        assert_eq!(draft.data["age"], Value::Null);
        assert!(draft.data["email"].as_str().unwrap().contains('@'));
        assert!(evaluate(&rule, &draft.data, &registry).unwrap());
    }

    #[test]
    fn set_fields_are_not_overwritten() {
        let schema = schema();
        let registry = CustomRuleRegistry::new();
        let synth = DataSynth::new(&schema, &registry);
        let mut draft = Draft::from_data(json!({"age": 3}));
        synth.constrain(
            &R::greater_than_or_equal("age", 18),
            true,
            &mut draft,
            &mut StdRng::seed_from_u64(1),
        );
        assert_eq!(draft.data, json!({"age": 3}));
    }

    #[test]
    fn deferred_fields_stay_unset() {
        let schema = schema();
        let registry = CustomRuleRegistry::new();
        let synth = DataSynth::new(&schema, &registry);
        let mut draft = Draft::new();
        let deferred: BTreeSet<String> = ["age".to_string()].into();
        synth.fill(&schema.steps[0], &mut draft, &deferred, &mut StdRng::seed_from_u64(4));
        assert!(draft.data.get("age").is_none());
        assert!(draft.data.get("plan").is_some());
    }
}
