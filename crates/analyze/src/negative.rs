//! Deliberately failing scenarios.
//!
//! Boundary paths drop a required field from a step an explored path
//! reaches and stop there with `validation_error`. Error paths drive every
//! guard out of a step false and stop there with `blocked`. Both start from
//! data of an explored path, so the prefix up to the failing step is known
//! to be navigable; each candidate is replayed before it is kept.

use std::collections::{BTreeMap, BTreeSet};

use formflow_core::{Rule, UnifiedFormSchema};
use formflow_eval::{admission_rule, path, CustomRuleRegistry};
use rand::rngs::StdRng;
use tracing::debug;

use crate::datagen::{DataSynth, Draft};
use crate::replay::Navigator;
use crate::report::{Outcome, TestPath};

/// One `validation_error` path per step with required fields, reaching the
/// step through the first explored path that passes it.
pub fn generate_boundary_paths(
    schema: &UnifiedFormSchema,
    explored: &[TestPath],
    registry: &CustomRuleRegistry,
) -> Vec<TestPath> {
    let navigator = Navigator::new(schema, registry);
    let mut out = Vec::new();

    for step in &schema.steps {
        let covered = explored.iter().any(|p| {
            p.outcome == Outcome::ValidationError && p.last_step() == Some(step.id.as_str())
        });
        if covered {
            continue;
        }
        let Some((base, index)) = first_visit(explored, &step.id) else {
            continue;
        };
        let prefix = base.steps[..=index].to_vec();

        for field in step.required_fields() {
            let mut data = base.data.clone();
            path::remove_path(&mut data, &field.name);
            if navigator.follows(&prefix, &data).ok() != Some(true) {
                continue;
            }
            if navigator.first_invalid_step(&prefix, &data) != Some(index) {
                continue;
            }
            debug!(step = %step.id, field = %field.name, "boundary path");
            out.push(TestPath {
                id: String::new(),
                guards: guards_for(&base.guards, &prefix),
                steps: prefix,
                data,
                outcome: Outcome::ValidationError,
            });
            break;
        }
    }
    out
}

/// One `blocked` path per step whose transitions are all guarded and that
/// no explored path already blocks at.
pub fn generate_error_paths(
    schema: &UnifiedFormSchema,
    explored: &[TestPath],
    registry: &CustomRuleRegistry,
    rng: &mut StdRng,
) -> Vec<TestPath> {
    let navigator = Navigator::new(schema, registry);
    let synth = DataSynth::new(schema, registry);
    let mut out = Vec::new();

    for step in &schema.steps {
        let outgoing = schema.transitions_from(&step.id);
        if outgoing.is_empty() {
            continue;
        }
        let rules: Option<Vec<Rule>> = outgoing
            .iter()
            .map(|t| admission_rule(schema, t))
            .collect();
        let Some(rules) = rules else {
            // an unguarded transition always fires
            continue;
        };
        let covered = explored
            .iter()
            .any(|p| p.outcome == Outcome::Blocked && p.last_step() == Some(step.id.as_str()));
        if covered {
            continue;
        }
        let Some((base, index)) = first_visit(explored, &step.id) else {
            continue;
        };
        let prefix = base.steps[..=index].to_vec();

        let mut draft = Draft::from_data(base.data.clone());
        for rule in &rules {
            for field in rule.referenced_fields() {
                draft.clear(field);
            }
        }
        for rule in &rules {
            synth.constrain(rule, false, &mut draft, rng);
        }
        let data = draft.into_data();

        if navigator.confirms(&prefix, &data, Outcome::Blocked).ok() != Some(true) {
            debug!(step = %step.id, "guards cannot all be driven false from this prefix");
            continue;
        }
        debug!(step = %step.id, "error path");
        out.push(TestPath {
            id: String::new(),
            guards: guards_for(&base.guards, &prefix),
            steps: prefix,
            data,
            outcome: Outcome::Blocked,
        });
    }
    out
}

/// The first explored path that visits `step` and the index of the visit.
fn first_visit<'p>(explored: &'p [TestPath], step: &str) -> Option<(&'p TestPath, usize)> {
    explored.iter().find_map(|p| {
        p.steps
            .iter()
            .position(|s| s == step)
            .map(|index| (p, index))
    })
}

fn guards_for(guards: &BTreeMap<String, Rule>, steps: &[String]) -> BTreeMap<String, Rule> {
    let visited: BTreeSet<&String> = steps.iter().collect();
    guards
        .iter()
        .filter(|(id, _)| visited.contains(id))
        .map(|(id, rule)| (id.clone(), rule.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use serde_json::json;

    fn schema() -> UnifiedFormSchema {
        serde_json::from_value(json!({
            "id": "f", "version": "1",
            "steps": [
                {"id": "a", "fields": [{"name": "age", "kind": "number", "required": true}]},
                {"id": "b", "fields": [{"name": "email", "kind": "email", "required": true}]}
            ],
            "transitions": [
                {"source": "a", "target": "b",
                 "guard": {"kind": "comparison", "field": "age", "operator": "gte", "value": 18}}
            ]
        }))
        .unwrap()
    }

    fn explored() -> Vec<TestPath> {
        vec![TestPath {
            id: String::new(),
            steps: vec!["a".into(), "b".into()],
            guards: [(
                "b".to_string(),
                formflow_eval::RuleBuilder::greater_than_or_equal("age", 18),
            )]
            .into(),
            data: json!({"age": 18, "email": "x@example.com"}),
            outcome: Outcome::Success,
        }]
    }

    #[test]
    fn boundary_paths_drop_required_fields() {
        let schema = schema();
        let paths = generate_boundary_paths(&schema, &explored(), &CustomRuleRegistry::new());
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].steps, vec!["a"]);
        assert_eq!(paths[0].data, json!({"email": "x@example.com"}));
        assert!(paths[0].guards.is_empty());
        assert_eq!(paths[1].steps, vec!["a", "b"]);
        assert_eq!(paths[1].data, json!({"age": 18}));
        assert!(paths.iter().all(|p| p.outcome == Outcome::ValidationError));
    }

    #[test]
    fn error_paths_block_at_guarded_steps() {
        let schema = schema();
        let mut rng = StdRng::seed_from_u64(1);
        let paths = generate_error_paths(&schema, &explored(), &CustomRuleRegistry::new(), &mut rng);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].steps, vec!["a"]);
        assert_eq!(paths[0].data["age"], json!(17));
        assert_eq!(paths[0].outcome, Outcome::Blocked);
    }

    #[test]
    fn unguarded_exits_never_block() {
        let mut schema = schema();
        schema.transitions[0].guard = None;
        let mut rng = StdRng::seed_from_u64(1);
        let paths = generate_error_paths(&schema, &explored(), &CustomRuleRegistry::new(), &mut rng);
        assert!(paths.is_empty());
    }
}
