//! End-to-end guard evaluation over a composed schema.
//!
//! Composes a small onboarding form from two fragments, then drives it
//! step by step with `select_transition` the way a renderer would, and
//! checks step data with `validate_step_data`.

use formflow_core::{Composer, UnifiedFormSchema};
use formflow_eval::{
    evaluate, select_transition, validate_step_data, CustomRuleRegistry, RuleBuilder as R,
    RuleError, ViolationKind,
};
use serde_json::{json, Value};

// ──────────────────────────────────────────────
// Fixtures
// ──────────────────────────────────────────────

fn onboarding() -> UnifiedFormSchema {
    let mut composer = Composer::new();
    composer
        .register_json(json!({
            "id": "onboarding",
            "version": "1",
            "steps": [
                {"id": "personal", "fields": [
                    {"name": "age", "kind": "number", "required": true,
                     "validation": {"type": "integer", "minimum": 0}},
                    {"name": "country", "kind": "text", "required": true}
                ]},
                {"id": "adult", "fields": [{"name": "email", "kind": "email", "required": true}]},
                {"id": "guardian", "fields": [{"name": "guardianName", "required": true}]},
                {"id": "done"}
            ],
            "transitions": [
                {"source": "personal", "target": "adult",
                 "guard": {"kind": "comparison", "field": "age", "operator": "gte", "value": 18}},
                {"source": "personal", "target": "guardian"},
                {"source": "adult", "target": "done"},
                {"source": "guardian", "target": "done"}
            ]
        }))
        .unwrap();
    composer
        .register_json(json!({
            "id": "onboarding",
            "version": "2",
            "overrides": {"transitions.personal->adult": "replace"},
            "transitions": [
                {"source": "personal", "target": "adult",
                 "guard": {"kind": "logical", "operator": "and", "children": [
                     {"kind": "comparison", "field": "age", "operator": "gte", "value": 18},
                     {"kind": "custom", "functionName": "isResident", "args": ["NO"]}
                 ]}}
            ]
        }))
        .unwrap();
    composer.compose().unwrap()
}

fn registry() -> CustomRuleRegistry {
    CustomRuleRegistry::new().with("isResident", |args, data| {
        args.first() == data.get("country")
    })
}

fn walk(schema: &UnifiedFormSchema, data: &Value) -> Vec<String> {
    let registry = registry();
    let mut current = schema.entry_step().unwrap().id.clone();
    let mut visited = vec![current.clone()];
    while let Some(t) = select_transition(schema, &current, data, &registry).unwrap() {
        current = t.target.clone();
        visited.push(current.clone());
    }
    visited
}

// ──────────────────────────────────────────────
// Navigation
// ──────────────────────────────────────────────

#[test]
fn resident_adult_takes_the_adult_branch() {
    let schema = onboarding();
    assert_eq!(
        walk(&schema, &json!({"age": 30, "country": "NO"})),
        vec!["personal", "adult", "done"]
    );
}

#[test]
fn non_resident_adult_falls_through_to_guardian() {
    let schema = onboarding();
    assert_eq!(
        walk(&schema, &json!({"age": 30, "country": "SE"})),
        vec!["personal", "guardian", "done"]
    );
}

#[test]
fn malformed_age_does_not_abort_navigation() {
    let schema = onboarding();
    assert_eq!(
        walk(&schema, &json!({"age": "thirty", "country": "NO"})),
        vec!["personal", "guardian", "done"]
    );
}

#[test]
fn missing_custom_predicate_surfaces_as_error() {
    let schema = onboarding();
    let err = select_transition(
        &schema,
        "personal",
        &json!({"age": 30, "country": "NO"}),
        &CustomRuleRegistry::new(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        RuleError::UnknownCustomRule {
            name: "isResident".to_string()
        }
    );
}

#[test]
fn custom_rule_is_not_reached_when_age_fails() {
    let schema = onboarding();
    let target = select_transition(
        &schema,
        "personal",
        &json!({"age": 12, "country": "NO"}),
        &CustomRuleRegistry::new(),
    )
    .unwrap()
    .map(|t| t.target.clone());
    assert_eq!(target.as_deref(), Some("guardian"));
}

// ──────────────────────────────────────────────
// Builders and validation
// ──────────────────────────────────────────────

#[test]
fn builder_rules_round_trip_through_schema_json() {
    let rule = R::and([R::required("email"), R::matches("email", "@")]);
    let encoded = serde_json::to_value(&rule).unwrap();
    let decoded: formflow_core::Rule = serde_json::from_value(encoded).unwrap();
    assert!(evaluate(&decoded, &json!({"email": "a@b.no"}), &registry()).unwrap());
    assert!(!evaluate(&decoded, &json!({"email": ""}), &registry()).unwrap());
}

#[test]
fn step_validation_reports_missing_and_invalid() {
    let schema = onboarding();
    let personal = schema.step("personal").unwrap();
    let violations = validate_step_data(personal, &json!({"age": -4}));
    let summary: Vec<(&str, ViolationKind)> = violations
        .iter()
        .map(|v| (v.field.as_str(), v.kind))
        .collect();
    assert_eq!(
        summary,
        vec![("age", ViolationKind::Invalid), ("country", ViolationKind::Missing)]
    );
}
