//! Composition scenarios across several fragments, driven through the
//! public `Composer` API.

use formflow_core::{
    compose_fragments, CompositionError, Composer, LoaderError, Rule, SchemaError, SchemaFragment,
};
use serde_json::{json, Value};

fn contact() -> Value {
    json!({
        "id": "contact",
        "version": "1",
        "steps": [
            {"id": "details", "fields": [
                {"name": "name", "kind": "name", "required": true},
                {"name": "email", "kind": "email", "label": "Email"}
            ]},
            {"id": "review"}
        ],
        "transitions": [{"source": "details", "target": "review"}]
    })
}

fn marketing() -> Value {
    json!({
        "id": "marketing",
        "version": "2",
        "steps": [
            {"id": "details", "fields": [
                {"name": "email", "required": true},
                {"name": "newsletter", "kind": "boolean"}
            ]},
            {"id": "consent"}
        ],
        "transitions": [
            {"source": "details", "target": "consent", "priority": -1,
             "guard": {"kind": "comparison", "field": "newsletter", "operator": "eq", "value": true}},
            {"source": "consent", "target": "review"}
        ],
        "overrides": {
            "steps.details.fields": {"strategy": "merge-keyed", "key": "name"}
        }
    })
}

fn fragment(value: Value) -> SchemaFragment {
    SchemaFragment::from_json(value).unwrap()
}

#[test]
fn fragments_compose_into_one_navigable_schema() {
    let mut composer = Composer::new();
    composer.register_json(contact()).unwrap();
    composer.register_json(marketing()).unwrap();
    let schema = composer.compose().unwrap();

    assert_eq!(schema.id, "marketing");
    assert_eq!(schema.version, "2");
    let ids: Vec<&str> = schema.steps.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["details", "review", "consent"]);

    let details = schema.step("details").unwrap();
    let email = details.field("email").unwrap();
    assert!(email.required);
    assert_eq!(email.label.as_deref(), Some("Email"));
    assert_eq!(details.fields.len(), 3);

    let out: Vec<String> = schema
        .transitions_from("details")
        .into_iter()
        .map(|t| t.key())
        .collect();
    assert_eq!(out, vec!["details->consent", "details->review"]);
    assert_eq!(schema.entry_step().unwrap().id, "details");
    assert_eq!(schema.terminal_steps(), vec!["review"]);
}

#[test]
fn reregistering_a_fragment_changes_nothing() {
    let mut once = Composer::new();
    once.register_json(contact()).unwrap();
    once.register_json(marketing()).unwrap();

    let mut twice = Composer::new();
    assert!(twice.register_json(contact()).unwrap());
    assert!(twice.register_json(marketing()).unwrap());
    assert!(!twice.register_json(contact()).unwrap());

    assert_eq!(twice.len(), 2);
    assert_eq!(once.compose().unwrap(), twice.compose().unwrap());
}

#[test]
fn composed_schema_round_trips_as_a_fragment() {
    let schema = compose_fragments(&[fragment(contact()), fragment(marketing())]).unwrap();
    let again = compose_fragments(&[fragment(serde_json::to_value(&schema).unwrap())]).unwrap();
    assert_eq!(schema, again);
}

#[test]
fn guards_survive_composition_as_rules() {
    let schema = compose_fragments(&[fragment(contact()), fragment(marketing())]).unwrap();
    let guard = schema.transitions_from("details")[0].guard.clone().unwrap();
    assert!(matches!(guard, Rule::Comparison { ref field, .. } if field == "newsletter"));
}

#[test]
fn failures_leave_no_partial_schema() {
    let mut composer = Composer::new();
    composer.register_json(contact()).unwrap();
    let err = composer
        .register_json(json!({
            "id": "bad", "version": "1",
            "overrides": {"steps": "shuffle"}
        }))
        .unwrap_err();
    assert!(matches!(err, CompositionError::UnknownStrategy { ref strategy, .. } if strategy == "shuffle"));
    assert_eq!(composer.len(), 1);

    composer
        .register_json(json!({
            "id": "orphan", "version": "1",
            "steps": [{"id": "orphan"}]
        }))
        .unwrap();
    assert!(matches!(
        composer.compose(),
        Err(CompositionError::InvalidSchema(SchemaError::EntryStep { .. }))
    ));
    assert_eq!(composer.merge().unwrap().steps.len(), 3);
}

#[tokio::test]
async fn loader_fragments_extend_the_registry() {
    let loader = |id: String| async move {
        match id.as_str() {
            "marketing" => Ok(marketing()),
            other => Err(LoaderError::from(format!("no fragment named '{}'", other))),
        }
    };

    let mut composer = Composer::new();
    composer.register_json(contact()).unwrap();
    let schema = composer.load_schema("marketing", &loader).await.unwrap();
    assert!(schema.step("consent").is_some());
    assert_eq!(composer.len(), 2);

    let err = composer.load_schema("billing", &loader).await.unwrap_err();
    match err {
        CompositionError::Loader { id, source } => {
            assert_eq!(id, "billing");
            assert!(source.to_string().contains("billing"));
        }
        other => panic!("expected Loader error, got {:?}", other),
    }
    assert_eq!(composer.len(), 2);
}
