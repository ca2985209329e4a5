//! Unified form schema model.
//!
//! This is the single navigable definition produced by the composer and
//! consumed read-only by the evaluator, the version manager and the path
//! generator.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::rule::Rule;

fn default_kind() -> String {
    "text".to_string()
}

/// A single input of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    /// Free-form kind hint (`text`, `number`, `email`, `boolean`, ...).
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// JSON Schema the field's value must satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Value>,
    /// UI-agnostic metadata, carried verbatim.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Field {
    /// Look up a keyword of the validation schema.
    pub fn hint(&self, keyword: &str) -> Option<&Value> {
        self.validation.as_ref().and_then(|v| v.get(keyword))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Evaluated when the step is entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<Rule>,
}

impl Step {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.required)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub source: String,
    pub target: String,
    /// Absent guard means the transition always fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<Rule>,
    /// Lower values are tried first; ties keep declaration order.
    #[serde(default)]
    pub priority: i32,
}

impl Transition {
    /// Identity of a transition inside a schema: `source->target`.
    pub fn key(&self) -> String {
        transition_key(&self.source, &self.target)
    }
}

pub fn transition_key(source: &str, target: &str) -> String {
    format!("{}->{}", source, target)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedField {
    pub name: String,
    pub expression: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// The merged form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedFormSchema {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    #[serde(default)]
    pub computed_fields: Vec<ComputedField>,
}

impl UnifiedFormSchema {
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Outgoing transitions of `source` in the order they are tried.
    pub fn transitions_from(&self, source: &str) -> Vec<&Transition> {
        let mut out: Vec<&Transition> = self
            .transitions
            .iter()
            .filter(|t| t.source == source)
            .collect();
        // sort_by_key is stable, so declaration order breaks ties
        out.sort_by_key(|t| t.priority);
        out
    }

    /// Steps with no incoming transition, in declaration order.
    pub fn entry_candidates(&self) -> Vec<&str> {
        let targets: BTreeSet<&str> = self.transitions.iter().map(|t| t.target.as_str()).collect();
        self.steps
            .iter()
            .map(|s| s.id.as_str())
            .filter(|id| !targets.contains(id))
            .collect()
    }

    /// The unique step without an incoming transition.
    pub fn entry_step(&self) -> Result<&Step, SchemaError> {
        let candidates = self.entry_candidates();
        match candidates.as_slice() {
            [only] => self.step(only).ok_or_else(|| SchemaError::EntryStep {
                found: vec![only.to_string()],
            }),
            _ => Err(SchemaError::EntryStep {
                found: candidates.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    /// Steps with no outgoing transition.
    pub fn terminal_steps(&self) -> Vec<&str> {
        let sources: BTreeSet<&str> = self.transitions.iter().map(|t| t.source.as_str()).collect();
        self.steps
            .iter()
            .map(|s| s.id.as_str())
            .filter(|id| !sources.contains(id))
            .collect()
    }

    /// Field definitions across all steps, keyed by field name. The first
    /// step declaring a name wins.
    pub fn field_index(&self) -> BTreeMap<&str, &Field> {
        let mut index = BTreeMap::new();
        for step in &self.steps {
            for field in &step.fields {
                index.entry(field.name.as_str()).or_insert(field);
            }
        }
        index
    }

    /// Check every structural invariant of the schema.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut ids = BTreeSet::new();
        for step in &self.steps {
            if !ids.insert(step.id.as_str()) {
                return Err(SchemaError::DuplicateStep {
                    step_id: step.id.clone(),
                });
            }
            if let Some(guard) = &step.guard {
                guard.validate().map_err(|source| SchemaError::Guard {
                    location: format!("step '{}'", step.id),
                    source,
                })?;
            }
        }

        for t in &self.transitions {
            for endpoint in [&t.source, &t.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(SchemaError::DanglingTransition {
                        source_step: t.source.clone(),
                        target: t.target.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
            if let Some(guard) = &t.guard {
                guard.validate().map_err(|source| SchemaError::Guard {
                    location: format!("transition '{}'", t.key()),
                    source,
                })?;
            }
        }

        for step in &self.steps {
            let outgoing = self.transitions_from(&step.id);
            if let Some(pos) = outgoing.iter().position(|t| t.guard.is_none()) {
                if pos + 1 != outgoing.len() {
                    return Err(SchemaError::UnguardedNotLast {
                        source_step: step.id.clone(),
                        target: outgoing[pos].target.clone(),
                    });
                }
            }
        }

        self.entry_step()?;
        Ok(())
    }
}
