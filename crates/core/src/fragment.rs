//! Schema fragments and their override directives.
//!
//! A fragment is a partial form definition:
//!
//! ```json
//! {
//!   "id": "contact",
//!   "version": "2",
//!   "steps": [ ... ],
//!   "transitions": [ ... ],
//!   "computedFields": [ ... ],
//!   "overrides": {
//!     "steps.contact.fields": { "strategy": "merge-keyed", "key": "name" },
//!     "transitions.contact->done": "remove"
//!   }
//! }
//! ```
//!
//! The `overrides` object is lifted out of the body when the fragment is
//! built and turned into a `DirectiveTree`, so the merge walk never has to
//! recognise reserved keys inside the data it merges.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::CompositionError;
use crate::schema::transition_key;

/// Key under which a fragment declares its directives.
pub const OVERRIDES_KEY: &str = "overrides";

/// How the composer treats one subtree of a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Discard the prior value and take the fragment's value verbatim.
    Replace,
    /// Concatenate the fragment's sequence after the prior one.
    Append,
    /// Merge sequence elements that share the value of `key`.
    MergeKeyed { key: String },
    /// Delete the prior value (a step, a transition, or any object member).
    Remove,
}

impl MergeStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            MergeStrategy::Replace => "replace",
            MergeStrategy::Append => "append",
            MergeStrategy::MergeKeyed { .. } => "merge-keyed",
            MergeStrategy::Remove => "remove",
        }
    }

    /// Parse a directive value: either a bare strategy name or an object
    /// `{ "strategy": ..., "key": ... }`.
    fn parse(path: &str, raw: &Value) -> Result<Self, CompositionError> {
        let (name, key) = match raw {
            Value::String(s) => (s.as_str(), None),
            Value::Object(obj) => {
                let name = obj.get("strategy").and_then(Value::as_str).ok_or_else(|| {
                    CompositionError::InvalidFragment {
                        message: format!("override at '{}' has no strategy", path),
                    }
                })?;
                (name, obj.get("key").and_then(Value::as_str))
            }
            other => {
                return Err(CompositionError::InvalidFragment {
                    message: format!("override at '{}' must be a string or object, got {}", path, other),
                })
            }
        };

        match name {
            "replace" => Ok(MergeStrategy::Replace),
            "append" => Ok(MergeStrategy::Append),
            "remove" => Ok(MergeStrategy::Remove),
            "merge-keyed" => match key {
                Some(k) if !k.is_empty() => Ok(MergeStrategy::MergeKeyed { key: k.to_string() }),
                _ => Err(CompositionError::KeyedMergeKeyMissing {
                    path: path.to_string(),
                    key: String::new(),
                }),
            },
            other => Err(CompositionError::UnknownStrategy {
                path: path.to_string(),
                strategy: other.to_string(),
            }),
        }
    }
}

/// Directives indexed by tree path segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveTree {
    directive: Option<MergeStrategy>,
    children: BTreeMap<String, DirectiveTree>,
}

impl DirectiveTree {
    pub fn insert(&mut self, path: &[&str], strategy: MergeStrategy) {
        match path.split_first() {
            None => self.directive = Some(strategy),
            Some((head, rest)) => self
                .children
                .entry(head.to_string())
                .or_default()
                .insert(rest, strategy),
        }
    }

    pub fn directive(&self) -> Option<&MergeStrategy> {
        self.directive.as_ref()
    }

    pub fn child(&self, segment: &str) -> Option<&DirectiveTree> {
        self.children.get(segment)
    }

    pub fn children(&self) -> impl Iterator<Item = (&String, &DirectiveTree)> {
        self.children.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.directive.is_none() && self.children.is_empty()
    }
}

/// A validated, immutable schema fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaFragment {
    id: String,
    version: String,
    body: Map<String, Value>,
    directives: DirectiveTree,
    fingerprint: String,
}

impl SchemaFragment {
    /// Build a fragment from its JSON document.
    ///
    /// Checks the fragment shape (string `id`/`version`, keyed step and
    /// transition entries, no duplicate step ids) and parses the
    /// `overrides` block into a `DirectiveTree`.
    pub fn from_json(value: Value) -> Result<Self, CompositionError> {
        let fingerprint = fingerprint(&value);
        let mut body = match value {
            Value::Object(map) => map,
            other => {
                return Err(CompositionError::InvalidFragment {
                    message: format!("fragment must be an object, got {}", type_name(&other)),
                })
            }
        };

        let id = required_string(&body, "id")?;
        let version = match body.get("version") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(CompositionError::InvalidFragment {
                    message: format!("fragment '{}' has no version", id),
                })
            }
        };
        // the merged schema carries its version as a string
        body.insert("version".to_string(), Value::String(version.clone()));

        let mut directives = DirectiveTree::default();
        if let Some(raw) = body.remove(OVERRIDES_KEY) {
            let overrides = raw.as_object().ok_or_else(|| CompositionError::InvalidFragment {
                message: format!("fragment '{}': overrides must be an object", id),
            })?;
            for (path, raw_directive) in overrides {
                let strategy = MergeStrategy::parse(path, raw_directive)?;
                let segments: Vec<&str> = path.split('.').collect();
                if segments.iter().any(|s| s.is_empty()) {
                    return Err(CompositionError::InvalidFragment {
                        message: format!("fragment '{}': malformed override path '{}'", id, path),
                    });
                }
                directives.insert(&segments, strategy);
            }
        }

        check_steps(&id, &body)?;
        check_transitions(&id, &body)?;
        if let Some(cf) = body.get("computedFields") {
            if !cf.is_array() {
                return Err(CompositionError::InvalidFragment {
                    message: format!("fragment '{}': computedFields must be an array", id),
                });
            }
        }

        Ok(SchemaFragment {
            id,
            version,
            body,
            directives,
            fingerprint,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The fragment document without its `overrides` block.
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn directives(&self) -> &DirectiveTree {
        &self.directives
    }

    /// Hex SHA-256 of the canonical JSON document.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// `serde_json::Map` keeps keys sorted, so the compact encoding is canonical.
fn fingerprint(value: &Value) -> String {
    let canonical = value.to_string();
    format!("{:x}", Sha256::digest(canonical.as_bytes()))
}

fn required_string(body: &Map<String, Value>, key: &str) -> Result<String, CompositionError> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| CompositionError::InvalidFragment {
            message: format!("fragment is missing string field '{}'", key),
        })
}

fn check_steps(id: &str, body: &Map<String, Value>) -> Result<(), CompositionError> {
    let Some(steps) = body.get("steps") else {
        return Ok(());
    };
    let steps = steps.as_array().ok_or_else(|| CompositionError::InvalidFragment {
        message: format!("fragment '{}': steps must be an array", id),
    })?;
    let mut seen = BTreeSet::new();
    for step in steps {
        let step_id = step_key(step).ok_or_else(|| CompositionError::InvalidFragment {
            message: format!("fragment '{}': every step needs a string id", id),
        })?;
        if !seen.insert(step_id.clone()) {
            return Err(CompositionError::DuplicateStep {
                fragment: id.to_string(),
                step_id,
            });
        }
    }
    Ok(())
}

fn check_transitions(id: &str, body: &Map<String, Value>) -> Result<(), CompositionError> {
    let Some(transitions) = body.get("transitions") else {
        return Ok(());
    };
    let transitions = transitions
        .as_array()
        .ok_or_else(|| CompositionError::InvalidFragment {
            message: format!("fragment '{}': transitions must be an array", id),
        })?;
    for t in transitions {
        if transition_element_key(t).is_none() {
            return Err(CompositionError::InvalidFragment {
                message: format!(
                    "fragment '{}': every transition needs string source and target",
                    id
                ),
            });
        }
    }
    Ok(())
}

pub(crate) fn step_key(step: &Value) -> Option<String> {
    step.get("id").and_then(Value::as_str).map(str::to_owned)
}

pub(crate) fn transition_element_key(t: &Value) -> Option<String> {
    let source = t.get("source").and_then(Value::as_str)?;
    let target = t.get("target").and_then(Value::as_str)?;
    Some(transition_key(source, target))
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "object",
    }
}
