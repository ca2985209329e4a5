//! Deep merge of fragment bodies.
//!
//! Default rules, applied at every tree path:
//! - object + object: merged key by key
//! - sequence + sequence: the later sequence replaces the earlier one
//! - anything else: the later value wins
//!
//! `steps` and `transitions` at the root are keyed collections (by step id
//! and by `source->target`), and anything under a `guard` key is replaced
//! whole. A fragment's `DirectiveTree` overrides these rules per subtree.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CompositionError;
use crate::fragment::{step_key, transition_element_key, type_name, DirectiveTree, MergeStrategy};

/// How elements of a keyed sequence are identified.
#[derive(Debug, Clone, Copy)]
enum KeySpec<'a> {
    Step,
    Transition,
    Field(&'a str),
}

impl KeySpec<'_> {
    fn name(&self) -> &str {
        match self {
            KeySpec::Step => "id",
            KeySpec::Transition => "source->target",
            KeySpec::Field(k) => k,
        }
    }

    fn extract(&self, element: &Value) -> Option<String> {
        match self {
            KeySpec::Step => step_key(element),
            KeySpec::Transition => transition_element_key(element),
            KeySpec::Field(k) => match element.get(*k)? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            },
        }
    }
}

struct MergeCtx<'a> {
    fragment_id: &'a str,
    path: Vec<String>,
}

impl MergeCtx<'_> {
    fn path_string(&self) -> String {
        self.path.join(".")
    }

    fn builtin_key(&self) -> Option<KeySpec<'static>> {
        match self.path.as_slice() {
            [root] if root == "steps" => Some(KeySpec::Step),
            [root] if root == "transitions" => Some(KeySpec::Transition),
            _ => None,
        }
    }

    fn is_atomic(&self) -> bool {
        self.path.last().map(|s| s == "guard").unwrap_or(false)
    }
}

/// Merge one fragment body (with its directives) over the accumulated
/// document. Neither input is observable afterwards in a half-merged state:
/// the caller owns `base` and only keeps the result on success.
pub(crate) fn merge_body(
    base: Map<String, Value>,
    overlay: &Map<String, Value>,
    directives: &DirectiveTree,
    fragment_id: &str,
) -> Result<Map<String, Value>, CompositionError> {
    let mut ctx = MergeCtx {
        fragment_id,
        path: Vec::new(),
    };
    merge_objects(base, overlay.clone(), &mut ctx, Some(directives))
}

fn merge_node(
    base: Option<Value>,
    overlay: Option<Value>,
    ctx: &mut MergeCtx<'_>,
    dir: Option<&DirectiveTree>,
) -> Result<Option<Value>, CompositionError> {
    if let Some(strategy) = dir.and_then(DirectiveTree::directive) {
        debug!(path = %ctx.path_string(), strategy = strategy.name(), "applying override");
        return apply_directive(strategy, base, overlay, ctx, dir);
    }

    let Some(overlay) = overlay else {
        return base.map(|b| prune(b, ctx, dir)).transpose();
    };

    if ctx.is_atomic() {
        return Ok(Some(overlay));
    }

    match (base, overlay) {
        (Some(Value::Object(b)), Value::Object(o)) => {
            merge_objects(b, o, ctx, dir).map(|m| Some(Value::Object(m)))
        }
        (base, Value::Array(o)) => match ctx.builtin_key() {
            Some(spec) => {
                let b = match base {
                    Some(Value::Array(b)) => b,
                    _ => Vec::new(),
                };
                merge_keyed(b, o, spec, ctx, dir).map(|v| Some(Value::Array(v)))
            }
            None => Ok(Some(Value::Array(o))),
        },
        (_, o) => Ok(Some(o)),
    }
}

fn apply_directive(
    strategy: &MergeStrategy,
    base: Option<Value>,
    overlay: Option<Value>,
    ctx: &mut MergeCtx<'_>,
    dir: Option<&DirectiveTree>,
) -> Result<Option<Value>, CompositionError> {
    match strategy {
        MergeStrategy::Remove => Ok(None),
        MergeStrategy::Replace => Ok(overlay.or(base)),
        MergeStrategy::Append => match (base, overlay) {
            (Some(Value::Array(mut b)), Some(Value::Array(o))) => {
                b.extend(o);
                Ok(Some(Value::Array(b)))
            }
            (None, Some(o @ Value::Array(_))) | (Some(o @ Value::Array(_)), None) => Ok(Some(o)),
            (None, None) => Ok(None),
            (b, o) => Err(mismatch(strategy, ctx, o.as_ref().or(b.as_ref()))),
        },
        MergeStrategy::MergeKeyed { key } => match (base, overlay) {
            (base @ (Some(Value::Array(_)) | None), Some(Value::Array(o))) => {
                let b = match base {
                    Some(Value::Array(b)) => b,
                    _ => Vec::new(),
                };
                merge_keyed(b, o, KeySpec::Field(key), ctx, dir).map(|v| Some(Value::Array(v)))
            }
            (Some(b @ Value::Array(_)), None) => Ok(Some(b)),
            (None, None) => Ok(None),
            (b, o) => Err(mismatch(strategy, ctx, o.as_ref().or(b.as_ref()))),
        },
    }
}

fn mismatch(strategy: &MergeStrategy, ctx: &MergeCtx<'_>, found: Option<&Value>) -> CompositionError {
    CompositionError::StrategyMismatch {
        path: ctx.path_string(),
        strategy: strategy.name().to_string(),
        found: found.map(type_name).unwrap_or("nothing").to_string(),
    }
}

fn merge_objects(
    mut base: Map<String, Value>,
    overlay: Map<String, Value>,
    ctx: &mut MergeCtx<'_>,
    dir: Option<&DirectiveTree>,
) -> Result<Map<String, Value>, CompositionError> {
    let mut touched = Vec::with_capacity(overlay.len());
    for (key, value) in overlay {
        ctx.path.push(key.clone());
        let merged = merge_node(base.remove(&key), Some(value), ctx, dir.and_then(|d| d.child(&key)));
        ctx.path.pop();
        if let Some(v) = merged? {
            base.insert(key.clone(), v);
        }
        touched.push(key);
    }

    // Directives on members the overlay does not mention (e.g. removals).
    if let Some(dir) = dir {
        for (key, child) in dir.children() {
            if touched.contains(key) {
                continue;
            }
            if let Some(existing) = base.remove(key) {
                ctx.path.push(key.clone());
                let merged = merge_node(Some(existing), None, ctx, Some(child));
                ctx.path.pop();
                if let Some(v) = merged? {
                    base.insert(key.clone(), v);
                }
            }
        }
    }
    Ok(base)
}

fn merge_keyed(
    base: Vec<Value>,
    overlay: Vec<Value>,
    spec: KeySpec<'_>,
    ctx: &mut MergeCtx<'_>,
    dir: Option<&DirectiveTree>,
) -> Result<Vec<Value>, CompositionError> {
    let mut entries: Vec<(String, Option<Value>)> = Vec::with_capacity(base.len() + overlay.len());
    for element in base {
        let key = spec.extract(&element).ok_or_else(|| missing_key(&spec, ctx))?;
        entries.push((key, Some(element)));
    }

    let mut touched = Vec::new();
    for element in overlay {
        let key = spec.extract(&element).ok_or_else(|| missing_key(&spec, ctx))?;
        if matches!(spec, KeySpec::Step) && touched.contains(&key) {
            return Err(CompositionError::DuplicateStep {
                fragment: ctx.fragment_id.to_string(),
                step_id: key,
            });
        }
        let child_dir = dir.and_then(|d| d.child(&key));
        ctx.path.push(key.clone());
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => {
                let merged = merge_node(slot.take(), Some(element), ctx, child_dir);
                *slot = merged?;
            }
            None => {
                let merged = merge_node(None, Some(element), ctx, child_dir)?;
                entries.push((key.clone(), merged));
            }
        }
        ctx.path.pop();
        touched.push(key);
    }

    if let Some(dir) = dir {
        for (key, child) in dir.children() {
            if touched.contains(key) {
                continue;
            }
            if let Some((_, slot)) = entries.iter_mut().find(|(k, _)| k == key) {
                ctx.path.push(key.clone());
                let merged = merge_node(slot.take(), None, ctx, Some(child));
                ctx.path.pop();
                *slot = merged?;
            }
        }
    }

    Ok(entries.into_iter().filter_map(|(_, v)| v).collect())
}

fn missing_key(spec: &KeySpec<'_>, ctx: &MergeCtx<'_>) -> CompositionError {
    CompositionError::KeyedMergeKeyMissing {
        path: ctx.path_string(),
        key: spec.name().to_string(),
    }
}

/// Apply directives to a value the overlay does not touch. Only removals
/// and directive-bearing descendants have an effect here.
fn prune(
    value: Value,
    ctx: &mut MergeCtx<'_>,
    dir: Option<&DirectiveTree>,
) -> Result<Value, CompositionError> {
    let Some(dir) = dir.filter(|d| !d.is_empty()) else {
        return Ok(value);
    };
    match value {
        Value::Object(map) => merge_objects(map, Map::new(), ctx, Some(dir)).map(Value::Object),
        Value::Array(items) => match ctx.builtin_key() {
            Some(spec) => merge_keyed(items, Vec::new(), spec, ctx, Some(dir)).map(Value::Array),
            None => Ok(Value::Array(items)),
        },
        other => Ok(other),
    }
}
