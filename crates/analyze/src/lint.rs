//! Schema linter.
//!
//! Reads the step/transition graph of a merged schema, valid or not, and
//! reports problems a form author should look at. Findings are ordered by
//! check, then by declaration order within the schema.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use formflow_core::UnifiedFormSchema;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    Info,
    Warning,
    Error,
}

impl FindingSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingSeverity::Info => "info",
            FindingSeverity::Warning => "warning",
            FindingSeverity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    /// Check that produced the finding, e.g. `unreachable-step`.
    pub check: String,
    pub severity: FindingSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
}

impl Finding {
    fn new(check: &str, severity: FindingSeverity, message: String) -> Self {
        Finding {
            check: check.to_string(),
            severity,
            message,
            step: None,
            transition: None,
        }
    }

    fn at_step(mut self, step: &str) -> Self {
        self.step = Some(step.to_string());
        self
    }

    fn at_transition(mut self, key: String) -> Self {
        self.transition = Some(key);
        self
    }
}

/// True when any finding is an error.
pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.severity == FindingSeverity::Error)
}

pub fn lint_schema(schema: &UnifiedFormSchema) -> Vec<Finding> {
    let mut findings = Vec::new();
    duplicate_steps(schema, &mut findings);
    dangling_transitions(schema, &mut findings);
    invalid_guards(schema, &mut findings);
    entry_step(schema, &mut findings);
    unreachable_steps(schema, &mut findings);
    shadowed_transitions(schema, &mut findings);
    findings
}

fn duplicate_steps(schema: &UnifiedFormSchema, findings: &mut Vec<Finding>) {
    let mut seen = BTreeSet::new();
    for step in &schema.steps {
        if !seen.insert(step.id.as_str()) {
            findings.push(
                Finding::new(
                    "duplicate-step",
                    FindingSeverity::Error,
                    format!("step '{}' is declared more than once", step.id),
                )
                .at_step(&step.id),
            );
        }
    }
}

fn dangling_transitions(schema: &UnifiedFormSchema, findings: &mut Vec<Finding>) {
    let ids: BTreeSet<&str> = schema.steps.iter().map(|s| s.id.as_str()).collect();
    for t in &schema.transitions {
        for endpoint in [&t.source, &t.target] {
            if !ids.contains(endpoint.as_str()) {
                findings.push(
                    Finding::new(
                        "dangling-transition",
                        FindingSeverity::Error,
                        format!("transition {} references unknown step '{}'", t.key(), endpoint),
                    )
                    .at_transition(t.key()),
                );
            }
        }
    }
}

fn invalid_guards(schema: &UnifiedFormSchema, findings: &mut Vec<Finding>) {
    for step in &schema.steps {
        if let Some(Err(e)) = step.guard.as_ref().map(|g| g.validate()) {
            findings.push(
                Finding::new("invalid-guard", FindingSeverity::Error, e.to_string()).at_step(&step.id),
            );
        }
    }
    for t in &schema.transitions {
        if let Some(Err(e)) = t.guard.as_ref().map(|g| g.validate()) {
            findings.push(
                Finding::new("invalid-guard", FindingSeverity::Error, e.to_string())
                    .at_transition(t.key()),
            );
        }
    }
}

fn entry_step(schema: &UnifiedFormSchema, findings: &mut Vec<Finding>) {
    if schema.steps.is_empty() {
        findings.push(Finding::new(
            "entry-step",
            FindingSeverity::Error,
            "schema has no steps".to_string(),
        ));
        return;
    }
    let candidates = schema.entry_candidates();
    match candidates.len() {
        1 => {}
        0 => findings.push(Finding::new(
            "entry-step",
            FindingSeverity::Error,
            "every step has an incoming transition, so there is no entry step".to_string(),
        )),
        _ => findings.push(Finding::new(
            "entry-step",
            FindingSeverity::Error,
            format!("several steps could be the entry step: {}", candidates.join(", ")),
        )),
    }
}

/// BFS from every entry candidate; declared steps never reached are dead.
fn unreachable_steps(schema: &UnifiedFormSchema, findings: &mut Vec<Finding>) {
    let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for t in &schema.transitions {
        adjacency.entry(t.source.as_str()).or_default().push(t.target.as_str());
    }

    let candidates = schema.entry_candidates();
    if candidates.is_empty() {
        // already reported; every step would show up as unreachable
        return;
    }
    let mut visited: BTreeSet<&str> = BTreeSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    for entry in candidates {
        if visited.insert(entry) {
            queue.push_back(entry);
        }
    }
    while let Some(step) = queue.pop_front() {
        if let Some(neighbors) = adjacency.get(step) {
            for &next in neighbors {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }

    let mut reported = BTreeSet::new();
    for step in &schema.steps {
        if !visited.contains(step.id.as_str()) && reported.insert(step.id.as_str()) {
            findings.push(
                Finding::new(
                    "unreachable-step",
                    FindingSeverity::Warning,
                    format!("step '{}' cannot be reached from the entry step", step.id),
                )
                .at_step(&step.id),
            );
        }
    }
}

/// Transitions tried after an unguarded one never fire.
fn shadowed_transitions(schema: &UnifiedFormSchema, findings: &mut Vec<Finding>) {
    let mut sources: Vec<&str> = Vec::new();
    for t in &schema.transitions {
        if !sources.contains(&t.source.as_str()) {
            sources.push(&t.source);
        }
    }
    for source in sources {
        let outgoing = schema.transitions_from(source);
        let Some(open) = outgoing.iter().position(|t| t.guard.is_none()) else {
            continue;
        };
        for t in &outgoing[open + 1..] {
            findings.push(
                Finding::new(
                    "shadowed-transition",
                    FindingSeverity::Warning,
                    format!(
                        "transition {} never fires: {} is unguarded and tried first",
                        t.key(),
                        outgoing[open].key()
                    ),
                )
                .at_step(source)
                .at_transition(t.key()),
            );
        }
    }
}
