//! Generated scenarios and the report that carries them.

use std::collections::BTreeMap;

use formflow_core::Rule;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Expected result of replaying a scenario in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Navigation reaches a terminal step with valid data.
    Success,
    /// A visited step rejects its data.
    ValidationError,
    /// No transition admits the data.
    Blocked,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::ValidationError => "validation_error",
            Outcome::Blocked => "blocked",
        }
    }
}

/// One synthesized scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPath {
    pub id: String,
    /// Visited step ids, entry first.
    pub steps: Vec<String>,
    /// Step id to the rule that admitted entry into it.
    pub guards: BTreeMap<String, Rule>,
    pub data: Value,
    pub outcome: Outcome,
}

impl TestPath {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_step(&self) -> Option<&str> {
        self.steps.last().map(String::as_str)
    }
}

/// A branch abandoned because one of its rules could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedBranch {
    pub step: String,
    /// `source->target`, or `source->(none)` for the blocked branch.
    pub transition: String,
    pub reason: String,
}

/// Output of a generation run.
///
/// `truncated` is set when `max_paths` (or the exploration cap) cut the
/// result; it signals a limit, not a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub paths: Vec<TestPath>,
    pub truncated: bool,
    pub skipped_branches: Vec<SkippedBranch>,
    /// Candidate paths discarded for exceeding `max_depth`.
    pub depth_limited: usize,
    /// Candidate paths discarded because no synthesized data drives them.
    pub unsatisfiable: usize,
}

impl GenerationReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.paths.iter().filter(|p| p.outcome == outcome).count()
    }
}
