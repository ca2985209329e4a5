//! Path generation options.

use serde::{Deserialize, Serialize};

/// Seed used when none is given, so unseeded runs are reproducible.
pub const DEFAULT_SEED: u64 = 24_301;
pub const DEFAULT_MAX_PATHS: usize = 100;
pub const DEFAULT_MAX_DEPTH: usize = 25;

/// How much of the guarded transition graph to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coverage {
    /// Shortest path to each terminal step.
    Minimal,
    /// Every transition at least once, other branches sampled.
    #[default]
    Representative,
    /// Both outcomes of every guard.
    Exhaustive,
}

impl Coverage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Coverage::Minimal => "minimal",
            Coverage::Representative => "representative",
            Coverage::Exhaustive => "exhaustive",
        }
    }
}

impl std::str::FromStr for Coverage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minimal" => Ok(Coverage::Minimal),
            "representative" => Ok(Coverage::Representative),
            "exhaustive" => Ok(Coverage::Exhaustive),
            other => Err(format!(
                "unknown coverage '{}' (expected minimal, representative or exhaustive)",
                other
            )),
        }
    }
}

/// Options for `generate_paths`. Every field is optional in serialized
/// form and falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub max_paths: usize,
    /// Longest path, in steps. Bounds exploration of cyclic graphs.
    pub max_depth: usize,
    pub coverage: Coverage,
    pub include_invalid: bool,
    pub seed: u64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        GenerationOptions {
            max_paths: DEFAULT_MAX_PATHS,
            max_depth: DEFAULT_MAX_DEPTH,
            coverage: Coverage::default(),
            include_invalid: false,
            seed: DEFAULT_SEED,
        }
    }
}

impl GenerationOptions {
    pub fn with_coverage(mut self, coverage: Coverage) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_invalid(mut self, include_invalid: bool) -> Self {
        self.include_invalid = include_invalid;
        self
    }
}
