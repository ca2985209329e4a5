//! Path generator and schema linter for formflow schemas.
//!
//! The generator explores a composed schema's step graph and emits
//! reproducible test scenarios: the steps visited, the guards that admitted
//! each step, synthesized form data and the expected outcome. The linter is
//! a read-only pass over the same graph.

pub mod datagen;
pub mod error;
pub mod generator;
pub mod lint;
pub mod negative;
pub mod options;
pub mod prune;
pub mod replay;
pub mod report;
pub mod synth;

pub use datagen::{DataSynth, Draft};
pub use error::GenerationError;
pub use generator::{generate_paths, PathGenerator};
pub use lint::{has_errors, lint_schema, Finding, FindingSeverity};
pub use negative::{generate_boundary_paths, generate_error_paths};
pub use options::{Coverage, GenerationOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PATHS, DEFAULT_SEED};
pub use prune::prune_paths;
pub use replay::Navigator;
pub use report::{GenerationReport, Outcome, SkippedBranch, TestPath};
