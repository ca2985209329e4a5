#![allow(clippy::result_large_err)]
//! formflow-core: form schema model and fragment composer.
//!
//! Fragments are partial form definitions registered in order and merged
//! into one [`UnifiedFormSchema`]. The schema (steps, guarded transitions,
//! computed fields) is the contract consumed by the evaluator, the version
//! manager and the path generator.
//!
//! # Public API
//!
//! - [`Composer`] -- ordered fragment registry (`register`, `compose`,
//!   `load_schema`)
//! - [`SchemaFragment`] / [`MergeStrategy`] -- fragments and their
//!   override directives
//! - [`UnifiedFormSchema`], [`Step`], [`Field`], [`Transition`],
//!   [`ComputedField`] -- the composed model
//! - [`Rule`] -- guard predicate tree
//! - [`CompositionError`], [`SchemaError`], [`InvalidGuardError`]

pub mod compose;
pub mod error;
pub mod fragment;
mod merge;
pub mod rule;
pub mod schema;

// ── Convenience re-exports ───────────────────────────────────────────

pub use compose::{compose_fragments, merge_fragments, Composer, FragmentLoader};
pub use error::{CompositionError, InvalidGuardError, LoaderError, SchemaError};
pub use fragment::{DirectiveTree, MergeStrategy, SchemaFragment};
pub use rule::{ComparisonOp, LogicalOp, Rule};
pub use schema::{transition_key, ComputedField, Field, Step, Transition, UnifiedFormSchema};
