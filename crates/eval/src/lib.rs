//! formflow-eval: guard evaluation, step validation and data migration.
//!
//! The evaluator consumes rules from a composed
//! [`UnifiedFormSchema`](formflow_core::UnifiedFormSchema) and reads answers
//! from plain JSON form data. Comparisons never fail on bad data; they
//! evaluate to `false`.
//!
//! # Public API
//!
//! - [`evaluate`] / [`select_transition`] -- guard evaluation
//! - [`RuleBuilder`] -- rule construction helpers
//! - [`CustomRuleRegistry`] -- named predicates injected by the host
//! - [`validate_step_data`] -- required-field and JSON Schema checks
//! - [`VersionManager`] -- version graph and data migration

pub mod builder;
pub mod error;
pub mod migration;
pub mod numeric;
pub mod path;
pub mod predicate;
pub mod registry;
pub mod validate;

pub use builder::RuleBuilder;
pub use error::RuleError;
pub use migration::{
    DataEnvelope, FieldOp, FieldOps, Migration, MigrationError, MigrationPlan, PlannedStep,
    SchemaVersion, Transform, TransformError, VersionManager,
};
pub use predicate::{admission_rule, admits, evaluate, guard_holds, select_transition};
pub use registry::{CustomPredicate, CustomRuleRegistry};
pub use validate::{validate_step_data, FieldViolation, ViolationKind};
