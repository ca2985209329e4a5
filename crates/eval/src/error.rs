use formflow_core::InvalidGuardError;
use thiserror::Error;

/// Rule evaluation failures.
///
/// Type and coercion problems inside comparisons are not errors: they make
/// the comparison `false`. Only an unresolved custom predicate or a
/// malformed rule shape stops evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("unknown custom rule '{name}'")]
    UnknownCustomRule { name: String },

    #[error(transparent)]
    InvalidGuard(#[from] InvalidGuardError),
}
