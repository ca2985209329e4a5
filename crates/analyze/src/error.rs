use formflow_core::SchemaError;
use thiserror::Error;

/// The generator refuses schemas that break structural invariants.
/// Everything else (unsatisfiable branches, failing custom rules, limits)
/// is reported inside the `GenerationReport`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("cannot generate paths for an invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),
}
