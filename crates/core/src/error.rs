/// Boxed error returned by fragment loaders.
pub type LoaderError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A guard rule whose shape violates the rule invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid guard: {message}")]
pub struct InvalidGuardError {
    pub message: String,
}

impl InvalidGuardError {
    pub fn new(message: impl Into<String>) -> Self {
        InvalidGuardError {
            message: message.into(),
        }
    }
}

/// A structural invariant of a unified schema does not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate step id '{step_id}'")]
    DuplicateStep { step_id: String },

    #[error("transition {source_step} -> {target} references unknown step '{missing}'")]
    DanglingTransition {
        source_step: String,
        target: String,
        missing: String,
    },

    /// Zero or several steps lack an incoming transition.
    #[error("expected exactly one entry step, found {found:?}")]
    EntryStep { found: Vec<String> },

    /// An unguarded transition is not the last one tried for its source,
    /// or a source has more than one.
    #[error("step '{source_step}' has an unguarded transition to '{target}' that is not its last")]
    UnguardedNotLast { source_step: String, target: String },

    #[error("guard on {location}: {source}")]
    Guard {
        location: String,
        #[source]
        source: InvalidGuardError,
    },
}

/// All errors raised while building or composing schemas.
///
/// Composition is all-or-nothing: when any of these is returned, no
/// partially merged schema is observable and no fragment was registered.
#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    /// An override directive names a strategy the composer does not know.
    #[error("unknown override strategy '{strategy}' at '{path}'")]
    UnknownStrategy { path: String, strategy: String },

    /// A `merge-keyed` directive was declared without a key, or an element
    /// of the targeted sequence lacks the declared key.
    #[error("keyed merge at '{path}' requires key '{key}' on every element")]
    KeyedMergeKeyMissing { path: String, key: String },

    /// A directive strategy was applied to a value of the wrong shape.
    #[error("strategy '{strategy}' at '{path}' cannot apply to {found}")]
    StrategyMismatch {
        path: String,
        strategy: String,
        found: String,
    },

    #[error("duplicate step id '{step_id}' in fragment '{fragment}'")]
    DuplicateStep { fragment: String, step_id: String },

    /// The fragment document itself is malformed.
    #[error("invalid fragment: {message}")]
    InvalidFragment { message: String },

    /// The merged result violates a schema invariant.
    #[error("composed schema is invalid: {0}")]
    InvalidSchema(#[from] SchemaError),

    #[error("no fragments registered")]
    Empty,

    /// The injected loader failed; its error is carried unchanged.
    #[error("loading fragment '{id}' failed: {source}")]
    Loader {
        id: String,
        #[source]
        source: LoaderError,
    },
}
