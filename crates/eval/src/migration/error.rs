use thiserror::Error;

/// Failure raised by a single transform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransformError(pub String);

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        TransformError(message.into())
    }
}

/// Errors that can occur while registering versions or migrating data.
///
/// Migration is all-or-nothing: none of these ever accompanies partially
/// transformed data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    /// The form id is not registered, or the version is not registered
    /// for it (`version` is `None` when the form itself is unknown).
    #[error("{}", unknown_version_message(.form_id, .version.as_deref()))]
    UnknownVersion {
        form_id: String,
        version: Option<String>,
    },

    #[error("no migration path for form '{form_id}' from '{from}' to '{to}'")]
    NoMigrationPath {
        form_id: String,
        from: String,
        to: String,
    },

    #[error("migration {from} -> {to} failed: {source}")]
    Transform {
        from: String,
        to: String,
        #[source]
        source: TransformError,
    },

    /// Data tagged with one version was handed to a migration expecting
    /// another.
    #[error("data is tagged '{found}' but migration expects '{expected}'")]
    VersionMismatch { expected: String, found: String },

    #[error("version '{version}' is already registered for form '{form_id}'")]
    DuplicateVersion { form_id: String, version: String },

    #[error("invalid migration on version '{version}': {message}")]
    InvalidMigration { version: String, message: String },
}

fn unknown_version_message(form_id: &str, version: Option<&str>) -> String {
    match version {
        Some(v) => format!("unknown version '{}' for form '{}'", v, form_id),
        None => format!("unknown form '{}'", form_id),
    }
}
