//! Version records, migration edges and tagged data envelopes.

use std::fmt;
use std::sync::Arc;

use formflow_core::UnifiedFormSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;

use super::error::{MigrationError, TransformError};
use super::ops::FieldOps;

/// A pure data-to-data function attached to a migration edge.
pub trait Transform: Send + Sync {
    fn apply(&self, data: Value) -> Result<Value, TransformError>;
}

impl<F> Transform for F
where
    F: Fn(Value) -> Result<Value, TransformError> + Send + Sync,
{
    fn apply(&self, data: Value) -> Result<Value, TransformError> {
        (self)(data)
    }
}

/// Form data tagged with the schema version it conforms to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEnvelope {
    pub version: String,
    pub data: Value,
}

impl DataEnvelope {
    pub fn new(version: impl Into<String>, data: Value) -> Self {
        DataEnvelope {
            version: version.into(),
            data,
        }
    }
}

/// Directed edge `from -> to` in a form's version graph.
#[derive(Clone)]
pub struct Migration {
    pub from: String,
    pub to: String,
    pub description: String,
    transform: Arc<dyn Transform>,
}

impl Migration {
    pub fn new<T>(
        from: impl Into<String>,
        to: impl Into<String>,
        description: impl Into<String>,
        transform: T,
    ) -> Self
    where
        T: Transform + 'static,
    {
        Migration {
            from: from.into(),
            to: to.into(),
            description: description.into(),
            transform: Arc::new(transform),
        }
    }

    /// A migration described by declarative field operations.
    pub fn from_ops(
        from: impl Into<String>,
        to: impl Into<String>,
        description: impl Into<String>,
        ops: FieldOps,
    ) -> Self {
        Self::new(from, to, description, ops)
    }

    /// Apply the transform to an envelope tagged with this edge's `from`
    /// version, returning it tagged with `to`.
    ///
    /// The tag is checked before the transform runs. A transform that turns
    /// an object into anything else is rejected.
    pub fn apply_envelope(&self, envelope: DataEnvelope) -> Result<DataEnvelope, MigrationError> {
        if envelope.version != self.from {
            return Err(MigrationError::VersionMismatch {
                expected: self.from.clone(),
                found: envelope.version,
            });
        }
        let was_object = envelope.data.is_object();
        let data = self
            .transform
            .apply(envelope.data)
            .map_err(|source| self.transform_error(source))?;
        if was_object && !data.is_object() {
            return Err(self.transform_error(TransformError::new(format!(
                "transform produced {} instead of an object",
                json_type(&data)
            ))));
        }
        Ok(DataEnvelope {
            version: self.to.clone(),
            data,
        })
    }

    fn transform_error(&self, source: TransformError) -> MigrationError {
        MigrationError::Transform {
            from: self.from.clone(),
            to: self.to.clone(),
            source,
        }
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A registered version of a form: its schema snapshot, deprecation
/// metadata and outgoing migrations.
///
/// `migrate_to` is informational. Which version supersedes which is decided
/// by the migration edges alone.
#[derive(Debug, Clone)]
pub struct SchemaVersion {
    pub version: String,
    pub schema: Arc<UnifiedFormSchema>,
    pub deprecated: bool,
    pub deprecated_on: Option<Date>,
    pub migrate_to: Option<String>,
    pub migrations: Vec<Migration>,
}

impl SchemaVersion {
    pub fn new(version: impl Into<String>, schema: UnifiedFormSchema) -> Self {
        SchemaVersion {
            version: version.into(),
            schema: Arc::new(schema),
            deprecated: false,
            deprecated_on: None,
            migrate_to: None,
            migrations: Vec::new(),
        }
    }

    /// Mark the version deprecated, optionally recording when.
    pub fn deprecate(mut self, on: Option<Date>) -> Self {
        self.deprecated = true;
        self.deprecated_on = on;
        self
    }

    pub fn migrate_to(mut self, version: impl Into<String>) -> Self {
        self.migrate_to = Some(version.into());
        self
    }

    /// Add an outgoing edge from this version to `to`.
    pub fn with_migration<T>(
        mut self,
        to: impl Into<String>,
        description: impl Into<String>,
        transform: T,
    ) -> Self
    where
        T: Transform + 'static,
    {
        let migration = Migration::new(self.version.clone(), to, description, transform);
        self.migrations.push(migration);
        self
    }

    /// Add a prebuilt edge. Its `from` must equal this version; that is
    /// checked at registration.
    pub fn push_migration(mut self, migration: Migration) -> Self {
        self.migrations.push(migration);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn add_marker(mut data: Value) -> Result<Value, TransformError> {
        data["migrated"] = json!(true);
        Ok(data)
    }

    #[test]
    fn envelope_tag_must_match_edge() {
        let m = Migration::new("1", "2", "mark", add_marker);
        let err = m
            .apply_envelope(DataEnvelope::new("3", json!({})))
            .unwrap_err();
        assert_eq!(
            err,
            MigrationError::VersionMismatch {
                expected: "1".to_string(),
                found: "3".to_string()
            }
        );
    }

    #[test]
    fn envelope_is_retagged() {
        let m = Migration::new("1", "2", "mark", add_marker);
        let out = m.apply_envelope(DataEnvelope::new("1", json!({"a": 1}))).unwrap();
        assert_eq!(out, DataEnvelope::new("2", json!({"a": 1, "migrated": true})));
    }

    #[test]
    fn object_to_scalar_is_a_transform_error() {
        let m = Migration::new("1", "2", "flatten", |_data: Value| -> Result<Value, TransformError> {
            Ok(json!(42))
        });
        let err = m.apply_envelope(DataEnvelope::new("1", json!({}))).unwrap_err();
        match err {
            MigrationError::Transform { from, to, source } => {
                assert_eq!((from.as_str(), to.as_str()), ("1", "2"));
                assert!(source.0.contains("a number"));
            }
            other => panic!("expected transform error, got {:?}", other),
        }
    }

    #[test]
    fn debug_omits_transform() {
        let m = Migration::new("1", "2", "mark", add_marker);
        let text = format!("{:?}", m);
        assert!(text.contains("from: \"1\""));
        assert!(text.ends_with(".. }"));
    }
}
