//! Version manager and data migration.
//!
//! Versions of a form are registered once; migrations attached to them
//! form a directed graph that `VersionManager` searches and replays over
//! stored form data.

pub mod error;
pub mod manager;
pub mod ops;
pub mod version;

pub use error::{MigrationError, TransformError};
pub use manager::{MigrationPlan, PlannedStep, VersionManager};
pub use ops::{FieldOp, FieldOps};
pub use version::{DataEnvelope, Migration, SchemaVersion, Transform};
