//! Version manager.
//!
//! Each form id owns an append-only list of versions. Migrations attached
//! to a version are the outgoing edges of a directed graph; the graph may
//! contain cycles. Paths are found by breadth-first search, so the fewest
//! edges win and ties go to the edge registered first.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::error::MigrationError;
use super::version::{DataEnvelope, Migration, SchemaVersion};

/// One edge of a planned migration path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub from: String,
    pub to: String,
    pub description: String,
}

/// The edges a migration would apply, without running any transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan {
    pub form_id: String,
    pub from: String,
    pub to: String,
    pub steps: Vec<PlannedStep>,
}

#[derive(Debug, Clone, Default)]
struct FormHistory {
    versions: Vec<Arc<SchemaVersion>>,
}

impl FormHistory {
    fn get(&self, version: &str) -> Option<&Arc<SchemaVersion>> {
        self.versions.iter().find(|v| v.version == version)
    }

    fn contains(&self, version: &str) -> bool {
        self.get(version).is_some()
    }

    /// BFS from `from` to `to`. Edges out of a version are visited in the
    /// order they were attached.
    fn shortest_path(&self, from: &str, to: &str) -> Option<Vec<&Migration>> {
        let mut parent: BTreeMap<&str, &Migration> = BTreeMap::new();
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        visited.insert(from);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = Vec::new();
                let mut node = to;
                while let Some(edge) = parent.get(node) {
                    path.push(*edge);
                    node = edge.from.as_str();
                }
                path.reverse();
                return Some(path);
            }
            let Some(version) = self.get(current) else {
                continue;
            };
            for edge in &version.migrations {
                if visited.insert(edge.to.as_str()) {
                    parent.insert(edge.to.as_str(), edge);
                    queue.push_back(edge.to.as_str());
                }
            }
        }
        None
    }
}

/// Registry of form versions and the migrations between them.
#[derive(Debug, Clone, Default)]
pub struct VersionManager {
    forms: BTreeMap<String, FormHistory>,
}

impl VersionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `version` to the graph of `form_id`.
    ///
    /// Every attached migration must start at this version and lead
    /// somewhere else; targets may be registered later.
    pub fn register_version(
        &mut self,
        form_id: &str,
        version: SchemaVersion,
    ) -> Result<(), MigrationError> {
        let history = self.forms.entry(form_id.to_string()).or_default();
        if history.contains(&version.version) {
            return Err(MigrationError::DuplicateVersion {
                form_id: form_id.to_string(),
                version: version.version,
            });
        }
        for migration in &version.migrations {
            if migration.from != version.version {
                return Err(MigrationError::InvalidMigration {
                    version: version.version.clone(),
                    message: format!(
                        "migration to '{}' starts at '{}'",
                        migration.to, migration.from
                    ),
                });
            }
            if migration.to == version.version {
                return Err(MigrationError::InvalidMigration {
                    version: version.version.clone(),
                    message: "migration leads back to the same version".to_string(),
                });
            }
        }
        debug!(
            form = form_id,
            version = %version.version,
            migrations = version.migrations.len(),
            deprecated = version.deprecated,
            "registered version"
        );
        history.versions.push(Arc::new(version));
        Ok(())
    }

    pub fn form_ids(&self) -> impl Iterator<Item = &str> {
        self.forms.keys().map(String::as_str)
    }

    /// Version strings of `form_id` in registration order.
    pub fn versions(&self, form_id: &str) -> Vec<&str> {
        self.forms
            .get(form_id)
            .map(|h| h.versions.iter().map(|v| v.version.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn get_version(
        &self,
        form_id: &str,
        version: &str,
    ) -> Result<Arc<SchemaVersion>, MigrationError> {
        self.history(form_id)?
            .get(version)
            .cloned()
            .ok_or_else(|| MigrationError::UnknownVersion {
                form_id: form_id.to_string(),
                version: Some(version.to_string()),
            })
    }

    /// The current version of `form_id`.
    ///
    /// A version is superseded when it has a migration to another
    /// registered version. If exactly one version is not superseded it is
    /// the latest. Otherwise the most recently registered non-deprecated
    /// version wins, preferring versions that are not superseded.
    pub fn get_latest_version(&self, form_id: &str) -> Option<Arc<SchemaVersion>> {
        let history = self.forms.get(form_id)?;
        let heads: Vec<&Arc<SchemaVersion>> = history
            .versions
            .iter()
            .filter(|v| {
                !v.migrations
                    .iter()
                    .any(|m| m.to != v.version && history.contains(&m.to))
            })
            .collect();
        if let [only] = heads.as_slice() {
            return Some(Arc::clone(only));
        }
        heads
            .iter()
            .rev()
            .find(|v| !v.deprecated)
            .copied()
            .or_else(|| history.versions.iter().rev().find(|v| !v.deprecated))
            .or_else(|| history.versions.last())
            .cloned()
    }

    /// Compute the edges `migrate_data` would apply.
    pub fn plan_migration(
        &self,
        form_id: &str,
        from: &str,
        to: &str,
    ) -> Result<MigrationPlan, MigrationError> {
        let steps = if from == to {
            Vec::new()
        } else {
            self.resolve_path(form_id, from, to)?
                .into_iter()
                .map(|m| PlannedStep {
                    from: m.from.clone(),
                    to: m.to.clone(),
                    description: m.description.clone(),
                })
                .collect()
        };
        Ok(MigrationPlan {
            form_id: form_id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            steps,
        })
    }

    /// Migrate `data` from version `from` to version `to`.
    ///
    /// When `from == to` the data is returned unchanged and no lookup or
    /// transform happens. Otherwise every transform on the shortest path
    /// runs in order over a private copy; any failure discards the copy.
    pub fn migrate_data(
        &self,
        form_id: &str,
        data: &Value,
        from: &str,
        to: &str,
    ) -> Result<Value, MigrationError> {
        let envelope = DataEnvelope::new(from, data.clone());
        Ok(self.migrate_envelope(form_id, envelope, to)?.data)
    }

    /// Migrate tagged data to version `to`, checking the tag against each
    /// edge before its transform runs.
    pub fn migrate_envelope(
        &self,
        form_id: &str,
        envelope: DataEnvelope,
        to: &str,
    ) -> Result<DataEnvelope, MigrationError> {
        if envelope.version == to {
            return Ok(envelope);
        }
        let path = self.resolve_path(form_id, &envelope.version, to)?;
        let from = envelope.version.clone();
        let mut current = envelope;
        for edge in &path {
            debug!(form = form_id, from = %edge.from, to = %edge.to, "applying migration");
            current = edge.apply_envelope(current)?;
        }
        info!(form = form_id, from = %from, to = to, edges = path.len(), "migrated data");
        Ok(current)
    }

    fn history(&self, form_id: &str) -> Result<&FormHistory, MigrationError> {
        self.forms
            .get(form_id)
            .ok_or_else(|| MigrationError::UnknownVersion {
                form_id: form_id.to_string(),
                version: None,
            })
    }

    fn resolve_path(
        &self,
        form_id: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<&Migration>, MigrationError> {
        let history = self.history(form_id)?;
        for version in [from, to] {
            if !history.contains(version) {
                return Err(MigrationError::UnknownVersion {
                    form_id: form_id.to_string(),
                    version: Some(version.to_string()),
                });
            }
        }
        history
            .shortest_path(from, to)
            .ok_or_else(|| MigrationError::NoMigrationPath {
                form_id: form_id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            })
    }
}
