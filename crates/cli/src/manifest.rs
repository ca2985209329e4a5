//! Version manifests for `formflow migrate`.
//!
//! ```json
//! {
//!   "forms": [{
//!     "id": "signup",
//!     "versions": [
//!       {
//!         "version": "1",
//!         "fragments": ["v1/base.json"],
//!         "deprecated": true,
//!         "deprecatedOn": "2024-03-01",
//!         "migrateTo": "2",
//!         "migrations": [
//!           {"to": "2", "description": "split name",
//!            "ops": [{"op": "rename", "from": "name", "to": "firstName"}]}
//!         ]
//!       },
//!       {"version": "2", "fragments": ["v2/base.json", "v2/consent.json"]}
//!     ]
//!   }]
//! }
//! ```
//!
//! Fragment paths are relative to the manifest file. Each version's
//! fragments are composed into that version's schema snapshot.

use std::fs;
use std::path::Path;

use formflow_core::Composer;
use formflow_eval::{FieldOps, Migration, SchemaVersion, VersionManager};
use serde::Deserialize;
use time::macros::format_description;
use time::Date;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Manifest {
    pub forms: Vec<FormEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FormEntry {
    pub id: String,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct VersionEntry {
    pub version: String,
    pub fragments: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub deprecated_on: Option<String>,
    #[serde(default)]
    pub migrate_to: Option<String>,
    #[serde(default)]
    pub migrations: Vec<MigrationEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MigrationEntry {
    pub to: String,
    #[serde(default)]
    pub description: String,
    pub ops: FieldOps,
}

/// Read `path` and register every listed version with a fresh manager.
pub(crate) fn load_manifest(path: &Path) -> Result<VersionManager, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("cannot read manifest {}: {}", path.display(), e))?;
    let manifest: Manifest = serde_json::from_str(&contents)
        .map_err(|e| format!("invalid manifest {}: {}", path.display(), e))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    build_manager(manifest, base)
}

fn build_manager(manifest: Manifest, base: &Path) -> Result<VersionManager, String> {
    let mut manager = VersionManager::new();
    for form in manifest.forms {
        for entry in form.versions {
            let version = build_version(&form.id, entry, base)?;
            manager
                .register_version(&form.id, version)
                .map_err(|e| e.to_string())?;
        }
    }
    Ok(manager)
}

fn build_version(form_id: &str, entry: VersionEntry, base: &Path) -> Result<SchemaVersion, String> {
    let mut composer = Composer::new();
    for fragment in &entry.fragments {
        let file = base.join(fragment);
        let contents = fs::read_to_string(&file)
            .map_err(|e| format!("cannot read fragment {}: {}", file.display(), e))?;
        let value: serde_json::Value = serde_json::from_str(&contents)
            .map_err(|e| format!("invalid JSON in {}: {}", file.display(), e))?;
        composer
            .register_json(value)
            .map_err(|e| format!("{}: {}", file.display(), e))?;
    }
    let schema = composer.compose().map_err(|e| {
        format!(
            "form '{}' version '{}' does not compose: {}",
            form_id, entry.version, e
        )
    })?;

    let mut version = SchemaVersion::new(entry.version.clone(), schema);
    if entry.deprecated || entry.deprecated_on.is_some() {
        let on = entry
            .deprecated_on
            .as_deref()
            .map(parse_date)
            .transpose()?;
        version = version.deprecate(on);
    }
    if let Some(target) = entry.migrate_to {
        version = version.migrate_to(target);
    }
    for m in entry.migrations {
        version = version.push_migration(Migration::from_ops(
            entry.version.clone(),
            m.to,
            m.description,
            m.ops,
        ));
    }
    Ok(version)
}

fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("invalid deprecatedOn date '{}': {}", raw, e))
}
