//! `formflow migrate`: move saved form data to another schema version.

use std::path::Path;
use std::process;

use super::{print_json, read_json};
use crate::manifest::load_manifest;
use crate::{report_error, OutputFormat};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_migrate(
    manifest_path: &Path,
    form: &str,
    from: &str,
    to: Option<&str>,
    plan_only: bool,
    data_path: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let manager = match load_manifest(manifest_path) {
        Ok(m) => m,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let target = match to {
        Some(v) => v.to_string(),
        None => match manager.get_latest_version(form) {
            Some(latest) => latest.version.clone(),
            None => {
                let msg = format!("error: form '{}' is not in {}", form, manifest_path.display());
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        },
    };

    let plan = match manager.plan_migration(form, from, &target) {
        Ok(p) => p,
        Err(e) => {
            report_error(&format!("migration error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if plan_only {
        if quiet {
            return;
        }
        match output {
            OutputFormat::Json => print_json(&plan),
            OutputFormat::Text => {
                println!("Migration plan for '{}': {} -> {}", form, from, target);
                if plan.steps.is_empty() {
                    println!("  nothing to do");
                }
                for step in &plan.steps {
                    if step.description.is_empty() {
                        println!("  {} -> {}", step.from, step.to);
                    } else {
                        println!("  {} -> {}: {}", step.from, step.to, step.description);
                    }
                }
            }
        }
        return;
    }

    let Some(data_path) = data_path else {
        report_error("error: a data file is required unless --plan is given", output, quiet);
        process::exit(1);
    };
    let data = read_json(data_path, "data", output, quiet);
    let migrated = match manager.migrate_data(form, &data, from, &target) {
        Ok(d) => d,
        Err(e) => {
            report_error(&format!("migration error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "plan": plan,
            "data": migrated,
        })),
        OutputFormat::Text => print_json(&migrated),
    }
}
