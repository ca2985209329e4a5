use std::path::PathBuf;
use std::process;

use formflow_analyze::{has_errors, lint_schema};

use super::{load_fragments, print_json};
use crate::{report_error, OutputFormat};

/// Lint the merged fragments. Exits with status 1 when any finding is an
/// error; warnings alone pass.
pub(crate) fn cmd_lint(fragments: &[PathBuf], output: OutputFormat, quiet: bool) {
    let composer = load_fragments(fragments, output, quiet);
    // Lint what the fragments merge to, even if composition would reject it.
    let schema = match composer.merge() {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("composition error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let findings = lint_schema(&schema);
    let failed = has_errors(&findings);

    if !quiet {
        match output {
            OutputFormat::Json => {
                print_json(&serde_json::json!({
                    "schema": schema.id,
                    "findings": findings,
                    "passed": !failed,
                }));
            }
            OutputFormat::Text => {
                if findings.is_empty() {
                    println!("No findings for '{}'", schema.id);
                } else {
                    for f in &findings {
                        let location = f
                            .transition
                            .as_deref()
                            .or(f.step.as_deref())
                            .unwrap_or(&schema.id);
                        println!(
                            "{:<7} {} [{}] {}",
                            f.severity.as_str(),
                            location,
                            f.check,
                            f.message
                        );
                    }
                    println!();
                    println!("{} finding(s)", findings.len());
                }
            }
        }
    }

    if failed {
        process::exit(1);
    }
}
