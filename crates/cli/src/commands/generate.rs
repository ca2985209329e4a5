use std::path::PathBuf;
use std::process;

use formflow_analyze::{GenerationOptions, PathGenerator};
use formflow_eval::CustomRuleRegistry;

use super::{load_fragments, print_json};
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_generate(
    fragments: &[PathBuf],
    options: &GenerationOptions,
    output: OutputFormat,
    quiet: bool,
) {
    let composer = load_fragments(fragments, output, quiet);
    let schema = match composer.compose() {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("composition error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let registry = CustomRuleRegistry::new();
    let report = match PathGenerator::new(&registry).generate(&schema, options) {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("generation error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            println!(
                "Generated {} path(s) for '{}' (coverage {}, seed {})",
                report.paths.len(),
                schema.id,
                options.coverage.as_str(),
                options.seed
            );
            for path in &report.paths {
                println!();
                println!("{}  {}", path.id, path.outcome.as_str());
                println!("  steps: {}", path.steps.join(" -> "));
                for (step, guard) in &path.guards {
                    println!("  enter {} when {}", step, guard);
                }
                println!("  data:  {}", path.data);
            }
            if report.truncated {
                println!();
                println!("Output truncated to {} path(s)", options.max_paths);
            }
            for skipped in &report.skipped_branches {
                println!(
                    "Skipped {} at '{}': {}",
                    skipped.transition, skipped.step, skipped.reason
                );
            }
            if report.depth_limited > 0 {
                println!(
                    "{} path(s) exceeded max depth {}",
                    report.depth_limited, options.max_depth
                );
            }
        }
    }
}
