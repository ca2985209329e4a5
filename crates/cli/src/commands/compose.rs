use std::path::{Path, PathBuf};
use std::process;

use super::{load_fragments, print_json};
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_compose(
    fragments: &[PathBuf],
    out: Option<&Path>,
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

    if let Some(path) = out {
        let json = match serde_json::to_string_pretty(&schema) {
            Ok(j) => j,
            Err(e) => {
                report_error(&format!("serialization error: {}", e), output, quiet);
                process::exit(1);
            }
        };
        if let Err(e) = std::fs::write(path, json + "\n") {
            let msg = format!("error: cannot write {}: {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }

    match output {
        OutputFormat::Json => {
            if out.is_none() {
                print_json(&schema);
            }
        }
        OutputFormat::Text => {
            if quiet {
                return;
            }
            println!(
                "Composed '{}' version {} from {} fragment(s)",
                schema.id,
                schema.version,
                composer.len()
            );
            println!("  Steps: {}", schema.steps.len());
            for step in &schema.steps {
                println!("    {} ({} fields)", step.id, step.fields.len());
            }
            println!("  Transitions: {}", schema.transitions.len());
            for t in &schema.transitions {
                match &t.guard {
                    Some(g) => println!("    {} when {}", t.key(), g),
                    None => println!("    {}", t.key()),
                }
            }
            if let Some(path) = out {
                println!("  Written to {}", path.display());
            }
        }
    }
}
