pub(crate) mod compose;
pub(crate) mod eval;
pub(crate) mod generate;
pub(crate) mod lint;
pub(crate) mod migrate;

use std::path::{Path, PathBuf};
use std::process;

use formflow_core::Composer;
use serde_json::Value;

use crate::{report_error, OutputFormat};

/// Read and parse a JSON file, exiting with status 1 on failure.
pub(crate) fn read_json(path: &Path, what: &str, output: OutputFormat, quiet: bool) -> Value {
    let contents = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => {
            let msg = format!("error: {} file not found: {}", what, path.display());
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error: invalid JSON in {}: {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Register every fragment file, in order.
pub(crate) fn load_fragments(paths: &[PathBuf], output: OutputFormat, quiet: bool) -> Composer {
    let mut composer = Composer::new();
    for path in paths {
        let value = read_json(path, "fragment", output, quiet);
        if let Err(e) = composer.register_json(value) {
            let msg = format!("error: {}: {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
    composer
}

/// Print a serializable value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
    println!("{}", json);
}
