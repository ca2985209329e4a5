use std::path::Path;
use std::process;

use formflow_core::Rule;
use formflow_eval::{evaluate, CustomRuleRegistry};

use super::{print_json, read_json};
use crate::{report_error, OutputFormat};

/// Evaluate one rule. No custom predicates are available from the
/// command line, so a custom rule reports an unknown-rule error.
pub(crate) fn cmd_eval(rule_path: &Path, data_path: &Path, output: OutputFormat, quiet: bool) {
    let rule_json = read_json(rule_path, "rule", output, quiet);
    let data = read_json(data_path, "data", output, quiet);

    let rule: Rule = match serde_json::from_value(rule_json) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!("error: {} is not a rule: {}", rule_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    if let Err(e) = rule.validate() {
        report_error(&format!("error: {}", e), output, quiet);
        process::exit(1);
    }

    let result = match evaluate(&rule, &data, &CustomRuleRegistry::new()) {
        Ok(b) => b,
        Err(e) => {
            report_error(&format!("evaluation error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "rule": rule.to_string(),
            "result": result,
        })),
        OutputFormat::Text => println!("{}", result),
    }
}
