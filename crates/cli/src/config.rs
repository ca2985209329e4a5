//! `formflow.toml` configuration.
//!
//! ```toml
//! [generate]
//! coverage = "representative"
//! max_paths = 100
//! max_depth = 25
//! seed = 24301
//! include_invalid = false
//!
//! [log]
//! filter = "info"
//! ```
//!
//! Every key is optional. Command-line flags override the file, and the
//! file overrides the library defaults.

use std::fs;
use std::path::{Path, PathBuf};

use formflow_analyze::GenerationOptions;
use serde::Deserialize;

/// File looked up in the working directory when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "formflow.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FormflowConfig {
    pub generate: GenerationOptions,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

impl FormflowConfig {
    fn validate(&self) -> Result<(), String> {
        if self.generate.max_paths == 0 {
            return Err("generate.max_paths must be > 0".to_string());
        }
        if self.generate.max_depth == 0 {
            return Err("generate.max_depth must be > 0".to_string());
        }
        Ok(())
    }
}

/// Load the explicit config file, or `formflow.toml` from the working
/// directory when it exists. An explicit path must exist.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<FormflowConfig, String> {
    let path: PathBuf = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !fallback.exists() {
                return Ok(FormflowConfig::default());
            }
            fallback
        }
    };
    let contents = fs::read_to_string(&path)
        .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
    parse_config(&contents).map_err(|e| format!("invalid config {}: {}", path.display(), e))
}

fn parse_config(contents: &str) -> Result<FormflowConfig, String> {
    let cfg: FormflowConfig = toml::from_str(contents).map_err(|e| e.to_string())?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow_analyze::Coverage;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(parse_config("").unwrap(), FormflowConfig::default());
    }

    #[test]
    fn partial_generate_section_keeps_defaults() {
        let cfg = parse_config(
            r#"
            [generate]
            coverage = "exhaustive"
            seed = 7

            [log]
            filter = "formflow_analyze=debug"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.generate.coverage, Coverage::Exhaustive);
        assert_eq!(cfg.generate.seed, 7);
        assert_eq!(cfg.generate.max_paths, GenerationOptions::default().max_paths);
        assert_eq!(cfg.log.filter.as_deref(), Some("formflow_analyze=debug"));
    }

    #[test]
    fn rejects_unknown_keys_and_zero_limits() {
        assert!(parse_config("[generate]\nmax_paths = 0\n").is_err());
        assert!(parse_config("verbose = true\n").is_err());
    }
}
