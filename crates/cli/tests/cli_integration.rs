//! CLI integration tests for every subcommand.
//!
//! Uses `assert_cmd` to spawn the `formflow` binary and verify exit codes,
//! stdout content, and stderr content. Commands run from the workspace
//! root so fixture paths resolve.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `formflow` binary, rooted at workspace.
fn formflow() -> Command {
    let mut cmd = cargo_bin_cmd!("formflow");
    cmd.current_dir(workspace_root());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().expect("run formflow");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    formflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Formflow form schema toolchain"));
}

#[test]
fn version_exits_0() {
    formflow()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("formflow"));
}

#[test]
fn unknown_coverage_is_rejected() {
    formflow()
        .args(["generate", "fixtures/signup/base.json", "--coverage", "everything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown coverage"));
}

// ──────────────────────────────────────────────
// 2. Compose
// ──────────────────────────────────────────────

#[test]
fn compose_text_summarises_schema() {
    formflow()
        .args(["compose", "fixtures/signup/base.json", "fixtures/signup/consent.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Composed 'signup' version 2 from 2 fragment(s)"))
        .stdout(predicate::str::contains("adult->consent when email matches"))
        .stdout(predicate::str::contains("adult->done").not());
}

#[test]
fn compose_json_emits_unified_schema() {
    let schema = stdout_json(formflow().args([
        "--output",
        "json",
        "compose",
        "fixtures/signup/base.json",
        "fixtures/signup/consent.json",
    ]));
    assert_eq!(schema["version"], "2");
    let personal = &schema["steps"][0];
    assert_eq!(personal["id"], "personal");
    assert_eq!(personal["fields"].as_array().unwrap().len(), 3);
    assert!(schema["steps"]
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s["id"] == "consent"));
}

#[test]
fn compose_writes_out_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("schema.json");
    formflow()
        .args(["compose", "fixtures/signup/base.json", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Written to"));
    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["id"], "signup");
}

#[test]
fn compose_invalid_graph_fails() {
    formflow()
        .args(["compose", "fixtures/lint/dangling.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("composition error"))
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn compose_missing_file_reports_json_error() {
    formflow()
        .args(["--output", "json", "compose", "fixtures/signup/missing.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("{\"error\":"))
        .stderr(predicate::str::contains("fragment file not found"));
}

#[test]
fn quiet_suppresses_errors() {
    formflow()
        .args(["--quiet", "compose", "fixtures/signup/missing.json"])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty());
}

// ──────────────────────────────────────────────
// 3. Lint
// ──────────────────────────────────────────────

#[test]
fn lint_reports_dangling_and_unreachable() {
    formflow()
        .args(["lint", "fixtures/lint/dangling.json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("dangling-transition"))
        .stdout(predicate::str::contains("middle->nowhere"))
        .stdout(predicate::str::contains("unreachable-step"))
        .stdout(predicate::str::contains("island"));
}

#[test]
fn lint_warnings_pass() {
    let report = stdout_json(formflow().args(["--output", "json", "lint", "fixtures/lint/shadowed.json"]));
    assert_eq!(report["passed"], true);
    assert_eq!(report["findings"][0]["check"], "shadowed-transition");
    assert_eq!(report["findings"][0]["severity"], "warning");
}

#[test]
fn lint_clean_schema() {
    formflow()
        .args(["lint", "fixtures/signup/base.json", "fixtures/signup/consent.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No findings for 'signup'"));
}

// ──────────────────────────────────────────────
// 4. Eval
// ──────────────────────────────────────────────

#[test]
fn eval_true_and_false() {
    formflow()
        .args(["eval", "fixtures/rules/adult.json", "--data", "fixtures/data/adult.json"])
        .assert()
        .success()
        .stdout("true\n");
    formflow()
        .args(["eval", "fixtures/rules/adult.json", "--data", "fixtures/data/minor.json"])
        .assert()
        .success()
        .stdout("false\n");
}

#[test]
fn eval_json_output() {
    let result = stdout_json(formflow().args([
        "--output",
        "json",
        "eval",
        "fixtures/rules/adult.json",
        "--data",
        "fixtures/data/adult.json",
    ]));
    assert_eq!(result["result"], true);
}

#[test]
fn eval_unknown_custom_rule_fails() {
    formflow()
        .args(["eval", "fixtures/rules/custom.json", "--data", "fixtures/data/adult.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown custom rule 'isResident'"));
}

#[test]
fn eval_malformed_rule_fails() {
    let dir = TempDir::new().unwrap();
    let rule = dir.path().join("rule.json");
    fs::write(
        &rule,
        r#"{"kind": "comparison", "field": "country", "operator": "in", "value": "NO"}"#,
    )
    .unwrap();
    formflow()
        .arg("eval")
        .arg(&rule)
        .args(["--data", "fixtures/data/adult.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires an array value"));
}

// ──────────────────────────────────────────────
// 5. Generate
// ──────────────────────────────────────────────

#[test]
fn generate_exhaustive_text() {
    formflow()
        .args(["generate", "fixtures/signup/base.json", "--coverage", "exhaustive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated 2 path(s) for 'signup'"))
        .stdout(predicate::str::contains("personal -> adult -> done"))
        .stdout(predicate::str::contains("personal -> minor -> done"));
}

#[test]
fn generate_json_uses_boundary_values() {
    let report = stdout_json(formflow().args([
        "--output",
        "json",
        "generate",
        "fixtures/signup/base.json",
        "--coverage",
        "exhaustive",
    ]));
    let paths = report["paths"].as_array().unwrap();
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0]["id"], "path-0001");
    assert_eq!(paths[0]["data"]["age"], 18);
    assert_eq!(paths[1]["data"]["age"], 17);
    assert!(paths.iter().all(|p| p["outcome"] == "success"));
    assert_eq!(report["truncated"], false);
}

#[test]
fn generate_is_deterministic_for_a_seed() {
    let run = || {
        formflow()
            .args([
                "--output",
                "json",
                "generate",
                "fixtures/signup/base.json",
                "fixtures/signup/consent.json",
                "--seed",
                "99",
                "--include-invalid",
            ])
            .output()
            .unwrap()
            .stdout
    };
    let first = run();
    assert!(!first.is_empty());
    assert_eq!(first, run());
}

#[test]
fn generate_include_invalid_adds_validation_errors() {
    let report = stdout_json(formflow().args([
        "--output",
        "json",
        "generate",
        "fixtures/signup/base.json",
        "--coverage",
        "exhaustive",
        "--include-invalid",
    ]));
    let paths = report["paths"].as_array().unwrap();
    assert!(paths.iter().any(|p| p["outcome"] == "validation_error"
        && p["steps"] == serde_json::json!(["personal", "adult"])
        && p["data"].get("email").is_none()));
}

#[test]
fn generate_max_paths_truncates() {
    let report = stdout_json(formflow().args([
        "--output",
        "json",
        "generate",
        "fixtures/signup/base.json",
        "--coverage",
        "exhaustive",
        "--max-paths",
        "1",
    ]));
    assert_eq!(report["paths"].as_array().unwrap().len(), 1);
    assert_eq!(report["truncated"], true);
}

#[test]
fn generate_reads_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("formflow.toml");
    fs::write(&config, "[generate]\ncoverage = \"exhaustive\"\nmax_paths = 1\n").unwrap();
    let report = stdout_json(
        formflow()
            .args(["--output", "json", "--config"])
            .arg(&config)
            .args(["generate", "fixtures/signup/base.json"]),
    );
    assert_eq!(report["paths"].as_array().unwrap().len(), 1);

    // flags win over the file
    let report = stdout_json(
        formflow()
            .args(["--output", "json", "--config"])
            .arg(&config)
            .args(["generate", "fixtures/signup/base.json", "--max-paths", "5"]),
    );
    assert_eq!(report["paths"].as_array().unwrap().len(), 2);
}

#[test]
fn invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("formflow.toml");
    fs::write(&config, "[generate]\nmax_depth = 0\n").unwrap();
    formflow()
        .arg("--config")
        .arg(&config)
        .args(["generate", "fixtures/signup/base.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_depth must be > 0"));
}

// ──────────────────────────────────────────────
// 6. Migrate
// ──────────────────────────────────────────────

#[test]
fn migrate_to_latest() {
    let data = stdout_json(formflow().args([
        "migrate",
        "fixtures/migrations/manifest.json",
        "--form",
        "signup",
        "--from",
        "1",
        "fixtures/data/draft-v1.json",
    ]));
    assert_eq!(
        data,
        serde_json::json!({
            "name": "Kari Nordmann",
            "address": {"postalCode": "0150"},
            "newsletter": false
        })
    );
}

#[test]
fn migrate_plan_lists_edges() {
    formflow()
        .args([
            "migrate",
            "fixtures/migrations/manifest.json",
            "--form",
            "signup",
            "--from",
            "1",
            "--to",
            "3",
            "--plan",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 -> 2: nest postal code under address"))
        .stdout(predicate::str::contains("2 -> 3: default newsletter opt-out"));
}

#[test]
fn migrate_same_version_is_identity() {
    let result = stdout_json(formflow().args([
        "--output",
        "json",
        "migrate",
        "fixtures/migrations/manifest.json",
        "--form",
        "signup",
        "--from",
        "2",
        "--to",
        "2",
        "fixtures/data/draft-v1.json",
    ]));
    assert_eq!(result["data"]["zip"], "0150");
    assert_eq!(result["plan"]["steps"], serde_json::json!([]));
}

#[test]
fn migrate_backwards_has_no_path() {
    formflow()
        .args([
            "migrate",
            "fixtures/migrations/manifest.json",
            "--form",
            "signup",
            "--from",
            "3",
            "--to",
            "1",
            "fixtures/data/draft-v1.json",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no migration path"));
}

#[test]
fn migrate_requires_data_without_plan() {
    formflow()
        .args([
            "migrate",
            "fixtures/migrations/manifest.json",
            "--form",
            "signup",
            "--from",
            "1",
        ])
        .assert()
        .failure();
}
