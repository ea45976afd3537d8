//! CLI tests for the planloop binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command running in `cwd` with an isolated home and an explicit config
fn planloop(cwd: &Path) -> Command {
    let config = cwd.join("planloop.yml");
    if !config.exists() {
        write_config(cwd, "");
    }
    let mut cmd = Command::cargo_bin("planloop").unwrap();
    cmd.current_dir(cwd)
        .env("HOME", cwd)
        .env("XDG_CONFIG_HOME", cwd.join(".config"))
        .env_remove("RUST_LOG")
        .arg("-c")
        .arg(&config);
    cmd
}

fn write_config(cwd: &Path, extra: &str) {
    let yaml = format!(
        r#"
llm:
  base-url: http://127.0.0.1:9
  timeout-ms: 2000
paths:
  planning-docs-dir: {cwd}/docs
  output-dir: {cwd}/out
  log-dir: {cwd}/logs
run:
  wait-secs: 0
{extra}"#,
        cwd = cwd.display(),
        extra = extra
    );
    fs::write(cwd.join("planloop.yml"), yaml).unwrap();
}

#[test]
fn test_help_lists_run_flags() {
    let temp = TempDir::new().unwrap();
    planloop(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--resume"))
        .stdout(predicate::str::contains("--runtime"))
        .stdout(predicate::str::contains("--model"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_invalid_runtime_is_rejected() {
    let temp = TempDir::new().unwrap();
    planloop(temp.path())
        .args(["--runtime", "forever"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_zero_runtime_fails_validation() {
    let temp = TempDir::new().unwrap();
    planloop(temp.path())
        .args(["--runtime", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max-runtime-hours"));
}

#[test]
fn test_status_without_saved_state() {
    let temp = TempDir::new().unwrap();
    planloop(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved run state"))
        .stdout(predicate::str::contains("No project checkpoint"));

    // Folders are bootstrapped on startup
    assert!(temp.path().join("docs").is_dir());
    assert!(temp.path().join("out").is_dir());
    assert!(temp.path().join("logs").is_dir());
}

#[test]
fn test_status_shows_saved_state() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("out")).unwrap();
    fs::write(
        temp.path().join("out/state.json"),
        r#"{
  "run_id": "0192f0c4-0000-7000-8000-000000000000",
  "iteration": 7,
  "pending_question": "How are sessions stored?",
  "current_module": "Auth",
  "history": [{"question": "Q6", "answer": "A6"}],
  "summary": "",
  "timestamp": "2024-01-01T00:00:00Z"
}"#,
    )
    .unwrap();

    planloop(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Next iteration:   7"))
        .stdout(predicate::str::contains("How are sessions stored?"))
        .stdout(predicate::str::contains("Current module:   Auth"))
        .stdout(predicate::str::contains("History turns:    1"));
}

#[test]
fn test_status_reads_named_output() {
    let temp = TempDir::new().unwrap();
    planloop(temp.path())
        .args(["status", "--output", "shop.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No final project at"))
        .stdout(predicate::str::contains("shop.json"));
}

#[test]
fn test_non_finite_runtime_fails_validation() {
    let temp = TempDir::new().unwrap();
    for value in ["nan", "inf"] {
        planloop(temp.path())
            .args(["--runtime", value])
            .assert()
            .failure()
            .stderr(predicate::str::contains("max-runtime-hours"));
    }
}

#[test]
fn test_run_without_planning_documents_fails() {
    let temp = TempDir::new().unwrap();
    planloop(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No planning documents found"));

    assert!(!temp.path().join("out/project.json").exists());
}

#[test]
fn test_run_with_unreachable_endpoint_still_writes_project() {
    let temp = TempDir::new().unwrap();
    write_config(temp.path(), "  max-iterations: 5\n  max-consecutive-failures: 2\n");
    fs::create_dir_all(temp.path().join("docs")).unwrap();
    fs::write(temp.path().join("docs/plan.md"), "Build a login module.").unwrap();

    planloop(temp.path())
        .args(["--output", "result.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 consecutive gateway failures"));

    assert!(temp.path().join("out/result.json").exists());
    assert!(temp.path().join("out/result.md").exists());
    assert!(temp.path().join("out/state.json").exists());
}
