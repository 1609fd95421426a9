#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;

const PIPELINE: &str = r#"
steps:
  - name: Build
    exe: sh
    args: ["-c", "true"]
  - name: Test
    exe: sh
    args: ["-c", "exit 1"]
  - name: Push
    exe: sh
    args: ["-c", "true"]
"#;

#[test]
fn test_missing_project_fails() {
    Command::cargo_bin("goci")
        .unwrap()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("project directory is required"));
}

#[test]
fn test_missing_project_dir_fails() {
    Command::cargo_bin("goci")
        .unwrap()
        .args(["-p", "/nonexistent/goci-project"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_config_pipeline_stops_at_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("ci.yml");
    std::fs::write(&config, PIPELINE).unwrap();

    Command::cargo_bin("goci")
        .unwrap()
        .arg("-p")
        .arg(dir.path())
        .arg("-c")
        .arg(&config)
        .env("RUST_LOG", "off")
        .assert()
        .failure()
        .stdout("Build: SUCCESS\n")
        .stderr("Step: \"Test\": failed to execute: Cause: exit status: 1\n");
}

#[test]
fn test_config_pipeline_success() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("ci.yml");
    std::fs::write(&config, PIPELINE.replace("exit 1", "true")).unwrap();

    Command::cargo_bin("goci")
        .unwrap()
        .arg("-p")
        .arg(dir.path())
        .arg("-c")
        .arg(&config)
        .assert()
        .success()
        .stdout("Build: SUCCESS\nTest: SUCCESS\nPush: SUCCESS\n");
}
