//! Integration tests for the cachenode CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn write_script(temp_dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = temp_dir.path().join("script.json");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_describe_lists_cache_model() {
    let mut cmd = Command::cargo_bin("cachenode").unwrap();
    cmd.arg("describe")
        .assert()
        .success()
        .stdout(predicate::str::contains("CacheModel"))
        .stdout(predicate::str::contains("model: * (lazy)"))
        .stdout(predicate::str::contains("device: [auto, cpu, gpu] = \"auto\""));
}

#[test]
fn test_describe_json() {
    let mut cmd = Command::cargo_bin("cachenode").unwrap();
    let output = cmd.arg("describe").arg("--json").output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["CacheModel"]["function"], "cache_model");
    assert_eq!(json["CacheModel"]["category"], "cache");
}

#[test]
fn test_config_defaults() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("cachenode").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("accelerator: cuda:0"))
        .stdout(predicate::str::contains("offload:     cpu"));
}

#[test]
fn test_config_from_workspace_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join(".cachenode");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "[devices]\naccelerator = \"mps\"\n").unwrap();

    let mut cmd = Command::cargo_bin("cachenode").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("accelerator: mps"));
}

#[test]
fn test_invalid_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[devices]\naccelerator = \"cpu\"\n").unwrap();

    let mut cmd = Command::cargo_bin("cachenode").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not be cpu"));
}

#[test]
fn test_replay_reports_hits_and_misses() {
    let temp_dir = TempDir::new().unwrap();
    let script = write_script(
        &temp_dir,
        r#"[
            {"cache_key": "m1", "model_id": "first", "device": "cpu"},
            {"cache_key": "m1", "model_id": "second", "device": "gpu"}
        ]"#,
    );

    let mut cmd = Command::cargo_bin("cachenode").unwrap();
    let output = cmd.current_dir(temp_dir.path()).arg("replay").arg(&script).arg("--json").output().unwrap();
    assert!(output.status.success());

    let outcomes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcomes[0]["hit"], false);
    assert_eq!(outcomes[0]["device"], "cpu");
    assert_eq!(outcomes[1]["hit"], true);
    assert_eq!(outcomes[1]["model_id"], "first");
    assert_eq!(outcomes[1]["device"], "cuda:0");
    assert_eq!(outcomes[1]["variant"], "settable_device");
}

#[test]
fn test_replay_text_output() {
    let temp_dir = TempDir::new().unwrap();
    let script = write_script(&temp_dir, r#"[{"device_support": "read_only", "device": "gpu"}]"#);

    let mut cmd = Command::cargo_bin("cachenode").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("replay")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("variant=inert_device"))
        .stdout(predicate::str::contains("device=cpu"));
}

#[test]
fn test_replay_missing_script() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("cachenode").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("replay")
        .arg("missing.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read script"));
}
