//! CLI end-to-end tests
//!
//! Tests for the soundforged command-line interface. Everything here runs
//! without ffmpeg; see `integration_ffmpeg.rs` for tests that need it.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the soundforged binary
#[allow(deprecated)]
fn soundforged_cmd() -> Command {
    let mut cmd = Command::cargo_bin("soundforged").unwrap();
    // Keep the user's config out of the tests.
    cmd.current_dir(std::env::temp_dir());
    cmd
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = soundforged_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = soundforged_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("soundforged"))
        .stdout(predicate::str::contains("fix-artists"))
        .stdout(predicate::str::contains("hls"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = soundforged_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("soundforged "));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = soundforged_cmd();
    cmd.arg("check-tools").assert().success().stdout(
        predicate::str::contains("ffmpeg").and(predicate::str::contains("ffprobe")),
    );
}

#[test]
fn test_cli_check_tools_json() {
    let output = soundforged_cmd()
        .args(["--json", "check-tools"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let tools: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["ffmpeg", "ffprobe"]);
}

#[test]
fn test_cli_encode_help() {
    let mut cmd = soundforged_cmd();
    cmd.args(["encode", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--strip-metadata"));
}

#[test]
fn test_cli_encode_requires_input() {
    let mut cmd = soundforged_cmd();
    cmd.arg("encode").assert().failure().code(2);
}

#[test]
fn test_cli_encode_rejects_unknown_codec() {
    let mut cmd = soundforged_cmd();
    cmd.args(["encode", "-C", "wma", "/tmp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown codec"));
}

#[test]
fn test_cli_encode_rejects_bad_bitrate() {
    let mut cmd = soundforged_cmd();
    cmd.args(["encode", "-b", "1.5M", "/tmp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid bitrate"));
}

#[test]
fn test_cli_fix_artists_help() {
    let mut cmd = soundforged_cmd();
    cmd.args(["fix-artists", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--separator"))
        .stdout(predicate::str::contains("--backup"));
}

#[test]
fn test_cli_probe_nonexistent_file() {
    let mut cmd = soundforged_cmd();
    cmd.args(["probe", "/nonexistent/path/track.flac"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_validate_writes_summary() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("soundforged.toml");
    fs::write(
        &config_file,
        r#"
[encode]
codecs = ["flac", "opus"]
bitrates = ["96k", 160]

[artists]
separator = " -- "
"#,
    )
    .unwrap();

    let mut cmd = soundforged_cmd();
    cmd.args(["validate", config_file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("[flac, opus] at [96k, 160k]"))
        .stdout(predicate::str::contains("separator \" -- \""));
}

#[test]
fn test_cli_validate_reports_warnings() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("soundforged.toml");
    fs::write(&config_file, "[hls]\ncodecs = [\"vorbis\"]\nsegment_duration = 0\n").unwrap();

    let mut cmd = soundforged_cmd();
    cmd.args(["--config", config_file.to_str().unwrap(), "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("warning"));
}

#[test]
fn test_cli_validate_rejects_bad_toml() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("broken.toml");
    fs::write(&config_file, "[encode\ncodecs = 3").unwrap();

    let mut cmd = soundforged_cmd();
    cmd.args(["validate", config_file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_cli_missing_tool_exit_code() {
    // Point the tool overrides at nothing and hide PATH so discovery fails.
    let temp = tempdir().unwrap();
    let source = temp.path().join("tone.flac");
    fs::write(&source, b"fLaC").unwrap();

    let mut cmd = soundforged_cmd();
    cmd.env("PATH", temp.path())
        .args(["encode", source.to_str().unwrap()])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("not found"));
}
