//! End-to-end CLI tests for the `unfuckup-s3` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// `--help` displays usage information and exits with code 0.
#[test]
fn help_displays_usage() {
    let mut cmd = Command::cargo_bin("unfuckup-s3").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("s3"));
}

/// `--version` displays the version and exits with code 0.
#[test]
fn version_displays_version() {
    let mut cmd = Command::cargo_bin("unfuckup-s3").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("unfuckup-s3"));
}

/// Running with no subcommand is rejected.
#[test]
fn missing_subcommand_fails() {
    let mut cmd = Command::cargo_bin("unfuckup-s3").unwrap();
    cmd.assert().failure();
}

/// An unknown input file fails fast with a non-zero exit code.
#[test]
fn missing_input_file_fails_fast() {
    let mut cmd = Command::cargo_bin("unfuckup-s3").unwrap();
    cmd.args(["s3", "--input", "/nonexistent/ids.txt"])
        .assert()
        .failure();
}

/// A full run against the in-process fake server, via a YAML config file,
/// completes with exit code 0.
#[test]
fn fake_server_run_completes_successfully() {
    let tmp = tempfile::tempdir().unwrap();

    let input_path = tmp.path().join("ids.txt");
    let mut input_file = std::fs::File::create(&input_path).unwrap();
    writeln!(input_file, "id-one").unwrap();
    writeln!(input_file, "id-two").unwrap();
    writeln!(input_file, "id-three").unwrap();

    let config_path = tmp.path().join("unfuckup.yaml");
    std::fs::write(
        &config_path,
        "s3:\n  fakeserver:\n    use_fake_server: true\n  stat:\n    after_seconds: 3600\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("unfuckup-s3").unwrap();
    cmd.args([
        "--config",
        config_path.to_str().unwrap(),
        "s3",
        "--input",
        input_path.to_str().unwrap(),
    ])
    .assert()
    .success();
}
