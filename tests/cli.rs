// ABOUTME: Integration tests for the testdock CLI commands.
// ABOUTME: Validates --help output and the identity command.

use assert_cmd::Command;
use predicates::prelude::*;

fn testdock_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("testdock"))
}

#[test]
fn help_shows_commands() {
    testdock_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("identity"));
}

#[test]
fn identity_prints_the_derived_names() {
    testdock_cmd()
        .args(["identity", "/tmp/run42/app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pool: run42"))
        .stdout(predicate::str::contains("path: /run42"))
        .stdout(predicate::str::contains("http://localhost:5100/run42/"));
}

#[test]
fn identity_rejects_a_rootless_path() {
    testdock_cmd()
        .args(["identity", "/app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parent directory"));
}

#[test]
fn missing_subcommand_fails() {
    testdock_cmd().assert().failure();
}

#[test]
fn deploy_reads_the_params_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("testdock.yml"),
        "application_path: /nonexistent/cfg-artifact/app\n",
    )
    .unwrap();

    // The configured artifact does not exist, so the deploy fails with a
    // message naming the path taken from the file.
    testdock_cmd()
        .current_dir(dir.path())
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cfg-artifact"));
}

#[test]
fn deploy_with_missing_config_file_fails() {
    testdock_cmd()
        .args(["deploy", "--config", "/nonexistent/testdock.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parameters file not found"));
}

#[test]
fn deploy_without_artifact_or_params_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    testdock_cmd()
        .current_dir(dir.path())
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("testdock.yml"));
}
