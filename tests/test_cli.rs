use assert_cmd::prelude::*;
use predicates::prelude::*;

use std::process::Command;

#[test]
fn test_cli() {
    // a subcommand is required
    let mut cmd = Command::cargo_bin("schedsim").expect("Calling binary failed");
    cmd.assert().failure();
}

#[test]
fn test_version() {
    let expected_version = "schedsim 0.1.0\n";
    let mut cmd = Command::cargo_bin("schedsim").expect("Calling binary failed");
    cmd.arg("--version")
        .assert()
        .stdout(expected_version);
}

#[test]
fn test_unknown_policy_fails() {
    let mut cmd = Command::cargo_bin("schedsim").expect("Calling binary failed");
    cmd.arg("run")
        .arg("0")
        .arg("lottery")
        .assert()
        .failure();
}

#[test]
fn test_config_lists_policies() {
    let mut cmd = Command::cargo_bin("schedsim").expect("Calling binary failed");
    cmd.arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("HRRN"));
}
