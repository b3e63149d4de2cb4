use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("kaiwa")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("scenario"))
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("models"));
}

#[test]
fn test_scenario_help_shows_options() {
    cargo_bin_cmd!("kaiwa")
        .args(["scenario", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--id"))
        .stdout(predicate::str::contains("--role"));
}

#[test]
fn test_scenarios_help_shows_subcommands() {
    cargo_bin_cmd!("kaiwa")
        .args(["scenarios", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("show"));
}

#[test]
fn test_invalid_role_is_rejected() {
    cargo_bin_cmd!("kaiwa")
        .args(["scenario", "--role", "C"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected A or B"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("kaiwa")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
