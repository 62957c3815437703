//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

use tier3::test_support::TIER3_ENV_VARS;

#[test]
fn cli_without_arguments_prints_usage() {
    let mut cmd = cargo_bin_cmd!("tier3");
    cmd.assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn cli_help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("tier3");
    cmd.arg("--help");
    cmd.assert().success().stdout(
        predicate::str::contains("logon")
            .and(predicate::str::contains("wait"))
            .and(predicate::str::contains("check")),
    );
}

#[test]
fn cli_reports_missing_configuration() {
    let home = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let mut cmd = cargo_bin_cmd!("tier3");
    for key in TIER3_ENV_VARS {
        cmd.env_remove(key);
    }
    cmd.env_remove("XDG_CONFIG_HOME")
        .env("HOME", home.path())
        .current_dir(home.path())
        .args(["get", "Server/GetServer/JSON"]);

    cmd.assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("configuration error"));
}
