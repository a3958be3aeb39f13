//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn cli_without_arguments_prints_usage() {
    let mut cmd = cargo_bin_cmd!("tarmac");
    cmd.assert().failure().stderr(contains("Usage"));
}

#[test]
fn start_requires_label_and_token() {
    let mut cmd = cargo_bin_cmd!("tarmac");
    cmd.arg("start");
    cmd.assert().failure().stderr(contains("--label"));
}
