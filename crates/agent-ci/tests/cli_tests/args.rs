//! CLI argument tests.

use super::{agent_ci, fixture};
use predicates::prelude::*;

#[test]
fn test_arg_help() {
    agent_ci()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Deterministic test runner for conversational agents",
        ))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_arg_version() {
    agent_ci()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("agent-ci"));
}

#[test]
fn test_arg_missing_subcommand() {
    agent_ci().assert().failure();
}

#[test]
fn test_arg_invalid_output_format() {
    agent_ci()
        .args(["test", &fixture("failing"), "--output", "yaml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid output format"));
}

#[test]
fn test_arg_invalid_preset() {
    agent_ci()
        .args(["test", &fixture("failing"), "--preset", "gemini"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid preset"));
}

#[test]
fn test_arg_preset_conflicts_with_mock_config() {
    agent_ci()
        .args([
            "test",
            &fixture("passing"),
            "--preset",
            "openai",
            "--mock-config",
            &fixture("mock_config.yaml"),
        ])
        .assert()
        .failure();
}

#[test]
fn test_arg_failure_rate_requires_preset() {
    agent_ci()
        .args(["test", &fixture("passing"), "--failure-rate", "0.5"])
        .assert()
        .failure();
}

#[test]
fn test_arg_non_positive_timeout() {
    agent_ci()
        .args(["test", &fixture("failing"), "--timeout", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Test run failed"));
}

#[test]
fn test_arg_zero_concurrency() {
    agent_ci()
        .args(["test", &fixture("failing"), "--parallel", "--concurrency", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Test run failed"));
}
