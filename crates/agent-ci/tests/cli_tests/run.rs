//! `agent-ci test` execution tests.

use super::{agent_ci, fixture};
use predicates::prelude::*;

#[test]
fn test_run_all_passing_exits_zero() {
    agent_ci()
        .args([
            "test",
            &fixture("passing"),
            "--mock-config",
            &fixture("mock_config.yaml"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test Suite: passing"))
        .stdout(predicate::str::contains("[PASS] greets_user"))
        .stdout(predicate::str::contains("[PASS] reports_status"))
        .stdout(predicate::str::contains("[PASS] searches_web"))
        .stdout(predicate::str::contains("Results: 3 passed, 0 failed, 3 total"));
}

#[test]
fn test_run_failing_case_exits_one() {
    agent_ci()
        .args(["test", &fixture("failing")])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[PASS] mentions_completion"))
        .stdout(predicate::str::contains("[FAIL] mentions_banana"))
        .stdout(predicate::str::contains("contains_text: 'banana' not found"))
        .stdout(predicate::str::contains("Results: 1 passed, 1 failed, 2 total"));
}

#[test]
fn test_run_default_source_without_mock_config() {
    // Default source replies with a fixed greeting-free message
    agent_ci()
        .args(["test", &fixture("passing")])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[FAIL] greets_user"));
}

#[test]
fn test_run_parallel_matches_serial_verdicts() {
    agent_ci()
        .args([
            "test",
            &fixture("failing"),
            "--parallel",
            "--concurrency",
            "2",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Results: 1 passed, 1 failed, 2 total"));
}

#[test]
fn test_run_provider_failure_is_reported_per_case() {
    agent_ci()
        .args([
            "test",
            &fixture("failing"),
            "--mock-config",
            &fixture("always_fail_config.yaml"),
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("provider_error"))
        .stdout(predicate::str::contains("Results: 0 passed, 2 failed, 2 total"));
}

#[test]
fn test_run_preset_openai() {
    // Preset replies never mention completion or bananas
    agent_ci()
        .args(["test", &fixture("failing"), "--preset", "openai"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Results: 0 passed, 2 failed, 2 total"));
}

#[test]
fn test_run_missing_directory() {
    agent_ci()
        .args(["test", "/nonexistent/agent-ci/tests"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Test run failed"));
}

#[test]
fn test_run_missing_mock_config() {
    agent_ci()
        .args([
            "test",
            &fixture("passing"),
            "--mock-config",
            "/nonexistent/mock.yaml",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load mock config"));
}

#[test]
fn test_run_invalid_suite_is_fatal() {
    agent_ci()
        .args(["test", &fixture("invalid")])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Test run failed"));
}

#[test]
fn test_run_verbose_streams_progress() {
    agent_ci()
        .args(["test", &fixture("failing"), "--verbose"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("test mentions_completion ... ok"))
        .stderr(predicate::str::contains("test mentions_banana ... FAILED"))
        .stderr(predicate::str::contains("test result: FAILED. 1 passed; 1 failed"));
}

#[test]
fn test_run_parallel_timeout_exits_promptly() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::TempDir::new()?;
    let cases: String = (0..5000).map(|i| format!("- name: case_{i}\n")).collect();
    std::fs::write(dir.path().join("many.yaml"), cases)?;

    agent_ci()
        .args([
            "test",
            &dir.path().display().to_string(),
            "--parallel",
            "--concurrency",
            "1",
            "--timeout",
            "1e-9",
        ])
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("suite timed out"));
    Ok(())
}
