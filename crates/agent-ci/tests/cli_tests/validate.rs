//! `agent-ci validate` tests.

use super::{agent_ci, fixture};
use predicates::prelude::*;

#[test]
fn test_validate_clean_suite() {
    agent_ci()
        .args(["validate", &fixture("passing")])
        .assert()
        .success()
        .stdout(predicate::str::contains("greets_user"))
        .stdout(predicate::str::contains(
            "OK 3 test case(s) validated successfully.",
        ));
}

#[test]
fn test_validate_warns_without_expected_behavior() {
    agent_ci()
        .args(["validate", &fixture("warnings")])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 test case(s) found: 1 warning(s)."))
        .stderr(predicate::str::contains(
            "Test 'no_expectations' has no expected_behavior",
        ));
}

#[test]
fn test_validate_strict_fails_on_warnings() {
    agent_ci()
        .args(["validate", &fixture("warnings"), "--strict"])
        .assert()
        .code(1);
}

#[test]
fn test_validate_unknown_assertion_key() {
    agent_ci()
        .args(["validate", &fixture("invalid")])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Validation failed"))
        .stderr(predicate::str::contains("contains_txt"));
}

#[test]
fn test_validate_duplicate_names() {
    agent_ci()
        .args(["validate", &fixture("duplicate")])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("same_name"));
}

#[test]
fn test_validate_empty_directory() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().display().to_string();

    agent_ci()
        .args(["validate", &path])
        .assert()
        .success()
        .stderr(predicate::str::contains("no test cases found"));

    agent_ci()
        .args(["validate", &path, "--strict"])
        .assert()
        .code(1);
    Ok(())
}

#[test]
fn test_validate_missing_directory() {
    agent_ci()
        .args(["validate", "/nonexistent/agent-ci/tests"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Validation failed"));
}
