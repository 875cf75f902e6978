//! Report format tests: text, json, junit and `--out-file`.

use super::{agent_ci, fixture};
use predicates::prelude::*;

#[test]
fn test_output_json() -> Result<(), Box<dyn std::error::Error>> {
    let output = agent_ci()
        .args(["test", &fixture("failing"), "--output", "json"])
        .output()?;
    assert_eq!(output.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(json["suite_name"], "failing");
    assert_eq!(json["total"], 2);
    assert_eq!(json["passed"], 1);
    assert_eq!(json["failed"], 1);

    let results = json["results"].as_array().ok_or("results is not an array")?;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["test_case_name"], "mentions_completion");
    assert_eq!(results[0]["passed"], true);
    assert_eq!(results[1]["passed"], false);
    assert_eq!(
        results[1]["actual_output"],
        "Mock response: task completed successfully."
    );
    Ok(())
}

#[test]
fn test_output_junit() {
    agent_ci()
        .args(["test", &fixture("failing"), "--output", "junit"])
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with("<?xml"))
        .stdout(predicate::str::contains(
            r#"<testsuite name="failing" tests="2" failures="1" errors="0""#,
        ))
        .stdout(predicate::str::contains(
            r#"<testcase name="mentions_banana" classname="failing""#,
        ))
        .stdout(predicate::str::contains(r#"type="AssertionError""#))
        .stdout(predicate::str::contains("</testsuites>"));
}

#[test]
fn test_output_text_has_no_color_when_piped() {
    agent_ci()
        .args(["test", &fixture("failing")])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\x1b[").not());
}

#[test]
fn test_output_out_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::TempDir::new()?;
    let report = dir.path().join("report.json");

    agent_ci()
        .args([
            "test",
            &fixture("passing"),
            "--mock-config",
            &fixture("mock_config.yaml"),
            "--output",
            "json",
            "--out-file",
            &report.display().to_string(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report)?)?;
    assert_eq!(json["passed"], 3);
    assert_eq!(json["failed"], 0);
    Ok(())
}

#[test]
fn test_output_out_file_unwritable() {
    agent_ci()
        .args([
            "test",
            &fixture("failing"),
            "--out-file",
            "/nonexistent/dir/report.txt",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to write report"));
}
