//! `agent-ci init` scaffolding tests.

use super::agent_ci;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_init_creates_files() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::TempDir::new()?;
    let target = dir.path().join("agent-tests");

    agent_ci()
        .args(["init", &target.display().to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("Initialized test directory"));

    assert!(target.join("tests/sample_tests.yaml").is_file());
    assert!(target.join("mock_config.yaml").is_file());
    Ok(())
}

#[test]
fn test_init_scaffold_passes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::TempDir::new()?;
    let target = dir.path().join("scaffold");

    agent_ci()
        .args(["init", &target.display().to_string()])
        .assert()
        .success();

    // Five cases against four responses: the last case wraps to the first reply
    agent_ci()
        .args([
            "test",
            &target.join("tests").display().to_string(),
            "--mock-config",
            &target.join("mock_config.yaml").display().to_string(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Results: 5 passed, 0 failed, 5 total"));
    Ok(())
}

#[test]
fn test_init_skips_existing_without_force() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::TempDir::new()?;
    let target = dir.path().join("agent-tests");
    fs::create_dir_all(target.join("tests"))?;
    fs::write(target.join("mock_config.yaml"), "# keep me\n")?;

    agent_ci()
        .args(["init", &target.display().to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("skip"));
    assert_eq!(fs::read_to_string(target.join("mock_config.yaml"))?, "# keep me\n");

    agent_ci()
        .args(["init", &target.display().to_string(), "--force"])
        .assert()
        .success();
    assert!(fs::read_to_string(target.join("mock_config.yaml"))?.contains("mock-gpt-4o"));
    Ok(())
}
