//! Live progress output with cargo test-like formatting.
//!
//! Everything goes to stderr so a rendered report on stdout stays clean.

use crate::runner::ProgressEvent;
use crate::types::{CaseState, TestResult};
use std::io::{self, Write};

/// Reporter configuration.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Show assertion labels under each test line.
    pub verbose: bool,
    /// Use colors in output.
    pub color: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            color: true,
        }
    }
}

/// Progress reporter with cargo test-like output.
#[derive(Clone)]
pub struct Reporter {
    config: ReporterConfig,
}

impl Reporter {
    /// Create a new reporter with the given configuration.
    #[must_use]
    pub const fn new(config: ReporterConfig) -> Self {
        Self { config }
    }

    fn status(&self, state: CaseState) -> &'static str {
        match (state, self.config.color) {
            (CaseState::Passed, true) => "\x1b[32mok\x1b[0m",
            (CaseState::Passed, false) => "ok",
            (CaseState::Failed, true) => "\x1b[31mFAILED\x1b[0m",
            (CaseState::Failed, false) => "FAILED",
            (CaseState::NotStarted | CaseState::Running, _) => "running",
        }
    }

    /// Print the start of a suite run.
    pub fn suite_start(&self, suite_name: &str, total: usize) {
        eprintln!();
        eprintln!("running {total} tests in {suite_name}");
    }

    /// Print a test result line.
    pub fn test_result(&self, result: &TestResult) {
        eprintln!(
            "test {} ... {}",
            result.test_case_name(),
            self.status(result.state())
        );

        if self.config.verbose {
            for label in result.assertions_passed() {
                eprintln!("    ok {label}");
            }
            for label in result.assertions_failed() {
                eprintln!("    FAILED {label}");
            }
        }
    }

    /// Print the final summary line.
    pub fn summary(&self, passed: usize, failed: usize) {
        let state = if failed == 0 {
            CaseState::Passed
        } else {
            CaseState::Failed
        };
        eprintln!();
        eprintln!(
            "test result: {}. {passed} passed; {failed} failed",
            self.status(state)
        );
    }

    /// Dispatch a runner progress event.
    pub fn handle(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::SuiteStarted { suite_name, total } => {
                self.suite_start(suite_name, *total);
            }
            ProgressEvent::TestStarted { .. } => {}
            ProgressEvent::TestCompleted { result } => self.test_result(result),
            ProgressEvent::SuiteCompleted { passed, failed } => self.summary(*passed, *failed),
        }
    }

    /// Print a warning message.
    pub fn warn(&self, message: &str) {
        if self.config.color {
            eprintln!("\x1b[33mwarning\x1b[0m: {message}");
        } else {
            eprintln!("warning: {message}");
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        if self.config.color {
            eprintln!("\x1b[31merror\x1b[0m: {message}");
        } else {
            eprintln!("error: {message}");
        }
    }

    /// Flush stderr.
    pub fn flush(&self) {
        let _ = io::stderr().flush();
    }
}
