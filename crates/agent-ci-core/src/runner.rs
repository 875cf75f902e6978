//! Test runner for executing agent test suites.

use crate::assertion::{Observation, evaluate_all};
use crate::loader::{LoaderError, load_tests};
use crate::presets::default_source_config;
use crate::source::ScriptedResponseSource;
use crate::types::{RunConfig, SourceConfig, SuiteResult, TestCase, TestResult, ValidationError};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;

/// Progress events emitted during a suite run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Cases are loaded and about to run.
    SuiteStarted { suite_name: String, total: usize },
    /// A case has started.
    TestStarted { name: String },
    /// A case has reached a terminal state.
    TestCompleted { result: TestResult },
    /// Every case has finished.
    SuiteCompleted { passed: usize, failed: usize },
}

/// Sender for progress events.
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Errors that can occur during a suite run.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),
    #[error("Invalid run config: {0}")]
    Config(#[from] ValidationError),
    #[error("suite timed out after {seconds} seconds")]
    Timeout { seconds: f64 },
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn emit(progress: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = progress {
        // Receiver may have been dropped; progress is best-effort.
        let _ = tx.send(event);
    }
}

/// Run one case against `source` and evaluate its expected behavior.
///
/// A simulated provider failure is captured as a single
/// `provider_error: <message>` label with empty output; no other assertion
/// runs in that case.
pub fn run_test(
    test_case: &TestCase,
    source: &mut ScriptedResponseSource,
    seed: Option<u64>,
) -> TestResult {
    let start = Instant::now();

    let response = match source.complete(&test_case.input_messages, seed) {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(test = %test_case.name, error = %e, "provider call failed");
            return TestResult::new(
                test_case.name.clone(),
                String::new(),
                Vec::new(),
                vec![format!("provider_error: {e}")],
                elapsed_ms(start),
                0,
            );
        }
    };
    let call_ms = elapsed_ms(start);

    let outcome = evaluate_all(
        &test_case.expected_behavior,
        &Observation {
            output: &response.content,
            tokens_used: response.tokens_used,
            latency_ms: response.latency_ms,
            elapsed_ms: call_ms,
        },
    );

    let result = TestResult::new(
        test_case.name.clone(),
        response.content,
        outcome.passed,
        outcome.failed,
        elapsed_ms(start),
        response.tokens_used,
    );
    tracing::debug!(
        test = %result.test_case_name(),
        state = ?result.state(),
        failed = result.assertions_failed().len(),
        "test finished"
    );
    result
}

/// Default parallelism: number of available CPU cores.
#[must_use]
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

/// Base name of the suite directory.
fn suite_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            dir.canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| dir.display().to_string())
}

/// One source shared by every case, in declaration order.
fn run_serial(
    cases: &[TestCase],
    source_config: SourceConfig,
    seed: Option<u64>,
    progress: Option<&ProgressSender>,
) -> Vec<TestResult> {
    let mut source = ScriptedResponseSource::new(source_config);
    cases
        .iter()
        .map(|case| {
            emit(
                progress,
                ProgressEvent::TestStarted {
                    name: case.name.clone(),
                },
            );
            let result = run_test(case, &mut source, seed);
            emit(
                progress,
                ProgressEvent::TestCompleted {
                    result: result.clone(),
                },
            );
            result
        })
        .collect()
}

/// One source per case on the blocking pool, bounded by `concurrency` and
/// the suite timeout. Results come back in completion order.
async fn run_parallel(
    cases: Vec<TestCase>,
    source_config: &SourceConfig,
    config: &RunConfig,
    progress: Option<&ProgressSender>,
) -> Result<Vec<TestResult>, RunnerError> {
    use futures::{StreamExt, stream};

    let limit = config.concurrency.unwrap_or_else(default_parallelism);
    let seed = config.seed;

    let work = stream::iter(cases.into_iter().map(|case| {
        let source_config = source_config.clone();
        let tx = progress.cloned();
        tokio::task::spawn_blocking(move || {
            emit(
                tx.as_ref(),
                ProgressEvent::TestStarted {
                    name: case.name.clone(),
                },
            );
            let mut source = ScriptedResponseSource::new(source_config);
            run_test(&case, &mut source, seed)
        })
    }))
    .buffer_unordered(limit)
    .map(|joined| {
        let result = joined?;
        emit(
            progress,
            ProgressEvent::TestCompleted {
                result: result.clone(),
            },
        );
        Ok::<_, RunnerError>(result)
    })
    .collect::<Vec<_>>();

    // On timeout, workers already handed to the blocking pool keep running
    // until their case finishes; the caller's runtime decides how long to wait.
    let Ok(results) = tokio::time::timeout(config.timeout(), work).await else {
        tracing::error!(seconds = config.timeout_seconds, "suite timed out");
        return Err(RunnerError::Timeout {
            seconds: config.timeout_seconds,
        });
    };
    results.into_iter().collect()
}

/// Run already-loaded cases as a suite named `suite_name`.
///
/// # Errors
/// Returns an error if:
/// - The run config is invalid
/// - A parallel run exceeds `timeout_seconds`
/// - A worker task panics or is cancelled
pub async fn run_cases(
    suite_name: String,
    cases: Vec<TestCase>,
    config: &RunConfig,
    progress: Option<ProgressSender>,
) -> Result<SuiteResult, RunnerError> {
    config.validate()?;
    let progress = progress.as_ref();
    let source_config = config
        .source_config
        .clone()
        .unwrap_or_else(default_source_config);

    tracing::info!(
        suite = %suite_name,
        total = cases.len(),
        parallel = config.parallel,
        model = %source_config.model_name,
        "running suite"
    );
    emit(
        progress,
        ProgressEvent::SuiteStarted {
            suite_name: suite_name.clone(),
            total: cases.len(),
        },
    );

    let start = Instant::now();
    let results = if config.parallel {
        run_parallel(cases, &source_config, config, progress).await?
    } else {
        run_serial(&cases, source_config, config.seed, progress)
    };
    let suite = SuiteResult::from_results(suite_name, results, elapsed_ms(start));

    tracing::info!(
        suite = %suite.suite_name(),
        passed = suite.passed(),
        failed = suite.failed(),
        duration_ms = suite.duration_ms(),
        "suite finished"
    );
    emit(
        progress,
        ProgressEvent::SuiteCompleted {
            passed: suite.passed(),
            failed: suite.failed(),
        },
    );
    Ok(suite)
}

/// Load every case under `config.test_dir` and run it.
///
/// # Errors
/// Returns an error if loading fails or the run fails (see [`run_cases`]).
pub async fn run_suite(config: &RunConfig) -> Result<SuiteResult, RunnerError> {
    run_suite_with_progress(config, None).await
}

/// Run a suite with progress reporting.
///
/// # Errors
/// Returns an error if loading fails or the run fails (see [`run_cases`]).
pub async fn run_suite_with_progress(
    config: &RunConfig,
    progress: Option<ProgressSender>,
) -> Result<SuiteResult, RunnerError> {
    config.validate()?;
    let cases = load_tests(&config.test_dir)?;
    run_cases(suite_name(&config.test_dir), cases, config, progress).await
}
