//! Core data types for agent-ci.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("failure_rate must be within [0.0, 1.0], got {0}")]
    FailureRateOutOfRange(f64),
    #[error("{field} must be a non-negative number, got {value}")]
    NegativeLatency { field: &'static str, value: f64 },
    #[error("timeout_seconds must be a positive number, got {0}")]
    NonPositiveTimeout(f64),
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("test case name cannot be empty")]
    EmptyName,
    #[error("matches_schema in test '{0}' must be a mapping")]
    SchemaNotObject(String),
}

fn check_latency(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NegativeLatency { field, value })
    }
}

fn default_finish_reason() -> String {
    "stop".to_string()
}

const fn default_latency_ms() -> f64 {
    50.0
}

const fn default_timeout_seconds() -> f64 {
    30.0
}

/// One simulated agent reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptedResponse {
    pub content: String,
    pub model: String,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub latency_ms: f64,
    #[serde(default = "default_finish_reason")]
    pub finish_reason: String,
}

impl ScriptedResponse {
    /// Create a response with `finish_reason = "stop"`.
    pub fn new(
        content: impl Into<String>,
        model: impl Into<String>,
        tokens_used: u64,
        latency_ms: f64,
    ) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            tokens_used,
            latency_ms,
            finish_reason: default_finish_reason(),
        }
    }

    /// Check the latency bound.
    ///
    /// # Errors
    /// Returns `ValidationError::NegativeLatency` if `latency_ms` is negative or not finite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_latency("latency_ms", self.latency_ms)
    }
}

/// Configuration for a scripted response source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub model_name: String,
    #[serde(default)]
    pub responses: Vec<ScriptedResponse>,
    #[serde(default = "default_latency_ms")]
    pub default_latency_ms: f64,
    #[serde(default)]
    pub failure_rate: f64,
}

impl SourceConfig {
    /// Create a validated source configuration.
    ///
    /// # Errors
    /// Returns a `ValidationError` if `failure_rate` is outside `[0, 1]`
    /// or any latency is negative.
    pub fn new(
        model_name: impl Into<String>,
        responses: Vec<ScriptedResponse>,
        default_latency_ms: f64,
        failure_rate: f64,
    ) -> Result<Self, ValidationError> {
        let config = Self {
            model_name: model_name.into(),
            responses,
            default_latency_ms,
            failure_rate,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate a configuration obtained through deserialization.
    ///
    /// # Errors
    /// Returns a `ValidationError` if `failure_rate` is outside `[0, 1]`
    /// or any latency is negative.
    pub fn validate(&self) -> Result<(), ValidationError> {
        // NaN fails the range check too
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(ValidationError::FailureRateOutOfRange(self.failure_rate));
        }
        check_latency("default_latency_ms", self.default_latency_ms)?;
        self.responses.iter().try_for_each(ScriptedResponse::validate)
    }
}

/// One input message sent to the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Tool names for `calls_tools`: a single name or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolNames {
    One(String),
    Many(Vec<String>),
}

impl ToolNames {
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        }
    }
}

/// The recognized `expected_behavior` keys. Unknown keys are rejected at parse time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedBehavior {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calls_tools: Option<ToolNames>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_pii: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_json: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches_schema: Option<serde_json::Value>,
}

/// A single assertion borrowed from an [`ExpectedBehavior`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssertionSpec<'a> {
    ContainsText(&'a str),
    CallsTools(&'a [String]),
    MaxTokens(u64),
    MaxLatencyMs(f64),
    NoPii(bool),
    ValidJson(bool),
    MatchesSchema(&'a serde_json::Value),
}

impl ExpectedBehavior {
    /// Present assertions in evaluation order.
    #[must_use]
    pub fn specs(&self) -> Vec<AssertionSpec<'_>> {
        let mut specs = Vec::new();
        if let Some(text) = &self.contains_text {
            specs.push(AssertionSpec::ContainsText(text));
        }
        if let Some(tools) = &self.calls_tools {
            specs.push(AssertionSpec::CallsTools(tools.as_slice()));
        }
        if let Some(max) = self.max_tokens {
            specs.push(AssertionSpec::MaxTokens(max));
        }
        if let Some(max) = self.max_latency_ms {
            specs.push(AssertionSpec::MaxLatencyMs(max));
        }
        if let Some(flag) = self.no_pii {
            specs.push(AssertionSpec::NoPii(flag));
        }
        if let Some(flag) = self.valid_json {
            specs.push(AssertionSpec::ValidJson(flag));
        }
        if let Some(schema) = &self.matches_schema {
            specs.push(AssertionSpec::MatchesSchema(schema));
        }
        specs
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs().is_empty()
    }
}

/// A declarative test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_messages: Vec<Message>,
    #[serde(default)]
    pub expected_behavior: ExpectedBehavior,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl TestCase {
    /// Create a test case with no messages and no expectations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_messages: Vec::new(),
            expected_behavior: ExpectedBehavior::default(),
            tags: BTreeSet::new(),
        }
    }

    /// Check the invariants serde can't express.
    ///
    /// # Errors
    /// Returns `ValidationError::EmptyName` for a blank name, or
    /// `ValidationError::SchemaNotObject` if `matches_schema` is not a mapping.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if let Some(schema) = &self.expected_behavior.matches_schema {
            if !schema.is_object() {
                return Err(ValidationError::SchemaNotObject(self.name.clone()));
            }
        }
        Ok(())
    }
}

/// Lifecycle of one case inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    NotStarted,
    Running,
    Passed,
    Failed,
}

impl CaseState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }
}

/// Outcome of one executed test case.
///
/// `passed` is derived from `assertions_failed` on construction, including
/// when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TestResultRecord")]
pub struct TestResult {
    test_case_name: String,
    passed: bool,
    actual_output: String,
    assertions_passed: Vec<String>,
    assertions_failed: Vec<String>,
    duration_ms: f64,
    tokens_used: u64,
}

impl TestResult {
    #[must_use]
    pub fn new(
        test_case_name: String,
        actual_output: String,
        assertions_passed: Vec<String>,
        assertions_failed: Vec<String>,
        duration_ms: f64,
        tokens_used: u64,
    ) -> Self {
        Self {
            test_case_name,
            passed: assertions_failed.is_empty(),
            actual_output,
            assertions_passed,
            assertions_failed,
            duration_ms: duration_ms.max(0.0),
            tokens_used,
        }
    }

    #[must_use]
    pub fn test_case_name(&self) -> &str {
        &self.test_case_name
    }

    #[must_use]
    pub const fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn actual_output(&self) -> &str {
        &self.actual_output
    }

    #[must_use]
    pub fn assertions_passed(&self) -> &[String] {
        &self.assertions_passed
    }

    #[must_use]
    pub fn assertions_failed(&self) -> &[String] {
        &self.assertions_failed
    }

    #[must_use]
    pub const fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    #[must_use]
    pub const fn tokens_used(&self) -> u64 {
        self.tokens_used
    }

    #[must_use]
    pub const fn state(&self) -> CaseState {
        if self.passed {
            CaseState::Passed
        } else {
            CaseState::Failed
        }
    }
}

/// Serialized form of a [`TestResult`]; a stored `passed` flag is ignored.
#[derive(Deserialize)]
struct TestResultRecord {
    test_case_name: String,
    #[serde(default)]
    actual_output: String,
    #[serde(default)]
    assertions_passed: Vec<String>,
    #[serde(default)]
    assertions_failed: Vec<String>,
    #[serde(default)]
    duration_ms: f64,
    #[serde(default)]
    tokens_used: u64,
}

impl From<TestResultRecord> for TestResult {
    fn from(record: TestResultRecord) -> Self {
        Self::new(
            record.test_case_name,
            record.actual_output,
            record.assertions_passed,
            record.assertions_failed,
            record.duration_ms,
            record.tokens_used,
        )
    }
}

/// Aggregate result of a suite run.
///
/// Counts are recomputed from `results` on construction and deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SuiteResultRecord")]
pub struct SuiteResult {
    suite_name: String,
    results: Vec<TestResult>,
    total: usize,
    passed: usize,
    failed: usize,
    duration_ms: f64,
}

impl SuiteResult {
    /// Aggregate results, keeping their order.
    #[must_use]
    pub fn from_results(suite_name: String, results: Vec<TestResult>, duration_ms: f64) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed()).count();
        Self {
            suite_name,
            results,
            total,
            passed,
            failed: total - passed,
            duration_ms: duration_ms.max(0.0),
        }
    }

    #[must_use]
    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    #[must_use]
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub const fn passed(&self) -> usize {
        self.passed
    }

    #[must_use]
    pub const fn failed(&self) -> usize {
        self.failed
    }

    #[must_use]
    pub const fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Serialized form of a [`SuiteResult`]; stored counts are ignored.
#[derive(Deserialize)]
struct SuiteResultRecord {
    suite_name: String,
    #[serde(default)]
    results: Vec<TestResult>,
    #[serde(default)]
    duration_ms: f64,
}

impl From<SuiteResultRecord> for SuiteResult {
    fn from(record: SuiteResultRecord) -> Self {
        Self::from_results(record.suite_name, record.results, record.duration_ms)
    }
}

/// Parameters for a suite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub test_dir: PathBuf,
    /// Falls back to `presets::default_source_config()` when absent.
    #[serde(default)]
    pub source_config: Option<SourceConfig>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,
    #[serde(default)]
    pub parallel: bool,
    /// Parallel worker limit; defaults to available CPU parallelism.
    #[serde(default)]
    pub concurrency: Option<usize>,
    /// Forwarded to every `complete()` call.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl RunConfig {
    pub fn new(test_dir: impl Into<PathBuf>) -> Self {
        Self {
            test_dir: test_dir.into(),
            source_config: None,
            timeout_seconds: default_timeout_seconds(),
            parallel: false,
            concurrency: None,
            seed: None,
        }
    }

    /// Validate the run parameters and the embedded source config.
    ///
    /// # Errors
    /// Returns a `ValidationError` for a non-positive timeout, a zero
    /// concurrency limit, or an invalid source config.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0) {
            return Err(ValidationError::NonPositiveTimeout(self.timeout_seconds));
        }
        if self.concurrency == Some(0) {
            return Err(ValidationError::ZeroConcurrency);
        }
        if let Some(source) = &self.source_config {
            source.validate()?;
        }
        Ok(())
    }

    /// The suite timeout. Values too large for a `Duration` saturate to
    /// `Duration::MAX`; non-positive values map to zero, which `validate`
    /// rejects first.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        if self.timeout_seconds > 0.0 {
            Duration::try_from_secs_f64(self.timeout_seconds).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }
}
