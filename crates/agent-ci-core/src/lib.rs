//! Core library for the agent-ci CLI.
//!
//! This crate provides a deterministic harness for conversational-agent tests:
//! - Test case loading from YAML
//! - A scripted response source with round-robin replies and failure injection
//! - Assertion evaluation (text, tool calls, PII, budgets, JSON, JSON Schema)
//! - Serial and parallel suite execution
//! - Report generation (text, JSON, JUnit XML)

pub mod assertion;
pub mod config;
pub mod loader;
pub mod presets;
pub mod report;
pub mod reporter;
pub mod runner;
pub mod source;
pub mod types;

pub use assertion::{
    AssertionOutcome, Observation, PiiKind, calls_tool, contains_text, detect_pii, evaluate,
    evaluate_all, lightweight_schema_check, matches_schema, max_latency, max_tokens, no_pii,
    valid_json,
};
pub use config::{ConfigError, ConfigOverrides, apply_overrides, load_source_config};
pub use loader::{LoaderError, MAX_FILE_SIZE, discover_test_files, load_test_file, load_tests};
pub use presets::{
    Preset, anthropic_responses, default_source_config, load_test_suite, mock_anthropic,
    mock_openai, openai_responses, preset_config,
};
pub use report::{
    ConsoleRenderer, JsonRenderer, JunitRenderer, Renderer, ReportError, ReportFormat,
    renderer_for,
};
pub use reporter::{Reporter, ReporterConfig};
pub use runner::{
    ProgressEvent, ProgressSender, RunnerError, default_parallelism, run_cases, run_suite,
    run_suite_with_progress, run_test,
};
pub use source::{ScriptedResponseSource, SourceError};
pub use types::*;
