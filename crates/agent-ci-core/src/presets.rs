//! Ready-made sources and suite loading helpers.

use crate::loader::{LoaderError, load_test_file, load_tests};
use crate::source::ScriptedResponseSource;
use crate::types::{ScriptedResponse, SourceConfig, TestCase, ValidationError};
use std::path::Path;
use std::str::FromStr;

/// Provider-shaped response presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    OpenAi,
    Anthropic,
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(format!(
                "Invalid preset: {s}. Valid options: openai, anthropic"
            )),
        }
    }
}

fn response(
    content: &str,
    model: &str,
    tokens_used: u64,
    latency_ms: f64,
    finish_reason: &str,
) -> ScriptedResponse {
    ScriptedResponse {
        finish_reason: finish_reason.to_string(),
        ..ScriptedResponse::new(content, model, tokens_used, latency_ms)
    }
}

const OPENAI_MODEL: &str = "gpt-4o";
const ANTHROPIC_MODEL: &str = "claude-opus-4-6";

/// Plain text, a JSON answer, and a `tool_calls` reply for `search_web`.
#[must_use]
pub fn openai_responses() -> Vec<ScriptedResponse> {
    vec![
        response(
            "I understand your request. Here is my response.",
            OPENAI_MODEL,
            28,
            320.0,
            "stop",
        ),
        response(
            r#"{"answer": "42", "confidence": 0.95, "reasoning": "computed"}"#,
            OPENAI_MODEL,
            42,
            410.0,
            "stop",
        ),
        response(
            r#"{"tool_calls": [{"id": "call_abc", "type": "function", "function": {"name": "search_web", "arguments": "{\"query\": \"latest news\"}"}}]}"#,
            OPENAI_MODEL,
            55,
            280.0,
            "tool_calls",
        ),
    ]
}

/// Plain text, a JSON status, and a `tool_use` block for `calculator`.
#[must_use]
pub fn anthropic_responses() -> Vec<ScriptedResponse> {
    vec![
        response(
            "I'd be happy to help with that. Based on the information provided, here is my analysis.",
            ANTHROPIC_MODEL,
            35,
            290.0,
            "end_turn",
        ),
        response(
            r#"{"status": "success", "data": {"result": "processed"}}"#,
            ANTHROPIC_MODEL,
            48,
            375.0,
            "end_turn",
        ),
        response(
            r#"{"type": "tool_use", "id": "toolu_01", "name": "calculator", "input": {"expression": "2 + 2"}}"#,
            ANTHROPIC_MODEL,
            62,
            310.0,
            "tool_use",
        ),
    ]
}

/// Source config for a preset. `responses` replaces the preset's defaults when given.
///
/// # Errors
/// Returns `ValidationError::FailureRateOutOfRange` for a rate outside `[0, 1]`.
pub fn preset_config(
    preset: Preset,
    responses: Option<Vec<ScriptedResponse>>,
    failure_rate: f64,
) -> Result<SourceConfig, ValidationError> {
    match preset {
        Preset::OpenAi => SourceConfig::new(
            OPENAI_MODEL,
            responses.unwrap_or_else(openai_responses),
            350.0,
            failure_rate,
        ),
        Preset::Anthropic => SourceConfig::new(
            ANTHROPIC_MODEL,
            responses.unwrap_or_else(anthropic_responses),
            320.0,
            failure_rate,
        ),
    }
}

/// A source that mimics OpenAI chat completions.
///
/// # Errors
/// Returns `ValidationError::FailureRateOutOfRange` for a rate outside `[0, 1]`.
pub fn mock_openai(
    responses: Option<Vec<ScriptedResponse>>,
    failure_rate: f64,
) -> Result<ScriptedResponseSource, ValidationError> {
    preset_config(Preset::OpenAi, responses, failure_rate).map(ScriptedResponseSource::new)
}

/// A source that mimics Anthropic messages.
///
/// # Errors
/// Returns `ValidationError::FailureRateOutOfRange` for a rate outside `[0, 1]`.
pub fn mock_anthropic(
    responses: Option<Vec<ScriptedResponse>>,
    failure_rate: f64,
) -> Result<ScriptedResponseSource, ValidationError> {
    preset_config(Preset::Anthropic, responses, failure_rate).map(ScriptedResponseSource::new)
}

/// Config used when a run doesn't supply one: a single canned reply.
#[must_use]
pub fn default_source_config() -> SourceConfig {
    SourceConfig {
        model_name: "mock-model".to_string(),
        responses: vec![ScriptedResponse::new(
            "Mock response: task completed successfully.",
            "mock-model",
            12,
            10.0,
        )],
        default_latency_ms: 10.0,
        failure_rate: 0.0,
    }
}

/// Load test cases from a directory (recursively) or a single YAML file.
///
/// # Errors
/// Returns `LoaderError::PathNotFound` if `path` doesn't exist, or any
/// error from the underlying loader.
pub fn load_test_suite(path: &Path) -> Result<Vec<TestCase>, LoaderError> {
    if path.is_dir() {
        load_tests(path)
    } else if path.is_file() {
        load_test_file(path)
    } else {
        Err(LoaderError::PathNotFound(path.to_path_buf()))
    }
}
