//! Assertion evaluation engine.
//!
//! Every check here is pure and total: it returns `bool` and resolves
//! malformed input (non-JSON output, a schema that fails to compile) to
//! `false` instead of erroring.

use crate::types::{AssertionSpec, ExpectedBehavior};
use regex::{Captures, Regex, RegexBuilder};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b").ok()
});

static PHONE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?:\+?1[\s\-.])?(?:\(?\d{3}\)?[\s\-.]?)\d{3}[\s\-.]?\d{4}").ok()
});

// Area/group/serial exclusions are checked on the captures; `regex` has no look-ahead.
static NATIONAL_ID_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(\d{3})[-\s]?(\d{2})[-\s]?(\d{4})\b").ok());

static PAYMENT_CARD_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:4\d{3}|5[1-5]\d{2}|6(?:011|5\d{2})|3[47]\d{2})[\s\-]?\d{4}[\s\-]?\d{4}[\s\-]?\d{4}\b",
    )
    .ok()
});

/// Kind of personally identifiable information found in output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiKind {
    Email,
    Phone,
    NationalId,
    PaymentCard,
}

impl fmt::Display for PiiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::NationalId => "national_id",
            Self::PaymentCard => "payment_card",
        };
        f.write_str(name)
    }
}

/// Case-insensitive substring check.
#[must_use]
pub fn contains_text(output: &str, expected: &str) -> bool {
    output.to_lowercase().contains(&expected.to_lowercase())
}

/// Look for evidence that `tool_name` was called.
///
/// Structured JSON shapes are tried first (`tool`, `function.name`,
/// `tool_calls[].function.name`), then raw-text patterns (quoted key/value,
/// `name(`, `<name>`), then a whole-word mention. All text matching is
/// case-insensitive.
#[must_use]
pub fn calls_tool(output: &str, tool_name: &str) -> bool {
    if let Ok(Value::Object(parsed)) = serde_json::from_str::<Value>(output) {
        let named = |v: &Value| v.get("name").and_then(Value::as_str) == Some(tool_name);

        if parsed.get("tool").and_then(Value::as_str) == Some(tool_name) {
            return true;
        }
        if parsed.get("function").is_some_and(named) {
            return true;
        }
        if let Some(Value::Array(calls)) = parsed.get("tool_calls") {
            if calls
                .iter()
                .any(|call| call.get("function").is_some_and(named))
            {
                return true;
            }
        }
    }

    let name = regex::escape(tool_name);
    let patterns = [
        format!(r#"["']tool["']\s*:\s*["']?{name}["']?"#),
        format!(r#"["']name["']\s*:\s*["']?{name}["']?"#),
        format!(r"{name}\s*\("),
        format!(r"<{name}>"),
        format!(r"\b{name}\b"),
    ];
    patterns.iter().any(|pattern| {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .is_ok_and(|re| re.is_match(output))
    })
}

fn is_valid_national_id(caps: &Captures<'_>) -> bool {
    let part = |i: usize| caps.get(i).map_or("", |m| m.as_str());
    let area = part(1);
    area != "000" && area != "666" && !area.starts_with('9') && part(2) != "00" && part(3) != "0000"
}

fn matches(re: &LazyLock<Option<Regex>>, output: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(output))
}

/// First kind of PII found in `output`, if any.
#[must_use]
pub fn detect_pii(output: &str) -> Option<PiiKind> {
    if matches(&EMAIL_RE, output) {
        return Some(PiiKind::Email);
    }
    if matches(&PHONE_RE, output) {
        return Some(PiiKind::Phone);
    }
    if NATIONAL_ID_RE
        .as_ref()
        .is_some_and(|re| re.captures_iter(output).any(|c| is_valid_national_id(&c)))
    {
        return Some(PiiKind::NationalId);
    }
    if matches(&PAYMENT_CARD_RE, output) {
        return Some(PiiKind::PaymentCard);
    }
    None
}

/// True when no PII pattern matches.
#[must_use]
pub fn no_pii(output: &str) -> bool {
    detect_pii(output).is_none()
}

#[must_use]
pub const fn max_tokens(tokens_used: u64, limit: u64) -> bool {
    tokens_used <= limit
}

#[must_use]
pub fn max_latency(latency_ms: f64, limit_ms: f64) -> bool {
    latency_ms <= limit_ms
}

/// True when the trimmed output parses as JSON.
#[must_use]
pub fn valid_json(output: &str) -> bool {
    serde_json::from_str::<Value>(output.trim()).is_ok()
}

/// True when the trimmed output parses as JSON and conforms to `schema`.
///
/// With the `full-schema` feature the schema goes through `jsonschema`;
/// otherwise [`lightweight_schema_check`] is used.
#[must_use]
pub fn matches_schema(output: &str, schema: &Value) -> bool {
    let Ok(data) = serde_json::from_str::<Value>(output.trim()) else {
        return false;
    };
    validate_schema(&data, schema)
}

#[cfg(feature = "full-schema")]
fn validate_schema(data: &Value, schema: &Value) -> bool {
    jsonschema::validator_for(schema).is_ok_and(|validator| validator.is_valid(data))
}

#[cfg(not(feature = "full-schema"))]
fn validate_schema(data: &Value, schema: &Value) -> bool {
    lightweight_schema_check(data, schema)
}

fn has_type(data: &Value, type_name: &str) -> bool {
    match type_name {
        "object" => data.is_object(),
        "array" => data.is_array(),
        "string" => data.is_string(),
        "number" => data.is_number(),
        "integer" => data.is_i64() || data.is_u64(),
        "boolean" => data.is_boolean(),
        "null" => data.is_null(),
        _ => true,
    }
}

fn type_matches(data: &Value, schema: &Value) -> bool {
    schema
        .get("type")
        .and_then(Value::as_str)
        .is_none_or(|t| has_type(data, t))
}

/// Restricted JSON Schema validator.
///
/// Supports exactly `type` (object, array, string, number, integer,
/// boolean, null; integers satisfy `number`; unknown names are
/// unconstrained), `required`, and one level of `properties`, each checked
/// for `type` only. Everything else in the schema is ignored, so a `true`
/// here is not full JSON Schema compliance.
#[must_use]
pub fn lightweight_schema_check(data: &Value, schema: &Value) -> bool {
    if !type_matches(data, schema) {
        return false;
    }
    let Value::Object(object) = data else {
        return true;
    };

    if let Some(Value::Array(required)) = schema.get("required") {
        let missing = required
            .iter()
            .filter_map(Value::as_str)
            .any(|key| !object.contains_key(key));
        if missing {
            return false;
        }
    }

    if let Some(Value::Object(properties)) = schema.get("properties") {
        return properties.iter().all(|(name, prop_schema)| {
            object
                .get(name)
                .is_none_or(|value| type_matches(value, prop_schema))
        });
    }
    true
}

/// What a single case produced, as seen by the assertions.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub output: &'a str,
    pub tokens_used: u64,
    /// Latency reported by the response.
    pub latency_ms: f64,
    /// Measured wall-clock duration of the call.
    pub elapsed_ms: f64,
}

impl Observation<'_> {
    /// `max(reported, measured)`.
    #[must_use]
    pub fn effective_latency_ms(&self) -> f64 {
        self.latency_ms.max(self.elapsed_ms)
    }
}

/// Passed and failed labels, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssertionOutcome {
    pub passed: Vec<String>,
    pub failed: Vec<String>,
}

impl AssertionOutcome {
    fn record(&mut self, ok: bool, pass_label: String, fail_label: String) {
        if ok {
            self.passed.push(pass_label);
        } else {
            self.failed.push(fail_label);
        }
    }

    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Evaluate one assertion, appending its label(s) to `outcome`.
///
/// `no_pii: false` and `valid_json: false` add nothing.
pub fn evaluate(
    spec: AssertionSpec<'_>,
    observation: &Observation<'_>,
    outcome: &mut AssertionOutcome,
) {
    let output = observation.output;
    match spec {
        AssertionSpec::ContainsText(text) => outcome.record(
            contains_text(output, text),
            format!("contains_text: '{text}'"),
            format!("contains_text: '{text}' not found in output"),
        ),
        AssertionSpec::CallsTools(names) => {
            for name in names {
                outcome.record(
                    calls_tool(output, name),
                    format!("calls_tool: '{name}'"),
                    format!("calls_tool: '{name}' not found in output"),
                );
            }
        }
        AssertionSpec::MaxTokens(limit) => {
            let used = observation.tokens_used;
            outcome.record(
                max_tokens(used, limit),
                format!("max_tokens: {used} <= {limit}"),
                format!("max_tokens: {used} exceeds limit {limit}"),
            );
        }
        AssertionSpec::MaxLatencyMs(limit) => {
            let latency = observation.effective_latency_ms();
            outcome.record(
                max_latency(latency, limit),
                format!("max_latency_ms: {latency:.1} <= {limit:?}"),
                format!("max_latency_ms: {latency:.1} exceeds limit {limit:?}"),
            );
        }
        AssertionSpec::NoPii(true) => match detect_pii(output) {
            None => outcome.passed.push("no_pii: no PII detected".to_string()),
            Some(kind) => outcome
                .failed
                .push(format!("no_pii: PII detected in output ({kind})")),
        },
        AssertionSpec::ValidJson(true) => outcome.record(
            valid_json(output),
            "valid_json: output is valid JSON".to_string(),
            "valid_json: output is not valid JSON".to_string(),
        ),
        AssertionSpec::NoPii(false) | AssertionSpec::ValidJson(false) => {}
        AssertionSpec::MatchesSchema(schema) => outcome.record(
            matches_schema(output, schema),
            "matches_schema: output conforms to schema".to_string(),
            "matches_schema: output does not conform to schema".to_string(),
        ),
    }
}

/// Evaluate every assertion present in `behavior`.
#[must_use]
pub fn evaluate_all(
    behavior: &ExpectedBehavior,
    observation: &Observation<'_>,
) -> AssertionOutcome {
    let mut outcome = AssertionOutcome::default();
    for spec in behavior.specs() {
        evaluate(spec, observation, &mut outcome);
    }
    outcome
}
