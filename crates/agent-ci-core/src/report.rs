//! Report rendering for suite results.
//!
//! Three renderers share the [`Renderer`] trait: a console summary with
//! optional ANSI colors, pretty JSON that round-trips into [`SuiteResult`],
//! and JUnit XML for CI systems.

use crate::types::{SuiteResult, TestResult};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;
use std::fmt::{Display, Write as _};
use std::io::Write;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Errors that can occur while rendering or writing a report.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML write error: {0}")]
    Xml(String),
    #[error("report output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn xml_error(e: impl Display) -> ReportError {
    ReportError::Xml(e.to_string())
}

/// Format for report output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Junit,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "junit" => Ok(Self::Junit),
            _ => Err(format!(
                "unknown format: {s}. Valid formats: text, json, junit"
            )),
        }
    }
}

/// Turns a [`SuiteResult`] into a report.
pub trait Renderer {
    /// Render the whole report.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    fn render(&self, suite: &SuiteResult) -> Result<String, ReportError>;

    /// Render and write the report to `sink`, newline-terminated.
    ///
    /// # Errors
    /// Returns an error if rendering or writing fails.
    fn write_to(&self, suite: &SuiteResult, sink: &mut dyn Write) -> Result<(), ReportError> {
        let mut output = self.render(suite)?;
        if !output.ends_with('\n') {
            output.push('\n');
        }
        sink.write_all(output.as_bytes())?;
        sink.flush()?;
        Ok(())
    }
}

/// Human-readable summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleRenderer {
    pub color: bool,
}

impl ConsoleRenderer {
    #[must_use]
    pub const fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if self.color {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn result_lines(&self, out: &mut String, result: &TestResult) {
        let status = if result.passed() {
            self.paint("PASS", GREEN)
        } else {
            self.paint("FAIL", RED)
        };
        let _ = writeln!(
            out,
            "  [{status}] {} ({:.1} ms)",
            result.test_case_name(),
            result.duration_ms()
        );

        let (labels, marker, code) = if result.passed() {
            (result.assertions_passed(), "v", DIM)
        } else {
            (result.assertions_failed(), "x", RED)
        };
        for label in labels {
            let _ = writeln!(out, "        {}", self.paint(&format!("{marker} {label}"), code));
        }
    }
}

impl Renderer for ConsoleRenderer {
    fn render(&self, suite: &SuiteResult) -> Result<String, ReportError> {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}",
            self.paint(&format!("Test Suite: {}", suite.suite_name()), BOLD)
        );
        let _ = writeln!(out, "{}", self.paint(&"=".repeat(60), DIM));

        for result in suite.results() {
            self.result_lines(&mut out, result);
        }

        let _ = writeln!(out, "{}", self.paint(&"-".repeat(60), DIM));
        let failed_code = if suite.failed() > 0 { RED } else { GREEN };
        let _ = write!(
            out,
            "Results: {} passed, {} failed, {} total ({})",
            self.paint(&suite.passed().to_string(), GREEN),
            self.paint(&suite.failed().to_string(), failed_code),
            self.paint(&suite.total().to_string(), CYAN),
            self.paint(&format!("{:.1} ms", suite.duration_ms()), DIM),
        );
        Ok(out)
    }
}

/// Pretty-printed JSON of the whole [`SuiteResult`].
#[derive(Debug, Clone, Copy)]
pub struct JsonRenderer {
    pub indent: usize,
}

impl Default for JsonRenderer {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

impl Renderer for JsonRenderer {
    fn render(&self, suite: &SuiteResult) -> Result<String, ReportError> {
        let indent = " ".repeat(self.indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        suite.serialize(&mut serializer)?;
        Ok(String::from_utf8(buf)?)
    }
}

/// JUnit XML with one `<testsuite>` inside `<testsuites>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JunitRenderer {
    /// Fixed `timestamp` attribute; the current time when unset.
    pub timestamp: Option<OffsetDateTime>,
}

fn seconds(ms: f64) -> String {
    format!("{:.3}", ms / 1000.0)
}

fn failure_body(result: &TestResult) -> String {
    let mut body = format!("Actual output:\n{}\n\nFailed assertions:", result.actual_output());
    for label in result.assertions_failed() {
        let _ = write!(body, "\n  - {label}");
    }
    body
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    start: BytesStart<'_>,
    tag: &str,
    text: &str,
) -> Result<(), ReportError> {
    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(xml_error)
}

impl JunitRenderer {
    fn write_case(
        writer: &mut Writer<Vec<u8>>,
        suite_name: &str,
        result: &TestResult,
    ) -> Result<(), ReportError> {
        let time = seconds(result.duration_ms());
        let mut case = BytesStart::new("testcase");
        case.push_attribute(("name", result.test_case_name()));
        case.push_attribute(("classname", suite_name));
        case.push_attribute(("time", time.as_str()));
        writer.write_event(Event::Start(case)).map_err(xml_error)?;

        if result.passed() {
            let text = result.assertions_passed().join("\n");
            write_text_element(writer, BytesStart::new("system-out"), "system-out", &text)?;
        } else {
            let message = result.assertions_failed().join("; ");
            let mut failure = BytesStart::new("failure");
            failure.push_attribute(("message", message.as_str()));
            failure.push_attribute(("type", "AssertionError"));
            write_text_element(writer, failure, "failure", &failure_body(result))?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("testcase")))
            .map_err(xml_error)
    }
}

impl Renderer for JunitRenderer {
    fn render(&self, suite: &SuiteResult) -> Result<String, ReportError> {
        let timestamp = self
            .timestamp
            .unwrap_or_else(OffsetDateTime::now_utc)
            .format(&Rfc3339)
            .map_err(xml_error)?;
        let tests = suite.total().to_string();
        let failures = suite.failed().to_string();
        let time = seconds(suite.duration_ms());

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        writer
            .write_event(Event::Start(BytesStart::new("testsuites")))
            .map_err(xml_error)?;

        let mut testsuite = BytesStart::new("testsuite");
        testsuite.push_attribute(("name", suite.suite_name()));
        testsuite.push_attribute(("tests", tests.as_str()));
        testsuite.push_attribute(("failures", failures.as_str()));
        testsuite.push_attribute(("errors", "0"));
        testsuite.push_attribute(("time", time.as_str()));
        testsuite.push_attribute(("timestamp", timestamp.as_str()));
        writer
            .write_event(Event::Start(testsuite))
            .map_err(xml_error)?;

        for result in suite.results() {
            Self::write_case(&mut writer, suite.suite_name(), result)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("testsuite")))
            .map_err(xml_error)?;
        writer
            .write_event(Event::End(BytesEnd::new("testsuites")))
            .map_err(xml_error)?;

        Ok(String::from_utf8(writer.into_inner())?)
    }
}

/// Renderer for `format`. `color` only affects [`ReportFormat::Text`].
#[must_use]
pub fn renderer_for(format: ReportFormat, color: bool) -> Box<dyn Renderer> {
    match format {
        ReportFormat::Text => Box::new(ConsoleRenderer::new(color)),
        ReportFormat::Json => Box::new(JsonRenderer::default()),
        ReportFormat::Junit => Box::new(JunitRenderer::default()),
    }
}
