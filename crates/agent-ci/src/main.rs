//! agent-ci CLI - Deterministic test runner for conversational agents.

use agent_ci_core::{
    ConfigOverrides, Preset, ProgressEvent, ReportError, ReportFormat, Reporter, ReporterConfig,
    RunConfig, SourceConfig, TestCase, apply_overrides, load_source_config, load_tests,
    preset_config, renderer_for, run_suite_with_progress,
};
use clap::{Args, Parser, Subcommand};
use comfy_table::{Cell, Color, Table};
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const FAILURE: u8 = 1;
}

/// How long blocking workers left behind by a suite timeout may delay exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

const SAMPLE_TESTS_YAML: &str = include_str!("../templates/sample_tests.yaml");
const SAMPLE_MOCK_YAML: &str = include_str!("../templates/mock_config.yaml");

#[derive(Parser)]
#[command(name = "agent-ci")]
#[command(about = "Deterministic test runner for conversational agents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run agent test cases in TEST_DIR
    Test(TestArgs),
    /// Validate test YAML files without running them
    Validate(ValidateArgs),
    /// Create an example test directory with sample cases and a mock config
    Init(InitArgs),
}

#[derive(Args)]
struct TestArgs {
    /// Directory containing test YAML files
    #[arg(value_name = "TEST_DIR", default_value = "tests/")]
    test_dir: PathBuf,

    /// Path to a YAML scripted-source configuration file
    #[arg(long, value_name = "FILE")]
    mock_config: Option<PathBuf>,

    /// Built-in source preset: openai, anthropic
    #[arg(long, conflicts_with = "mock_config")]
    preset: Option<String>,

    /// Simulated failure rate for --preset, in [0, 1]
    #[arg(long, requires = "preset")]
    failure_rate: Option<f64>,

    /// Suite timeout in seconds
    #[arg(long, default_value_t = 30.0)]
    timeout: f64,

    /// Output format: text, json, junit
    #[arg(long, default_value = "text")]
    output: String,

    /// Run test cases in parallel
    #[arg(long)]
    parallel: bool,

    /// Maximum concurrent cases in parallel mode (default: CPU count)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Seed forwarded to the source's failure injection
    #[arg(long)]
    seed: Option<u64>,

    /// Write the report to FILE instead of stdout
    #[arg(long, value_name = "FILE")]
    out_file: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Stream per-test progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args)]
struct ValidateArgs {
    /// Directory containing test YAML files
    #[arg(value_name = "TEST_DIR")]
    test_dir: PathBuf,

    /// Exit with code 1 if any validation warnings are found
    #[arg(long)]
    strict: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Args)]
struct InitArgs {
    /// Directory to create
    #[arg(value_name = "DIRECTORY", default_value = "agent-tests")]
    directory: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    force: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = matches!(&cli.command, Command::Test(args) if args.verbose);
    init_tracing(verbose);

    match cli.command {
        Command::Test(args) => run_test_command(&args),
        Command::Validate(args) => validate_command(&args),
        Command::Init(args) => init_command(&args),
    }
}

fn run_test_command(args: &TestArgs) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            Reporter::new(ReporterConfig {
                verbose: false,
                color: !args.no_color && io::stderr().is_terminal(),
            })
            .error(&format!("Failed to start async runtime: {e}"));
            return ExitCode::from(exit_code::FAILURE);
        }
    };
    let code = runtime.block_on(test_command(args));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    code
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "warn,agent_ci_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn resolve_source_config(args: &TestArgs) -> Result<Option<SourceConfig>, String> {
    if let Some(path) = &args.mock_config {
        return load_source_config(path)
            .map(Some)
            .map_err(|e| format!("Failed to load mock config: {e}"));
    }
    let Some(name) = &args.preset else {
        return Ok(None);
    };
    let preset: Preset = name.parse()?;
    preset_config(preset, None, args.failure_rate.unwrap_or(0.0))
        .map(Some)
        .map_err(|e| format!("Invalid preset config: {e}"))
}

async fn test_command(args: &TestArgs) -> ExitCode {
    let color = !args.no_color && args.out_file.is_none() && io::stdout().is_terminal();
    let reporter = Reporter::new(ReporterConfig {
        verbose: args.verbose,
        color: !args.no_color && io::stderr().is_terminal(),
    });

    let format: ReportFormat = match args.output.parse() {
        Ok(f) => f,
        Err(e) => {
            reporter.error(&format!("Invalid output format: {e}"));
            return ExitCode::from(exit_code::FAILURE);
        }
    };

    let source_config = match resolve_source_config(args) {
        Ok(config) => config,
        Err(e) => {
            reporter.error(&e);
            return ExitCode::from(exit_code::FAILURE);
        }
    };

    let overrides = ConfigOverrides {
        source_config,
        timeout_seconds: Some(args.timeout),
        parallel: Some(args.parallel),
        concurrency: args.concurrency,
        seed: args.seed,
    };
    let config = apply_overrides(RunConfig::new(&args.test_dir), &overrides);
    tracing::debug!(
        test_dir = %config.test_dir.display(),
        parallel = config.parallel,
        timeout_seconds = config.timeout_seconds,
        "resolved run config"
    );

    // Progress lines only in verbose mode; the report itself is the default output
    let (progress_tx, progress_handle) = if args.verbose {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
        let printer = reporter.clone();
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                printer.handle(&event);
                printer.flush();
            }
        });
        (Some(tx), Some(handle))
    } else {
        (None, None)
    };

    let result = run_suite_with_progress(&config, progress_tx).await;
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    let suite = match result {
        Ok(suite) => suite,
        Err(e) => {
            reporter.error(&format!("Test run failed: {e}"));
            return ExitCode::from(exit_code::FAILURE);
        }
    };

    let renderer = renderer_for(format, color);
    let written = match &args.out_file {
        Some(path) => fs::File::create(path)
            .map_err(ReportError::from)
            .and_then(|mut file| renderer.write_to(&suite, &mut file)),
        None => renderer.write_to(&suite, &mut io::stdout().lock()),
    };
    if let Err(e) = written {
        reporter.error(&format!("Failed to write report: {e}"));
        return ExitCode::from(exit_code::FAILURE);
    }

    if suite.all_passed() {
        ExitCode::from(exit_code::SUCCESS)
    } else {
        ExitCode::from(exit_code::FAILURE)
    }
}

fn case_warnings(cases: &[TestCase]) -> Vec<String> {
    let mut warnings = Vec::new();
    for case in cases {
        if case.expected_behavior.is_empty() {
            warnings.push(format!(
                "Test '{}' has no expected_behavior, it will always pass.",
                case.name
            ));
        }
        if case.input_messages.is_empty() {
            warnings.push(format!("Test '{}' has no input_messages.", case.name));
        }
    }
    warnings
}

fn print_cases_table(cases: &[TestCase]) {
    let mut table = Table::new();
    table.set_header(vec!["Test", "Messages", "Assertions", "Tags"]);

    for case in cases {
        let assertions = case.expected_behavior.specs().len();
        let assertions_cell = if assertions == 0 {
            Cell::new(assertions).fg(Color::Yellow)
        } else {
            Cell::new(assertions)
        };
        let tags: Vec<&str> = case.tags.iter().map(String::as_str).collect();

        table.add_row(vec![
            Cell::new(&case.name),
            Cell::new(case.input_messages.len()),
            assertions_cell,
            Cell::new(tags.join(", ")),
        ]);
    }

    println!("{table}");
}

fn validate_command(args: &ValidateArgs) -> ExitCode {
    let reporter = Reporter::new(ReporterConfig {
        verbose: false,
        color: !args.no_color && io::stderr().is_terminal(),
    });

    let cases = match load_tests(&args.test_dir) {
        Ok(cases) => cases,
        Err(e) => {
            reporter.error(&format!("Validation failed: {e}"));
            return ExitCode::from(exit_code::FAILURE);
        }
    };

    if cases.is_empty() {
        reporter.warn(&format!(
            "no test cases found in '{}'",
            args.test_dir.display()
        ));
        return if args.strict {
            ExitCode::from(exit_code::FAILURE)
        } else {
            ExitCode::from(exit_code::SUCCESS)
        };
    }

    print_cases_table(&cases);

    let warnings = case_warnings(&cases);
    for warning in &warnings {
        reporter.warn(warning);
    }

    if warnings.is_empty() {
        println!("OK {} test case(s) validated successfully.", cases.len());
    } else {
        println!(
            "{} test case(s) found: {} warning(s).",
            cases.len(),
            warnings.len()
        );
    }

    if args.strict && !warnings.is_empty() {
        ExitCode::from(exit_code::FAILURE)
    } else {
        ExitCode::from(exit_code::SUCCESS)
    }
}

fn write_scaffold_file(path: &Path, content: &str, force: bool) -> io::Result<()> {
    if path.exists() && !force {
        println!(
            "  skip  {} (already exists, use --force to overwrite)",
            path.display()
        );
        return Ok(());
    }
    fs::write(path, content)?;
    println!("  create  {}", path.display());
    Ok(())
}

fn init_command(args: &InitArgs) -> ExitCode {
    let reporter = Reporter::new(ReporterConfig {
        verbose: false,
        color: io::stderr().is_terminal(),
    });

    let tests_dir = args.directory.join("tests");
    if let Err(e) = fs::create_dir_all(&tests_dir) {
        reporter.error(&format!(
            "Failed to create directory {}: {e}",
            tests_dir.display()
        ));
        return ExitCode::from(exit_code::FAILURE);
    }

    let tests_file = tests_dir.join("sample_tests.yaml");
    let mock_file = args.directory.join("mock_config.yaml");

    for (path, content) in [
        (&tests_file, SAMPLE_TESTS_YAML),
        (&mock_file, SAMPLE_MOCK_YAML),
    ] {
        if let Err(e) = write_scaffold_file(path, content, args.force) {
            reporter.error(&format!("Failed to write {}: {e}", path.display()));
            return ExitCode::from(exit_code::FAILURE);
        }
    }

    println!(
        "\nInitialized test directory at '{}'.\nRun tests with:\n  agent-ci test {} --mock-config {}",
        args.directory.display(),
        tests_dir.display(),
        mock_file.display()
    );
    ExitCode::from(exit_code::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_templates_load() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        fs::write(dir.path().join("sample_tests.yaml"), SAMPLE_TESTS_YAML)?;
        let cases = load_tests(dir.path())?;
        assert_eq!(cases.len(), 5);
        assert!(case_warnings(&cases).is_empty());

        let mock = dir.path().join("mock.yaml");
        fs::write(&mock, SAMPLE_MOCK_YAML)?;
        let config = load_source_config(&mock)?;
        assert_eq!(config.model_name, "mock-gpt-4o");
        assert_eq!(config.responses.len(), 4);
        Ok(())
    }

    #[test]
    fn test_case_warnings() {
        let case = TestCase::new("bare");
        let warnings = case_warnings(&[case]);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("no expected_behavior"));
        assert!(warnings[1].contains("no input_messages"));
    }
}
