use std::env;
use std::path::PathBuf;
use std::process::{Command, ExitCode};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

const SMOKE_DIR: &str = "target/xtask-smoke";

#[derive(Parser)]
#[command(name = "xtask", about = "Build tasks for agent-ci")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cargo fmt --check
    Fmt,
    /// Run cargo check (default and lightweight-schema feature sets)
    Check,
    /// Run cargo clippy
    Clippy,
    /// Run cargo deny
    Deny,
    /// Run cargo test
    Test,
    /// Scaffold a sample suite with agent-ci init and run it
    Smoke,
    /// Run all CI checks (fmt, check, clippy, deny, test, smoke)
    Ci,
    /// Build release and install to ~/.agent-ci/bin/
    Install,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:?}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Fmt => cmd_fmt(),
        Commands::Check => cmd_check(),
        Commands::Clippy => cmd_clippy(),
        Commands::Deny => cmd_deny(),
        Commands::Test => cmd_test(),
        Commands::Smoke => cmd_smoke(),
        Commands::Ci => cmd_ci(),
        Commands::Install => cmd_install(),
    }
}

fn cmd_fmt() -> Result<()> {
    cargo(&["fmt", "--all", "--check"])
}

fn cmd_check() -> Result<()> {
    cargo(&["check", "--workspace", "--all-targets"])?;
    cargo(&[
        "check",
        "-p",
        "agent-ci-core",
        "--all-targets",
        "--no-default-features",
    ])
}

fn cmd_clippy() -> Result<()> {
    cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])
}

fn cmd_deny() -> Result<()> {
    cargo(&["deny", "check"])
}

fn cmd_test() -> Result<()> {
    cargo(&["test", "--workspace"])?;
    cargo(&["test", "-p", "agent-ci-core", "--no-default-features"])
}

fn cmd_smoke() -> Result<()> {
    let dir = PathBuf::from(SMOKE_DIR);
    let tests = dir.join("tests").to_string_lossy().into_owned();
    let mock = dir.join("mock_config.yaml").to_string_lossy().into_owned();
    let junit = dir.join("junit.xml").to_string_lossy().into_owned();

    cargo(&["run", "-p", "agent-ci", "--", "init", SMOKE_DIR, "--force"])?;
    cargo(&["run", "-p", "agent-ci", "--", "validate", &tests, "--strict"])?;
    cargo(&[
        "run",
        "-p",
        "agent-ci",
        "--",
        "test",
        &tests,
        "--mock-config",
        &mock,
        "--output",
        "junit",
        "--out-file",
        &junit,
    ])
}

fn cmd_ci() -> Result<()> {
    cmd_fmt()?;
    cmd_check()?;
    cmd_clippy()?;
    cmd_deny()?;
    cmd_test()?;
    cmd_smoke()?;
    Ok(())
}

fn cmd_install() -> Result<()> {
    cargo(&["build", "--release", "-p", "agent-ci"])?;

    let home = env::var_os("HOME").context("HOME environment variable not set")?;
    let bin_dir = PathBuf::from(home).join(".agent-ci/bin");

    std::fs::create_dir_all(&bin_dir)
        .with_context(|| format!("Failed to create directory: {}", bin_dir.display()))?;

    let src = PathBuf::from("target/release").join("agent-ci");
    let dst = bin_dir.join("agent-ci");
    std::fs::copy(&src, &dst)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;
    println!("Installed: {}", dst.display());

    println!();
    println!("Add to shell profile:");
    println!("  export PATH={}:$PATH", bin_dir.display());

    Ok(())
}

fn cargo(args: &[&str]) -> Result<()> {
    exec("cargo", args)
}

fn exec(program: &str, args: &[&str]) -> Result<()> {
    let cmd_line = format!("{program} {}", args.join(" "));
    eprintln!("$ {cmd_line}");

    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("Failed to execute: {cmd_line}"))?;

    if !status.success() {
        let code_info = match status.code() {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        };
        bail!("{cmd_line}: {code_info}");
    }
    Ok(())
}
