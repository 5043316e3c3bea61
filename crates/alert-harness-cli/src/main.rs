// crates/alert-harness-cli/src/main.rs
// ============================================================================
// Module: Alert Harness CLI Entry Point
// Description: Command dispatcher for alert test runs and telemetry tooling.
// Purpose: Run alert test cases against a provisioned stack from the shell.
// Dependencies: alert-harness-core, alert-harness-config, clap, thiserror, tokio
// ============================================================================

//! ## Overview
//! The alert harness CLI provisions (or reuses) the container stack, runs
//! alert test case files through the orchestrator, and exposes the offline
//! helpers used when authoring cases: label fingerprints and series expansion.
//! Logs go to stderr through `tracing`; results go to stdout.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use alert_harness_config::HarnessConfig;
use alert_harness_core::AlertTestCase;
use alert_harness_core::TestEnvironment;
use alert_harness_core::telemetry::fingerprint_pairs;
use alert_harness_core::telemetry::load_series_file;
use alert_harness_core::telemetry::now_millis;
use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "alert-harness", version, disable_help_subcommand = true)]
struct Cli {
    /// Harness config file (defaults to `ALERT_HARNESS_CONFIG` when set).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Keep containers and the resource cache for the next run.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    reuse: bool,
    /// Release cached resources instead of running anything.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    teardown: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run alert test case files against the stack.
    Run(RunCommand),
    /// Remove every cached resource left by earlier `--reuse` runs.
    Teardown,
    /// Print the fingerprint of a label set.
    Fingerprint(FingerprintCommand),
    /// Print the samples a series file expands to, one JSON object per line.
    Expand(ExpandCommand),
}

/// Configuration for the `run` command.
#[derive(Args, Debug)]
struct RunCommand {
    /// Alert test case files (JSON).
    #[arg(value_name = "CASE", required = true)]
    cases: Vec<PathBuf>,
    /// Stop at the first failing case.
    #[arg(long, action = ArgAction::SetTrue)]
    fail_fast: bool,
}

/// Configuration for the `fingerprint` command.
#[derive(Args, Debug)]
struct FingerprintCommand {
    /// Labels as `key=value`.
    #[arg(value_name = "LABEL")]
    labels: Vec<String>,
}

/// Configuration for the `expand` command.
#[derive(Args, Debug)]
struct ExpandCommand {
    /// Series file (one JSON object per line).
    #[arg(value_name = "PATH")]
    series: PathBuf,
    /// Injection time in UTC milliseconds (defaults to now).
    #[arg(long, value_name = "MS")]
    now_ms: Option<i64>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable message.
    message: String,
}

impl CliError {
    /// Creates a new CLI error.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// Result alias for CLI operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(_) | Commands::Teardown if cli.teardown => {
            let config = load_config(cli.config.as_deref(), true, true)?;
            command_teardown(config).await
        }
        Commands::Run(command) => {
            let config = load_config(cli.config.as_deref(), cli.reuse, false)?;
            command_run(config, command).await
        }
        Commands::Teardown => {
            let config = load_config(cli.config.as_deref(), true, true)?;
            command_teardown(config).await
        }
        Commands::Fingerprint(command) => command_fingerprint(&command),
        Commands::Expand(command) => command_expand(&command),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Loads config and applies lifecycle flags from the command line.
fn load_config(path: Option<&Path>, reuse: bool, teardown_only: bool) -> CliResult<HarnessConfig> {
    let mut config =
        HarnessConfig::load(path).map_err(|err| CliError::new(format!("config: {err}")))?;
    config.lifecycle.reuse |= reuse;
    config.lifecycle.teardown_only |= teardown_only;
    Ok(config)
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs every case and reports a pass/fail line for each.
async fn command_run(config: HarnessConfig, command: RunCommand) -> CliResult<ExitCode> {
    let cases = command
        .cases
        .iter()
        .map(|path| {
            AlertTestCase::from_file(path)
                .map_err(|err| CliError::new(format!("{}: {err}", path.display())))
        })
        .collect::<CliResult<Vec<_>>>()?;

    let mut environment = TestEnvironment::provision(config)
        .await
        .map_err(|err| CliError::new(format!("provisioning failed: {err}")))?;
    let mut orchestrator = match environment.orchestrator().await {
        Ok(orchestrator) => orchestrator,
        Err(err) => {
            environment.teardown().await;
            return Err(CliError::new(format!("session setup failed: {err}")));
        }
    };

    let mut failed = 0_usize;
    for case in &cases {
        match orchestrator.run_case(case).await {
            Ok(outcome) => {
                info!(case = %outcome.case, alerts = outcome.observed_alerts.len(), "case passed");
                write_line(&format!("PASS {}", outcome.case))?;
            }
            Err(err) => {
                failed += 1;
                warn!(case = %case.name, kind = err.kind().as_str(), "case failed");
                write_line(&format!("FAIL {}\n{err}", case.name))?;
                if command.fail_fast {
                    break;
                }
            }
        }
    }
    orchestrator.cleanup().await;
    environment.teardown().await;

    write_line(&format!("{} passed, {failed} failed", cases.len().saturating_sub(failed)))?;
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Releases every cached resource.
async fn command_teardown(config: HarnessConfig) -> CliResult<ExitCode> {
    let mut environment = TestEnvironment::provision(config)
        .await
        .map_err(|err| CliError::new(format!("teardown failed: {err}")))?;
    environment.teardown().await;
    Ok(ExitCode::SUCCESS)
}

fn command_fingerprint(command: &FingerprintCommand) -> CliResult<ExitCode> {
    let labels = parse_labels(&command.labels)?;
    let fingerprint =
        fingerprint_pairs(labels.iter().map(|(key, value)| (key.as_str(), value.as_str())));
    write_line(&fingerprint.text)?;
    Ok(ExitCode::SUCCESS)
}

fn command_expand(command: &ExpandCommand) -> CliResult<ExitCode> {
    let now_ms = command.now_ms.unwrap_or_else(now_millis);
    let series = load_series_file(&command.series)
        .map_err(|err| CliError::new(format!("{}: {err}", command.series.display())))?;
    for entry in &series {
        let points = entry.expand(now_ms).map_err(|err| CliError::new(err.to_string()))?;
        for point in &points {
            let line =
                serde_json::to_string(point).map_err(|err| CliError::new(err.to_string()))?;
            write_line(&line)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses `key=value` labels. Keys must be non-empty; values may be empty.
fn parse_labels(raw: &[String]) -> CliResult<Vec<(String, String)>> {
    raw.iter()
        .map(|entry| {
            let Some((key, value)) = entry.split_once('=') else {
                return Err(CliError::new(format!("label must be key=value: {entry}")));
            };
            if key.trim().is_empty() {
                return Err(CliError::new(format!("label key must not be empty: {entry}")));
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

fn write_line(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(format!("stdout: {err}")))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
