// crates/sitedocs-conformance-cli/src/main.rs
// ============================================================================
// Module: SiteDocs Conformance CLI Entry Point
// Description: Command dispatcher for conformance runs and ad-hoc requests.
// Purpose: Run the case catalog, inspect it, and probe single endpoints.
// Dependencies: clap, reqwest, serde, serde_jcs, sitedocs-conformance-core, tokio
// ============================================================================

//! ## Overview
//! `sitedocs-conformance` runs the conformance catalog against a configured
//! SiteDocs environment and reports per-case outcomes. Mutating cases change
//! shared remote state and restore it afterwards, so two runs must never
//! target the same environment at the same time.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use sitedocs_conformance_core::ApiClient;
use sitedocs_conformance_core::ApiRequest;
use sitedocs_conformance_core::ConformanceConfig;
use sitedocs_conformance_core::Credential;
use sitedocs_conformance_core::Endpoint;
use sitedocs_conformance_core::FixtureSet;
use sitedocs_conformance_core::RetryPolicy;
use sitedocs_conformance_core::SuiteContext;
use sitedocs_conformance_core::SuiteRunner;
use sitedocs_conformance_core::client::ResponseBody;
use sitedocs_conformance_core::logging;
use sitedocs_conformance_core::report::ReportWriter;
use sitedocs_conformance_core::suite::CaseFilter;
use sitedocs_conformance_core::suite::Group;
use sitedocs_conformance_core::suite::runner::CaseOutcome;
use sitedocs_conformance_core::suite::runner::CaseReport;
use sitedocs_conformance_core::suite::runner::SuiteReport;
use thiserror::Error;
use tracing::info;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a request body file.
const MAX_BODY_BYTES: u64 = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "sitedocs-conformance",
    version,
    about = "Conformance checks for the SiteDocs HTTP API",
    after_help = "Runs mutate shared remote state; do not run two suites against the same \
                  environment concurrently."
)]
struct Cli {
    /// Selected subcommand.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the conformance catalog.
    Run(RunArgs),
    /// List catalog cases.
    List(ListArgs),
    /// Issue a single request and print the response.
    Request(RequestArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load config and fixtures and print a summary.
    Validate(ConfigArgs),
}

/// Shared config location argument.
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// TOML config file or legacy `Configuration/` directory.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunArgs {
    /// Config location.
    #[command(flatten)]
    config: ConfigArgs,
    /// Restrict to a group (repeatable).
    #[arg(long = "group", value_name = "GROUP", value_parser = parse_group)]
    groups: Vec<Group>,
    /// Restrict to cases whose name contains this text.
    #[arg(long, value_name = "TEXT")]
    filter: Option<String>,
    /// Directory for summary and transcript artifacts.
    #[arg(long = "report-dir", value_name = "DIR")]
    report_dir: Option<PathBuf>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Run every case once, ignoring the configured retry policy.
    #[arg(long = "no-retry")]
    no_retry: bool,
    /// Skip cases that mutate remote state.
    #[arg(long = "read-only")]
    read_only: bool,
}

/// Arguments for `list`.
#[derive(Args, Debug)]
struct ListArgs {
    /// Restrict to a group (repeatable).
    #[arg(long = "group", value_name = "GROUP", value_parser = parse_group)]
    groups: Vec<Group>,
    /// Skip cases that mutate remote state.
    #[arg(long = "read-only")]
    read_only: bool,
}

/// Arguments for `request`.
#[derive(Args, Debug)]
struct RequestArgs {
    /// Config location.
    #[command(flatten)]
    config: ConfigArgs,
    /// HTTP method.
    #[arg(value_name = "METHOD", value_parser = parse_method)]
    method: Method,
    /// Endpoint path relative to the base URL, e.g. `/workers/123`.
    #[arg(value_name = "PATH", value_parser = parse_endpoint)]
    endpoint: Endpoint,
    /// Query parameter as `key=value` (repeatable).
    #[arg(long = "query", value_name = "KEY=VALUE", value_parser = parse_query_pair)]
    query: Vec<(String, String)>,
    /// JSON body file.
    #[arg(long, value_name = "FILE")]
    body: Option<PathBuf>,
    /// Send the invalid sentinel key instead of the configured one.
    #[arg(long)]
    sentinel: bool,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Output formats for reports.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Canonical JSON.
    Json,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a rendered message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    logging::init();
    match cli.command {
        Commands::Run(args) => command_run(args).await,
        Commands::List(args) => command_list(&args),
        Commands::Request(args) => command_request(args).await,
        Commands::Config {
            command: ConfigCommand::Validate(args),
        } => command_config_validate(&args),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs the selected cases and reports outcomes.
async fn command_run(args: RunArgs) -> CliResult<ExitCode> {
    let config = load_config(&args.config)?;
    info!(source = %config.source, base_url = %config.base_url, "configuration loaded");
    let retry = if args.no_retry { RetryPolicy::none() } else { config.retry };
    let context = SuiteContext::from_config(&config)
        .map_err(|err| CliError::new(format!("setup failed: {err}")))?;
    let filter = CaseFilter {
        groups: args.groups,
        name_contains: args.filter,
        read_only: args.read_only,
    };
    let runner = SuiteRunner::new(context, retry).with_filter(filter);
    if runner.selected().is_empty() {
        return Err(CliError::new("no cases match the selection"));
    }

    let report = runner.run().await;

    if let Some(dir) = &args.report_dir {
        let writer = ReportWriter::new(dir).map_err(|err| CliError::new(err.to_string()))?;
        writer
            .write_run(&report, &runner.context().client.transcript())
            .map_err(|err| CliError::new(err.to_string()))?;
    }

    match args.format {
        OutputFormat::Text => {
            for case in &report.cases {
                write_line(&case_line(case))?;
            }
            write_line(&totals_line(&report))?;
        }
        OutputFormat::Json => write_line(&canonical_json(&report)?)?,
    }
    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Prints the catalog.
fn command_list(args: &ListArgs) -> CliResult<ExitCode> {
    let filter = CaseFilter {
        groups: args.groups.clone(),
        name_contains: None,
        read_only: args.read_only,
    };
    for case in filter.select() {
        let marker = if case.mutates { " (mutating)" } else { "" };
        write_line(&format!("{}::{}{marker}", case.group, case.name))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Issues one request and prints the response.
async fn command_request(args: RequestArgs) -> CliResult<ExitCode> {
    let config = load_config(&args.config)?;
    let client = ApiClient::from_config(&config).map_err(|err| CliError::new(err.to_string()))?;
    let mut request = ApiRequest::new(args.method, args.endpoint);
    for (key, value) in args.query {
        request = request.with_query(key, value);
    }
    if let Some(path) = &args.body {
        request = request.with_body(read_json_body(path)?);
    }
    if args.sentinel {
        request = request.with_credential(Credential::Sentinel);
    }

    let response = client.send(&request).await.map_err(|err| CliError::new(err.to_string()))?;
    let output = RequestOutput {
        status: response.status.as_u16(),
        content_type: response.content_type().map(str::to_string),
        body: body_value(&response.body),
    };
    match args.format {
        OutputFormat::Text => {
            write_line(&format!("status: {}", output.status))?;
            write_line(&format!("content-type: {}", output.content_type.as_deref().unwrap_or("-")))?;
            let rendered = serde_json::to_string_pretty(&output.body)
                .map_err(|err| CliError::new(format!("failed to render body: {err}")))?;
            write_line(&rendered)?;
        }
        OutputFormat::Json => write_line(&canonical_json(&output)?)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Validates config and fixtures without issuing requests.
fn command_config_validate(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let fixtures = FixtureSet::load(&config.fixtures_dir)
        .map_err(|err| CliError::new(format!("fixtures invalid: {err}")))?;
    for line in validation_summary(&config, &fixtures) {
        write_line(&line)?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Response rendering for `request`.
#[derive(Debug, Serialize)]
struct RequestOutput {
    /// HTTP status code.
    status: u16,
    /// Media type, when present.
    content_type: Option<String>,
    /// Body as JSON; text and binary bodies are summarized.
    body: Value,
}

/// Converts a response body into printable JSON.
fn body_value(body: &ResponseBody) -> Value {
    match body {
        ResponseBody::Empty => Value::Null,
        ResponseBody::Json(value) => value.clone(),
        ResponseBody::Text(text) => Value::String(text.clone()),
        ResponseBody::Binary(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}

/// One line per case for text output.
fn case_line(case: &CaseReport) -> String {
    let attempts = if case.attempts == 1 { "attempt" } else { "attempts" };
    let head = format!(
        "{} {}::{} ({} {attempts}, {} ms)",
        outcome_label(&case.outcome),
        case.group,
        case.name,
        case.attempts,
        case.duration_ms
    );
    match &case.outcome {
        CaseOutcome::Passed => head,
        CaseOutcome::Failed {
            error,
        } => format!("{head}: {error}"),
        CaseOutcome::Skipped {
            reason,
        } => format!("{head}: {reason}"),
    }
}

/// Short label for an outcome.
const fn outcome_label(outcome: &CaseOutcome) -> &'static str {
    match outcome {
        CaseOutcome::Passed => "PASS",
        CaseOutcome::Failed {
            ..
        } => "FAIL",
        CaseOutcome::Skipped {
            ..
        } => "SKIP",
    }
}

/// Totals line for text output.
fn totals_line(report: &SuiteReport) -> String {
    format!(
        "{} passed, {} failed, {} skipped in {} ms",
        report.passed, report.failed, report.skipped, report.duration_ms
    )
}

/// Summary lines for `config validate`. The API key is never printed.
fn validation_summary(config: &ConformanceConfig, fixtures: &FixtureSet) -> Vec<String> {
    let optional = [
        ("locationPatch.json", fixtures.location_patch.is_some()),
        ("workerStatus.json", fixtures.worker_status.is_some()),
        ("locationStatus.json", fixtures.location_status.is_some()),
        ("locationWorker.json", fixtures.location_worker.is_some()),
    ];
    let present: Vec<&str> =
        optional.iter().filter(|(_, found)| *found).map(|(name, _)| *name).collect();
    vec![
        format!("source: {}", config.source),
        format!("base_url: {}", config.base_url),
        format!("fixtures_dir: {}", config.fixtures_dir.display()),
        format!("worker_id: {}", fixtures.ids.worker_id),
        format!("location_id: {}", fixtures.ids.location_id),
        format!("form_id: {}", fixtures.ids.form_id),
        format!(
            "optional fixtures: {}",
            if present.is_empty() { "none".to_string() } else { present.join(", ") }
        ),
        format!("retry: {} retries, {} ms delay", config.retry.retries, config.retry.delay.as_millis()),
        format!(
            "consistency: {} ms timeout, {} ms interval",
            config.poll.timeout.as_millis(),
            config.poll.interval.as_millis()
        ),
        format!("http timeout: {} ms", config.http_timeout.as_millis()),
    ]
}

/// Serializes a value as canonical JSON text.
fn canonical_json<T: Serialize>(value: &T) -> CliResult<String> {
    let bytes = serde_jcs::to_vec(value)
        .map_err(|err| CliError::new(format!("failed to serialize output: {err}")))?;
    String::from_utf8(bytes).map_err(|err| CliError::new(format!("invalid output encoding: {err}")))
}

// ============================================================================
// SECTION: Argument Parsing
// ============================================================================

/// Parses a group name for clap.
fn parse_group(raw: &str) -> Result<Group, String> {
    raw.parse::<Group>().map_err(|err| err.to_string())
}

/// Parses an HTTP method, case-insensitively.
fn parse_method(raw: &str) -> Result<Method, String> {
    let upper = raw.trim().to_ascii_uppercase();
    match upper.as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        _ => Err(format!("unsupported method '{raw}'")),
    }
}

/// Parses an endpoint path for clap.
fn parse_endpoint(raw: &str) -> Result<Endpoint, String> {
    raw.parse::<Endpoint>().map_err(|err| err.to_string())
}

/// Parses a `key=value` query pair.
fn parse_query_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Loads configuration and maps failures to CLI errors.
fn load_config(args: &ConfigArgs) -> CliResult<ConformanceConfig> {
    ConformanceConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("configuration invalid: {err}")))
}

/// Reads a JSON body file with a size limit.
fn read_json_body(path: &Path) -> CliResult<Value> {
    let file = fs::File::open(path)
        .map_err(|err| CliError::new(format!("failed to open {}: {err}", path.display())))?;
    let mut bytes = Vec::new();
    file.take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|err| CliError::new(format!("failed to read {}: {err}", path.display())))?;
    if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > MAX_BODY_BYTES {
        return Err(CliError::new(format!(
            "{} exceeds {MAX_BODY_BYTES} bytes",
            path.display()
        )));
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("{} is not valid JSON: {err}", path.display())))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
