//! Halldyll CLI entrypoint.
//!
//! This is the main entrypoint for the halldyll-plan command-line tool.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use halldyll_plan_engine::cli::{
    Cli, Commands, OutputFormatter, PlanReport, destroy_scenario, plan_scenario,
};
use halldyll_plan_engine::config::{ScenarioParser, ScenarioValidator};
use halldyll_plan_engine::error::{HalldyllError, Result};
use halldyll_plan_engine::state::DeposedKey;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.json_logs());

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);
    match runtime.block_on(run(cli, &formatter)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.diagnostics() {
                Some(diags) => eprintln!("{}", formatter.format_diagnostics(diags)),
                None => eprintln!("Error: {e}"),
            }
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// Logs go to stderr, as JSON lines when the output format is JSON.
fn init_logging(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    match cli.command {
        Commands::Plan {
            scenario,
            apply_pass,
        } => cmd_plan(&scenario, apply_pass, formatter).await,
        Commands::Destroy { scenario, deposed } => {
            cmd_destroy(&scenario, deposed, formatter).await
        }
        Commands::Validate { scenario, warnings } => cmd_validate(&scenario, warnings, formatter),
    }
}

/// Plan a scenario.
async fn cmd_plan(path: &Path, apply_pass: bool, formatter: &OutputFormatter) -> Result<()> {
    let scenario = load_scenario(path)?;
    let report = plan_scenario(&scenario, apply_pass).await?;
    emit_report(&report, formatter)
}

/// Plan destruction of a scenario's recorded object.
async fn cmd_destroy(
    path: &Path,
    deposed: Option<String>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let scenario = load_scenario(path)?;
    let report = destroy_scenario(&scenario, deposed.map(DeposedKey::new)).await?;
    emit_report(&report, formatter)
}

/// Validate a scenario.
fn cmd_validate(path: &Path, show_warnings: bool, formatter: &OutputFormatter) -> Result<()> {
    info!("Validating scenario: {}", path.display());
    let scenario = ScenarioParser::new().load_with_env(path)?;
    let result = ScenarioValidator::new().check(&scenario);

    writeln!(
        std::io::stdout().lock(),
        "{}",
        formatter.format_validation(&result, show_warnings)
    )?;

    if result.is_valid() {
        Ok(())
    } else {
        Err(HalldyllError::internal(format!(
            "{} validation error(s) in {}",
            result.error_count(),
            path.display()
        )))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Loads and validates a scenario.
fn load_scenario(path: &Path) -> Result<halldyll_plan_engine::config::Scenario> {
    debug!("Loading scenario from: {}", path.display());
    let scenario = ScenarioParser::new().load_with_env(path)?;

    let result = ScenarioValidator::new().validate(&scenario)?;
    for warning in &result.warnings {
        debug!("Scenario warning: {warning}");
    }

    Ok(scenario)
}

/// Writes a report and fails if it carries errors.
fn emit_report(report: &PlanReport, formatter: &OutputFormatter) -> Result<()> {
    writeln!(std::io::stdout().lock(), "{}", formatter.format_report(report))?;

    if report.diagnostics.has_errors() {
        return Err(HalldyllError::internal(
            "the final plan is inconsistent with the planned change",
        ));
    }
    Ok(())
}
