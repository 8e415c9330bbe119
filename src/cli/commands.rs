//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Halldyll - resource change planning for scripted providers.
#[derive(Parser, Debug)]
#[command(name = "halldyll-plan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the planned change for a scenario.
    Plan {
        /// Path to the scenario file.
        scenario: PathBuf,

        /// Re-plan with the scenario's apply responses and check the result
        /// against the planned change.
        #[arg(long)]
        apply_pass: bool,
    },

    /// Compute the destroy change for a scenario's recorded object.
    Destroy {
        /// Path to the scenario file.
        scenario: PathBuf,

        /// Treat the recorded object as deposed under this key.
        #[arg(long)]
        deposed: Option<String>,
    },

    /// Validate a scenario file.
    Validate {
        /// Path to the scenario file.
        scenario: PathBuf,

        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns true if logs should be written as JSON lines.
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan_with_apply_pass() {
        let cli = Cli::try_parse_from(["halldyll-plan", "plan", "web.yaml", "--apply-pass", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(!cli.json_logs());
        assert!(matches!(
            cli.command,
            Commands::Plan { ref scenario, apply_pass: true } if scenario == &PathBuf::from("web.yaml")
        ));
    }

    #[test]
    fn test_parse_destroy_deposed() {
        let cli = Cli::try_parse_from([
            "halldyll-plan",
            "--output",
            "json",
            "destroy",
            "web.yaml",
            "--deposed",
            "1a2b3c4d",
        ])
        .unwrap();
        assert!(matches!(cli.output, OutputFormat::Json));
        assert!(cli.json_logs());
        assert!(matches!(cli.command, Commands::Destroy { deposed: Some(ref k), .. } if k == "1a2b3c4d"));
    }
}
