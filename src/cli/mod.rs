//! CLI module for the Halldyll plan engine.
//!
//! This module provides the command-line interface for planning
//! scenario files.

mod commands;
mod output;
mod pipeline;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::{NodeSummary, OutputFormatter, PlanReport};
pub use pipeline::{destroy_scenario, plan_scenario};
