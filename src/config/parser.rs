//! Scenario parser for loading scenario files.
//!
//! This module handles loading scenarios from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, HalldyllError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::scenario::Scenario;

/// Environment variable forcing create-before-destroy replacement.
pub const ENV_CREATE_BEFORE_DESTROY: &str = "HALLDYLL_CREATE_BEFORE_DESTROY";

/// Environment variable forcing stub mode.
pub const ENV_STUB: &str = "HALLDYLL_STUB";

/// Parser for scenario files.
#[derive(Debug, Default)]
pub struct ScenarioParser;

impl ScenarioParser {
    /// Creates a new scenario parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Loads a scenario from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Scenario> {
        let path = path.as_ref();
        info!("Loading scenario from: {}", path.display());

        if !path.exists() {
            return Err(HalldyllError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            HalldyllError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a scenario from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Scenario> {
        debug!("Parsing YAML scenario");

        let scenario: Scenario = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            HalldyllError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Successfully parsed scenario for: {}", scenario.addr);
        Ok(scenario)
    }

    /// Loads a scenario with environment variable overrides.
    ///
    /// `HALLDYLL_CREATE_BEFORE_DESTROY` and `HALLDYLL_STUB` accept `true`,
    /// `false`, `1` or `0`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an override
    /// is not a boolean.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<Scenario> {
        let mut scenario = self.load_file(path)?;
        Self::apply_env_overrides(&mut scenario, |name| std::env::var(name).ok())?;
        Ok(scenario)
    }

    /// Applies overrides looked up through `lookup`.
    fn apply_env_overrides(
        scenario: &mut Scenario,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(value) = lookup(ENV_CREATE_BEFORE_DESTROY) {
            debug!("Overriding config.create_before_destroy from environment");
            scenario.config.create_before_destroy = parse_bool(ENV_CREATE_BEFORE_DESTROY, &value)?;
        }

        if let Some(value) = lookup(ENV_STUB) {
            debug!("Overriding stub from environment");
            scenario.stub = parse_bool(ENV_STUB, &value)?;
        }

        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(HalldyllError::Config(ConfigError::validation(
            format!("expected a boolean, got {other:?}"),
            name,
        ))),
    }
}
