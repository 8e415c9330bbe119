//! Scenario validation.
//!
//! This module checks a scenario for mistakes the diff engine would only
//! report later, or not at all: malformed schemas, unparseable paths, and
//! ignore rules that cannot take effect.

use crate::error::{ConfigError, HalldyllError, Result};
use tracing::debug;

use super::scenario::{ResponseSpec, Scenario};
use crate::schema::Schema;
use crate::value::{Path, PathStep};

/// Validator for scenarios.
#[derive(Debug, Default)]
pub struct ScenarioValidator;

/// Validation result containing all problems found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ScenarioValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a scenario.
    ///
    /// # Errors
    ///
    /// Returns an error for the first problem found if validation fails.
    pub fn validate(&self, scenario: &Scenario) -> Result<ValidationResult> {
        let result = self.check(scenario);

        if result.errors.is_empty() {
            debug!("Scenario validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(HalldyllError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Collects every problem of a scenario without failing.
    #[must_use]
    pub fn check(&self, scenario: &Scenario) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_provider(scenario, &mut result);
        for (type_name, schema) in &scenario.schema.resource_types {
            Self::validate_schema(schema, &format!("schema.resource_types.{type_name}"), &mut result);
        }
        if let Some(meta) = &scenario.schema.provider_meta {
            Self::validate_schema(meta, "schema.provider_meta", &mut result);
        }

        let schema = scenario.schema.schema_for(&scenario.addr.resource_type);
        if schema.is_none() {
            result.errors.push(ValidationError {
                field: String::from("addr"),
                message: format!(
                    "Provider schema has no resource type '{}'",
                    scenario.addr.resource_type
                ),
            });
        }

        Self::validate_config(scenario, schema, &mut result);
        Self::validate_prior(scenario, schema, &mut result);
        Self::validate_responses(&scenario.plan, "plan", &mut result);
        if let Some(apply) = &scenario.apply {
            Self::validate_responses(apply, "apply", &mut result);
        }

        result
    }

    /// Validates the provider address against the instance address.
    fn validate_provider(scenario: &Scenario, result: &mut ValidationResult) {
        let provider_type = scenario.provider.provider_type();
        if provider_type.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("provider.source"),
                message: String::from("Provider source must name a provider type"),
            });
            return;
        }

        let prefix = scenario
            .addr
            .resource_type
            .split('_')
            .next()
            .unwrap_or_default();
        if prefix != provider_type {
            result.warnings.push(format!(
                "addr: Resource type '{}' does not belong to provider type '{provider_type}'",
                scenario.addr.resource_type
            ));
        }
    }

    /// Validates attribute flags and names, recursing into nested blocks.
    fn validate_schema(schema: &Schema, prefix: &str, result: &mut ValidationResult) {
        for (name, attr) in &schema.attributes {
            let field = format!("{prefix}.attributes.{name}");
            if !is_valid_name(name) {
                result.errors.push(ValidationError {
                    field: field.clone(),
                    message: format!(
                        "Attribute name '{name}' is invalid. Must be lowercase alphanumeric with underscores."
                    ),
                });
            }
            if let Err(message) = attr.check_flags() {
                result.errors.push(ValidationError { field, message });
            }
        }

        for (name, block) in &schema.blocks {
            let field = format!("{prefix}.blocks.{name}");
            if schema.attributes.contains_key(name) {
                result.errors.push(ValidationError {
                    field: field.clone(),
                    message: format!("Block '{name}' has the same name as an attribute"),
                });
            }
            if !is_valid_name(name) {
                result.errors.push(ValidationError {
                    field: field.clone(),
                    message: format!(
                        "Block name '{name}' is invalid. Must be lowercase alphanumeric with underscores."
                    ),
                });
            }
            Self::validate_schema(&block.block, &field, result);
        }
    }

    /// Validates the desired configuration's paths.
    fn validate_config(scenario: &Scenario, schema: Option<&Schema>, result: &mut ValidationResult) {
        let config = &scenario.config;

        let ignored = parse_all(&config.ignore_changes, "config.ignore_changes", result);
        if config.ignore_all_changes && !config.ignore_changes.is_empty() {
            result.warnings.push(String::from(
                "config.ignore_changes: Has no effect when ignore_all_changes is set",
            ));
        }

        let sensitive = parse_all(&config.sensitive, "config.sensitive", result);

        let Some(schema) = schema else {
            return;
        };

        for (i, path) in ignored {
            let field = format!("config.ignore_changes[{i}]");
            match root_attribute(&path) {
                Some(name) if !schema.has_attribute_or_block(name) => {
                    result.errors.push(ValidationError {
                        field,
                        message: format!("Ignored path '{path}' names unsupported attribute '{name}'"),
                    });
                }
                Some(name) => {
                    if schema
                        .attributes
                        .get(name)
                        .is_some_and(|attr| attr.computed && !attr.optional)
                    {
                        result.warnings.push(format!(
                            "{field}: Attribute '{name}' is decided by the provider only, ignoring its changes has no effect"
                        ));
                    }
                }
                None => {
                    result.errors.push(ValidationError {
                        field,
                        message: format!("Ignored path '{path}' must start with an attribute name"),
                    });
                }
            }
        }

        for (i, path) in sensitive {
            if root_attribute(&path).is_none_or(|name| !schema.has_attribute_or_block(name)) {
                result.warnings.push(format!(
                    "config.sensitive[{i}]: Path '{path}' does not name an attribute of the schema"
                ));
            }
        }

        if config.provider_meta.is_some() && scenario.schema.provider_meta.is_none() {
            result.errors.push(ValidationError {
                field: String::from("config.provider_meta"),
                message: format!(
                    "Provider {} doesn't support provider_meta",
                    scenario.provider.source
                ),
            });
        }
    }

    /// Validates the recorded object.
    fn validate_prior(scenario: &Scenario, schema: Option<&Schema>, result: &mut ValidationResult) {
        let Some(prior) = &scenario.prior else {
            return;
        };

        let sensitive = parse_all(&prior.sensitive, "prior.sensitive", result);
        if let Some(schema) = schema {
            for (i, path) in sensitive {
                if root_attribute(&path).is_none_or(|name| !schema.has_attribute_or_block(name)) {
                    result.warnings.push(format!(
                        "prior.sensitive[{i}]: Path '{path}' does not name an attribute of the schema"
                    ));
                }
            }
        }

        if prior.private.as_deref().is_some_and(|p| hex::decode(p).is_err()) {
            result.errors.push(ValidationError {
                field: String::from("prior.private"),
                message: String::from("Private bytes must be hex encoded"),
            });
        }
    }

    /// Validates scripted provider responses.
    fn validate_responses(responses: &[ResponseSpec], prefix: &str, result: &mut ValidationResult) {
        for (i, response) in responses.iter().enumerate() {
            let field = format!("{prefix}[{i}]");
            parse_all(&response.unknown, &format!("{field}.unknown"), result);
            parse_all(&response.requires_replace, &format!("{field}.requires_replace"), result);

            if response.nil && response.planned.is_some() {
                result.errors.push(ValidationError {
                    field: field.clone(),
                    message: String::from("A nil response cannot carry a planned value"),
                });
            }
            if response.planned.is_none()
                && !response.nil
                && (response.legacy_type_system
                    || response.private.is_some()
                    || !response.diagnostics.is_empty())
            {
                result.errors.push(ValidationError {
                    field: field.clone(),
                    message: String::from(
                        "An echoed response cannot carry legacy_type_system, private or diagnostics",
                    ),
                });
            }
            if response.private.as_deref().is_some_and(|p| hex::decode(p).is_err()) {
                result.errors.push(ValidationError {
                    field: format!("{field}.private"),
                    message: String::from("Private bytes must be hex encoded"),
                });
            }
        }
    }
}

/// Parses textual paths, recording an error for each bad one.
fn parse_all(paths: &[String], prefix: &str, result: &mut ValidationResult) -> Vec<(usize, Path)> {
    paths
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| match raw.parse::<Path>() {
            Ok(path) => Some((i, path)),
            Err(e) => {
                result.errors.push(ValidationError {
                    field: format!("{prefix}[{i}]"),
                    message: e.to_string(),
                });
                None
            }
        })
        .collect()
}

fn root_attribute(path: &Path) -> Option<&str> {
    match path.steps().first() {
        Some(PathStep::Attr(name)) => Some(name),
        _ => None,
    }
}

/// Validates that a name follows the naming convention.
/// Names must be lowercase alphanumeric with underscores, starting with a letter.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    // First character must be a letter
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }

    // Rest must be lowercase alphanumeric or underscore
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
