//! Scenario documents.
//!
//! A scenario describes one resource instance: its schema, the object
//! currently recorded for it, the desired configuration, and what the
//! provider answers when asked to validate and plan. These types map to the
//! YAML scenario file; values are written as plain JSON/YAML data.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use super::resource::ResourceConfig;
use crate::error::{ConfigError, Diagnostic, Diagnostics, Fault, HalldyllError, Result};
use crate::planner::IgnoreSpec;
use crate::provider::{PlanResponse, ScriptedPlan, ScriptedProvider};
use crate::schema::{ProviderSchema, Schema};
use crate::state::{DeposedKey, ObjectStatus, ProviderAddr, ResourceInstanceAddr, ResourceInstanceObject};
use crate::value::{Marks, Path, PathSet, Type, Value};

/// The root structure of a scenario file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    /// Instance being planned.
    pub addr: ResourceInstanceAddr,
    /// Provider configuration managing the instance.
    pub provider: ProviderAddr,
    /// Schemas published by the provider.
    pub schema: ProviderSchema,
    /// Object currently recorded for the instance.
    #[serde(default)]
    pub prior: Option<PriorSpec>,
    /// Desired configuration.
    pub config: ConfigSpec,
    /// Diagnostics returned by configuration validation, one entry per call.
    #[serde(default)]
    pub validation: Vec<Vec<DiagnosticSpec>>,
    /// Provider answers during the plan pass, in order.
    #[serde(default)]
    pub plan: Vec<ResponseSpec>,
    /// Provider answers during the apply pass, in order.
    #[serde(default)]
    pub apply: Option<Vec<ResponseSpec>>,
    /// Skip diff hooks.
    #[serde(default)]
    pub stub: bool,
}

/// Recorded object of the instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriorSpec {
    /// Object value.
    pub value: Json,
    /// Object status.
    #[serde(default)]
    pub status: ObjectStatus,
    /// Sensitive paths of the value.
    #[serde(default)]
    pub sensitive: Vec<String>,
    /// Hex-encoded provider-private bytes.
    #[serde(default)]
    pub private: Option<String>,
    /// Deposed key, when the object is deposed.
    #[serde(default)]
    pub deposed: Option<DeposedKey>,
}

/// Desired configuration of the instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConfigSpec {
    /// Configuration value.
    pub value: Json,
    /// Sensitive paths of the value.
    #[serde(default)]
    pub sensitive: Vec<String>,
    /// Paths whose changes are ignored once the object exists.
    #[serde(default)]
    pub ignore_changes: Vec<String>,
    /// Ignore every change once the object exists.
    #[serde(default)]
    pub ignore_all_changes: bool,
    /// Create replacements before destroying the old object.
    #[serde(default)]
    pub create_before_destroy: bool,
    /// Provider metadata.
    #[serde(default)]
    pub provider_meta: Option<Json>,
}

/// One scripted provider answer to a plan request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResponseSpec {
    /// Planned value. When absent, the proposed value is planned as-is.
    #[serde(default)]
    pub planned: Option<Json>,
    /// Answer without any planned value.
    #[serde(default)]
    pub nil: bool,
    /// Locations left unknown.
    #[serde(default)]
    pub unknown: Vec<String>,
    /// Attributes whose change forces replacement.
    #[serde(default)]
    pub requires_replace: Vec<String>,
    /// Answer as a legacy SDK provider.
    #[serde(default)]
    pub legacy_type_system: bool,
    /// Hex-encoded provider-private bytes.
    #[serde(default)]
    pub private: Option<String>,
    /// Diagnostics.
    #[serde(default)]
    pub diagnostics: Vec<DiagnosticSpec>,
}

/// A scripted diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticSpec {
    /// Whether the diagnostic is an error.
    #[serde(default = "default_error")]
    pub error: bool,
    /// One line summary.
    pub summary: String,
    /// Full explanation.
    #[serde(default)]
    pub detail: String,
}

const fn default_error() -> bool {
    true
}

impl DiagnosticSpec {
    fn to_diagnostic(&self) -> Diagnostic {
        if self.error {
            Diagnostic::error(Fault::Provider, &self.summary, &self.detail)
        } else {
            Diagnostic::warning(Fault::Provider, &self.summary, &self.detail)
        }
    }
}

impl Scenario {
    /// Schema of the scenario's resource type.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider schema lacks the resource type.
    pub fn resource_schema(&self) -> Result<&Schema> {
        self.schema
            .schema_for(&self.addr.resource_type)
            .ok_or_else(|| {
                ConfigError::UnsupportedResourceType {
                    type_name: self.addr.resource_type.clone(),
                }
                .into()
            })
    }

    /// Decodes the recorded object.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not fit the schema or a path or the
    /// private bytes cannot be decoded.
    pub fn prior_object(&self) -> Result<Option<ResourceInstanceObject>> {
        let Some(prior) = &self.prior else {
            return Ok(None);
        };
        let ty = self.resource_schema()?.implied_type();

        let value = decode_value(&prior.value, &ty, "prior.value")?;
        let marks = Marks::sensitive(&parse_paths(&prior.sensitive, "prior.sensitive")?);
        let private = decode_private(prior.private.as_deref(), "prior.private")?;

        Ok(Some(
            ResourceInstanceObject::new(value)
                .with_status(prior.status)
                .with_marks(marks)
                .with_private(private),
        ))
    }

    /// Deposed key of the recorded object, if it is deposed.
    #[must_use]
    pub fn deposed_key(&self) -> Option<&DeposedKey> {
        self.prior.as_ref().and_then(|p| p.deposed.as_ref())
    }

    /// Decodes the desired configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not fit the schema or a path
    /// cannot be parsed.
    pub fn resource_config(&self) -> Result<ResourceConfig> {
        let ty = self.resource_schema()?.implied_type();
        let config = &self.config;

        let value = decode_value(&config.value, &ty, "config.value")?;
        let marks = Marks::sensitive(&parse_paths(&config.sensitive, "config.sensitive")?);
        let ignore = if config.ignore_all_changes {
            IgnoreSpec::All
        } else {
            IgnoreSpec::Paths(
                parse_paths(&config.ignore_changes, "config.ignore_changes")?
                    .into_iter()
                    .collect(),
            )
        };

        let mut resource = ResourceConfig::new(value).with_marks(marks).with_ignore(ignore);
        if let Some(meta) = &config.provider_meta {
            let meta_ty = self
                .schema
                .provider_meta
                .as_ref()
                .map_or(Type::Dynamic, Schema::implied_type);
            resource = resource.with_provider_meta(decode_value(meta, &meta_ty, "config.provider_meta")?);
        }

        Ok(resource)
    }

    /// Builds a provider replaying `responses`, with the scenario's
    /// validation answers queued.
    ///
    /// # Errors
    ///
    /// Returns an error if a scripted response cannot be decoded.
    pub async fn scripted_provider(&self, responses: &[ResponseSpec]) -> Result<ScriptedProvider> {
        let ty = self.resource_schema()?.implied_type();
        let plans = responses
            .iter()
            .enumerate()
            .map(|(i, response)| response.to_plan(&ty, &format!("responses[{i}]")))
            .collect::<Result<Vec<_>>>()?;

        let provider = ScriptedProvider::with_plans(plans);
        for diagnostics in &self.validation {
            provider
                .push_validation(diagnostics.iter().map(DiagnosticSpec::to_diagnostic).collect())
                .await;
        }
        Ok(provider)
    }
}

impl ResponseSpec {
    fn to_plan(&self, ty: &Type, field: &str) -> Result<ScriptedPlan> {
        let unknown: PathSet = parse_paths(&self.unknown, &format!("{field}.unknown"))?;
        let requires_replace: Vec<Path> =
            parse_paths(&self.requires_replace, &format!("{field}.requires_replace"))?
                .into_iter()
                .collect();
        let diagnostics: Diagnostics = self.diagnostics.iter().map(DiagnosticSpec::to_diagnostic).collect();

        if self.nil {
            return Ok(ScriptedPlan::Respond(PlanResponse::nil().with_diagnostics(diagnostics)));
        }

        let Some(planned) = &self.planned else {
            if !self.legacy_type_system && self.private.is_none() && diagnostics.is_empty() {
                return Ok(ScriptedPlan::Echo {
                    unknown,
                    requires_replace,
                });
            }
            return Err(ConfigError::validation(
                "an echoed response cannot carry legacy_type_system, private or diagnostics",
                field,
            )
            .into());
        };

        let value = Value::from_json_with_unknowns(planned, ty, &unknown).map_err(|e| {
            HalldyllError::Config(ConfigError::validation(e.to_string(), format!("{field}.planned")))
        })?;
        let mut response = PlanResponse::planned(value)
            .with_requires_replace(requires_replace)
            .with_private(decode_private(self.private.as_deref(), &format!("{field}.private"))?)
            .with_diagnostics(diagnostics);
        if self.legacy_type_system {
            response = response.with_legacy_type_system();
        }
        Ok(ScriptedPlan::Respond(response))
    }
}

/// Parses textual paths, reporting the first bad one against `field`.
pub(crate) fn parse_paths(paths: &[String], field: &str) -> Result<PathSet> {
    paths
        .iter()
        .map(|p| {
            p.parse::<Path>().map_err(|e| {
                HalldyllError::Config(ConfigError::validation(e.to_string(), field))
            })
        })
        .collect()
}

fn decode_value(json: &Json, ty: &Type, field: &str) -> Result<Value> {
    Value::from_json(json, ty)
        .map_err(|e| HalldyllError::Config(ConfigError::validation(e.to_string(), field)))
}

fn decode_private(private: Option<&str>, field: &str) -> Result<Vec<u8>> {
    private.map_or_else(
        || Ok(Vec::new()),
        |hex_bytes| {
            hex::decode(hex_bytes).map_err(|e| {
                HalldyllError::Config(ConfigError::validation(
                    format!("invalid hex: {e}"),
                    field,
                ))
            })
        },
    )
}
