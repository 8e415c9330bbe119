//! Provider contract.
//!
//! A provider validates resource configuration and plans changes to resource
//! instances. The engine never trusts a provider's answer without checking it.

mod scripted;

use async_trait::async_trait;

use crate::error::Diagnostics;
use crate::value::{Path, Value};

pub use scripted::{ScriptedPlan, ScriptedProvider};

/// Request to validate a resource configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateRequest {
    /// Resource type name.
    pub type_name: String,
    /// Unmarked configuration value.
    pub config: Value,
}

/// Request to plan a change.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    /// Resource type name.
    pub type_name: String,
    /// Unmarked configuration, after ignore-changes.
    pub config: Value,
    /// Unmarked prior value; null when creating.
    pub prior_state: Value,
    /// Advisory merge of prior value and configuration.
    pub proposed_new_state: Value,
    /// Provider-private bytes from the prior object.
    pub prior_private: Vec<u8>,
    /// Provider metadata, forwarded unchanged; dynamic null when unset.
    pub provider_meta: Value,
}

/// A provider's answer to a [`PlanRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlanResponse {
    /// Planned new value. `None` signals a broken client.
    pub planned_state: Option<Value>,
    /// Provider-private bytes for apply.
    pub planned_private: Vec<u8>,
    /// Attributes whose change forces replacement.
    pub requires_replace: Vec<Path>,
    /// Set by providers built on the legacy SDK, whose plans are known to be
    /// imprecise.
    pub legacy_type_system: bool,
    /// Diagnostics.
    pub diagnostics: Diagnostics,
}

impl PlanResponse {
    /// A response planning `value`.
    #[must_use]
    pub const fn planned(value: Value) -> Self {
        Self {
            planned_state: Some(value),
            planned_private: Vec::new(),
            requires_replace: Vec::new(),
            legacy_type_system: false,
            diagnostics: Diagnostics::new(),
        }
    }

    /// A response without a planned value.
    #[must_use]
    pub const fn nil() -> Self {
        Self {
            planned_state: None,
            planned_private: Vec::new(),
            requires_replace: Vec::new(),
            legacy_type_system: false,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Sets the requires-replace paths.
    #[must_use]
    pub fn with_requires_replace(mut self, paths: Vec<Path>) -> Self {
        self.requires_replace = paths;
        self
    }

    /// Sets the private bytes.
    #[must_use]
    pub fn with_private(mut self, private: Vec<u8>) -> Self {
        self.planned_private = private;
        self
    }

    /// Flags the response as coming from a legacy SDK provider.
    #[must_use]
    pub fn with_legacy_type_system(mut self) -> Self {
        self.legacy_type_system = true;
        self
    }

    /// Sets the diagnostics.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// A resource provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Validates a resource configuration.
    async fn validate_resource_config(&self, request: ValidateRequest) -> Diagnostics;

    /// Plans a change to a resource instance.
    async fn plan_resource_change(&self, request: PlanRequest) -> PlanResponse;
}
