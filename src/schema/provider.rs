//! Schemas published by a provider.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::block::Schema;

/// Everything a provider declares about the resource types it manages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSchema {
    /// Resource type schemas keyed by type name.
    #[serde(default)]
    pub resource_types: BTreeMap<String, Schema>,

    /// Schema of per-module provider metadata, when supported.
    #[serde(default)]
    pub provider_meta: Option<Schema>,
}

impl ProviderSchema {
    /// Creates an empty provider schema.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            resource_types: BTreeMap::new(),
            provider_meta: None,
        }
    }

    /// Adds a resource type.
    #[must_use]
    pub fn with_resource_type(mut self, type_name: impl Into<String>, schema: Schema) -> Self {
        self.resource_types.insert(type_name.into(), schema);
        self
    }

    /// Declares provider metadata support.
    #[must_use]
    pub fn with_provider_meta(mut self, schema: Schema) -> Self {
        self.provider_meta = Some(schema);
        self
    }

    /// Looks up the schema for a resource type.
    #[must_use]
    pub fn schema_for(&self, type_name: &str) -> Option<&Schema> {
        self.resource_types.get(type_name)
    }
}
