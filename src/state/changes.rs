//! The shared changeset and its record format.
//!
//! A [`ChangeRecord`] is the serializable form of a planned change. Values are
//! stored as JSON, unknown locations and sensitive locations as path lists, so
//! marked data never leaves the process as part of a record's structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::addr::{DeposedKey, Generation, ProviderAddr, ResourceInstanceAddr};
use crate::error::{Result, StateError};
use crate::planner::{Action, ResourceInstanceChange};
use crate::value::{Marks, PathSet, Type, Value};

/// Encoded form of a [`ResourceInstanceChange`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// The instance.
    pub addr: ResourceInstanceAddr,
    /// Deposed key, for changes to deposed objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposed_key: Option<DeposedKey>,
    /// Provider configuration.
    pub provider_addr: ProviderAddr,
    /// Action.
    pub action: Action,
    /// Value before the change.
    pub before: serde_json::Value,
    /// Value after the change, unknowns written as null.
    pub after: serde_json::Value,
    /// Locations in `after` that are unknown.
    #[serde(default)]
    pub after_unknown: PathSet,
    /// Sensitive locations in `before`.
    #[serde(default)]
    pub before_sensitive: PathSet,
    /// Sensitive locations in `after`.
    #[serde(default)]
    pub after_sensitive: PathSet,
    /// Attributes forcing replacement.
    #[serde(default)]
    pub required_replace: PathSet,
    /// Provider-private bytes, hex encoded.
    #[serde(default)]
    pub private: String,
    /// SHA-256 of the encoded before and after values.
    pub checksum: String,
    /// When the record was produced.
    pub recorded_at: DateTime<Utc>,
}

impl ChangeRecord {
    /// Encodes `change` against the instance's implied type.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::EncodeFailed`] if either value does not conform
    /// to `ty`.
    pub fn encode(change: &ResourceInstanceChange, ty: &Type) -> Result<Self> {
        for (label, value) in [("before", &change.before), ("after", &change.after)] {
            // Delete changes carry a dynamically typed null.
            if value.is_null() {
                continue;
            }
            if let Some(err) = value.conformance_errors(ty).into_iter().next() {
                return Err(StateError::EncodeFailed {
                    addr: change.display_addr(),
                    message: format!("{label} value: {err}"),
                }
                .into());
            }
        }

        let before = change.before.to_json();
        let after = change.after.to_json();
        let checksum = checksum(&before, &after)?;

        Ok(Self {
            addr: change.addr.clone(),
            deposed_key: change.deposed_key.clone(),
            provider_addr: change.provider_addr.clone(),
            action: change.action,
            before,
            after,
            after_unknown: change.after.unknown_paths(),
            before_sensitive: change.before_marks.sensitive_paths(),
            after_sensitive: change.after_marks.sensitive_paths(),
            required_replace: change.required_replace.clone(),
            private: hex::encode(&change.private),
            checksum,
            recorded_at: Utc::now(),
        })
    }

    /// Restores the change, re-applying unknowns and sensitivity marks.
    ///
    /// # Errors
    ///
    /// Returns an error if the checksum does not match, or if the stored
    /// values or private bytes cannot be decoded.
    pub fn decode(&self, ty: &Type) -> Result<ResourceInstanceChange> {
        if checksum(&self.before, &self.after)? != self.checksum {
            return Err(StateError::Corrupted {
                message: format!("checksum mismatch for {}", self.addr),
            }
            .into());
        }

        let decode_value = |json: &serde_json::Value, unknown: &PathSet| {
            Value::from_json_with_unknowns(json, ty, unknown).map_err(|err| {
                StateError::serialization(format!("change for {}: {err}", self.addr))
            })
        };
        let before = decode_value(&self.before, &PathSet::new())?;
        let after = decode_value(&self.after, &self.after_unknown)?;

        let private = hex::decode(&self.private)
            .map_err(|err| StateError::serialization(format!("private data: {err}")))?;

        Ok(ResourceInstanceChange {
            addr: self.addr.clone(),
            deposed_key: self.deposed_key.clone(),
            provider_addr: self.provider_addr.clone(),
            action: self.action,
            before,
            after,
            before_marks: Marks::sensitive(&self.before_sensitive),
            after_marks: Marks::sensitive(&self.after_sensitive),
            private,
            required_replace: self.required_replace.clone(),
        })
    }

    /// The generation this record belongs to.
    #[must_use]
    pub fn generation(&self) -> Generation {
        Generation::from_deposed(self.deposed_key.as_ref())
    }
}

fn checksum(before: &serde_json::Value, after: &serde_json::Value) -> Result<String> {
    let mut hasher = Sha256::new();
    for value in [before, after] {
        let bytes = serde_json::to_vec(value)
            .map_err(|err| StateError::serialization(err.to_string()))?;
        hasher.update(&bytes);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Process-wide set of planned changes keyed by instance and generation.
///
/// Cloning is cheap; clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    records: Arc<RwLock<HashMap<(ResourceInstanceAddr, Generation), ChangeRecord>>>,
}

impl ChangeSet {
    /// Creates an empty changeset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record for its instance and generation.
    pub async fn append(&self, record: ChangeRecord) {
        let key = (record.addr.clone(), record.generation());
        self.records.write().await.insert(key, record);
    }

    /// Removes the record for `addr` and `generation`, returning it.
    pub async fn remove(
        &self,
        addr: &ResourceInstanceAddr,
        generation: &Generation,
    ) -> Option<ChangeRecord> {
        self.records
            .write()
            .await
            .remove(&(addr.clone(), generation.clone()))
    }

    /// Returns a copy of the record for `addr` and `generation`.
    pub async fn get(
        &self,
        addr: &ResourceInstanceAddr,
        generation: &Generation,
    ) -> Option<ChangeRecord> {
        self.records
            .read()
            .await
            .get(&(addr.clone(), generation.clone()))
            .cloned()
    }

    /// All records, ordered by address then generation.
    pub async fn records(&self) -> Vec<ChangeRecord> {
        let guard = self.records.read().await;
        let mut records: Vec<ChangeRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| (&a.addr, a.generation()).cmp(&(&b.addr, b.generation())));
        records
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if there are no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
