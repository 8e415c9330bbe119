//! Writes planned changes into the shared [`ChangeSet`].

use tracing::trace;

use super::addr::{Generation, ResourceInstanceAddr};
use super::changes::{ChangeRecord, ChangeSet};
use crate::error::{ConfigError, Result};
use crate::planner::ResourceInstanceChange;
use crate::schema::ProviderSchema;

/// Records or removes planned changes for resource instances.
#[derive(Debug, Clone)]
pub struct ChangeRecorder<'a> {
    changes: ChangeSet,
    schemas: &'a ProviderSchema,
}

impl<'a> ChangeRecorder<'a> {
    /// Creates a recorder writing into `changes`.
    #[must_use]
    pub const fn new(changes: ChangeSet, schemas: &'a ProviderSchema) -> Self {
        Self { changes, schemas }
    }

    /// Records `change` for `addr` and `generation`, or removes the existing
    /// entry when `change` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource type has no schema or the change does
    /// not conform to it.
    ///
    /// # Panics
    ///
    /// Panics if the change belongs to a different instance or generation
    /// than the one it is recorded for.
    #[allow(clippy::panic)]
    pub async fn record(
        &self,
        addr: &ResourceInstanceAddr,
        generation: &Generation,
        change: Option<&ResourceInstanceChange>,
    ) -> Result<()> {
        let Some(change) = change else {
            self.changes.remove(addr, generation).await;
            trace!("Removed planned change for {addr} ({generation})");
            return Ok(());
        };

        if change.addr != *addr || change.generation() != *generation {
            panic!(
                "bug in change recording: change for {} ({}) recorded as {addr} ({generation})",
                change.addr,
                change.generation(),
            );
        }

        let schema = self.schemas.schema_for(&addr.resource_type).ok_or_else(|| {
            ConfigError::UnsupportedResourceType {
                type_name: addr.resource_type.clone(),
            }
        })?;

        let record = ChangeRecord::encode(change, &schema.implied_type())?;
        self.changes.append(record).await;

        match generation {
            Generation::Current => trace!("Recorded {} change for {addr}", change.action),
            Generation::Deposed(key) => {
                trace!("Recorded {} change for {addr} deposed object {key}", change.action);
            }
        }
        Ok(())
    }
}
