//! Recorded state and planned changes.
//!
//! This module provides the addresses that identify resource instances, the
//! recorded objects a diff starts from, and the shared changeset planned
//! changes are written into.

mod addr;
mod changes;
mod recorder;
mod types;

pub use addr::{DeposedKey, Generation, InstanceKey, ProviderAddr, ResourceInstanceAddr};
pub use changes::{ChangeRecord, ChangeSet};
pub use recorder::ChangeRecorder;
pub use types::{ObjectStatus, ResourceInstanceObject};
