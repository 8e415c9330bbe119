//! Planning module for resource instance changes.
//!
//! This module computes planned changes from prior objects and desired
//! configuration, verifies provider answers, and reduces changes to the part
//! each execution node performs:
//! - [`DiffEngine`]: plans changes and destructions
//! - [`PlanChecker`]: compares a recomputed change with the planned one
//! - [`reduce`]: collapses replace actions for destroy and apply nodes

mod assert;
mod change;
mod check;
mod diff;
mod ignore;
mod proposed;
mod reduce;

pub use assert::{assert_object_compatible, assert_plan_valid, redact_sensitive};
pub use change::{Action, ResourceInstanceChange};
pub use check::PlanChecker;
pub use diff::{DiffEngine, DiffInput, DiffOutcome};
pub use ignore::{IgnoreSpec, filter_ignored};
pub use proposed::proposed_new_object;
pub use reduce::{NodeRole, reduce};
