// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![cfg_attr(not(test), deny(missing_docs))] // All public items must be documented
#![warn(dead_code)]                   // Unused code is reported
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are reported
#![warn(unused_variables)]            // Unused variables are reported
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Halldyll Plan Engine
//!
//! Provider-driven change planning for declarative resource instances.
//!
//! ## Overview
//!
//! Given the object currently recorded for a resource instance and its
//! desired configuration, the engine asks the provider what it would do,
//! checks that the answer is consistent with the configuration and the
//! schema, and decides which action the change performs:
//!
//! - Honor `ignore_changes` before the provider sees the configuration
//! - Propose a new value merging configuration with prior computed values
//! - Reject invalid provider plans with attributed diagnostics
//! - Classify the change as create, update, replace, delete or no-op
//! - Re-check changes recomputed during apply against what was planned
//!
//! ## Architecture
//!
//! 1. **Value model**: typed dynamic values with unknowns and sensitivity
//!    marks kept beside them
//! 2. **Provider**: validates configuration and plans changes
//! 3. **Diff engine**: computes and verifies the planned change
//! 4. **Changeset**: shared, serializable record of planned changes
//!
//! ## Modules
//!
//! - [`value`]: Values, types, paths and marks
//! - [`schema`]: Resource schemas
//! - [`provider`]: Provider contract and a scripted provider
//! - [`hooks`]: Callbacks around every diff
//! - [`planner`]: Diff computation, plan checks and reduction
//! - [`state`]: Addresses, recorded objects and the changeset
//! - [`config`]: Scenario parsing and validation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! addr: acme_instance.web
//! provider:
//!   source: registry.example.com/acme/acme
//! schema:
//!   resource_types:
//!     acme_instance:
//!       attributes:
//!         id: { type: string, computed: true }
//!         ami: { type: string, required: true }
//! prior:
//!   value: { id: i-1, ami: old }
//! config:
//!   value: { ami: new }
//! plan:
//!   - unknown: [id]
//!     requires_replace: [ami]
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod hooks;
pub mod planner;
pub mod provider;
pub mod schema;
pub mod state;
pub mod value;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ResourceConfig, Scenario, ScenarioParser, ScenarioValidator};
pub use error::{Diagnostic, Diagnostics, HalldyllError, Result};
pub use hooks::{DiffHook, LoggingHook, NoopHook};
pub use planner::{Action, DiffEngine, DiffInput, DiffOutcome, PlanChecker, ResourceInstanceChange};
pub use provider::{PlanRequest, PlanResponse, Provider, ScriptedProvider, ValidateRequest};
pub use schema::{ProviderSchema, Schema};
pub use state::{ChangeRecorder, ChangeSet, ResourceInstanceAddr, ResourceInstanceObject};
pub use value::{Marks, Path, Type, Value};
