//! Verification of changes recomputed during apply.
//!
//! A change planned earlier and the change recomputed once more values are
//! known must agree: the action may only relax from `Update` to `NoOp`, and the
//! new value may only refine unknowns of the planned one.

use tracing::{debug, trace};

use super::assert::{assert_object_compatible, redact_sensitive};
use super::change::{Action, ResourceInstanceChange};
use crate::error::{ConfigError, Diagnostic, Diagnostics, Fault, Result};
use crate::schema::ProviderSchema;

/// Checks recomputed changes against their planned counterparts.
#[derive(Debug, Clone, Copy)]
pub struct PlanChecker<'a> {
    schemas: &'a ProviderSchema,
}

impl<'a> PlanChecker<'a> {
    /// Creates a checker using `schemas`.
    #[must_use]
    pub const fn new(schemas: &'a ProviderSchema) -> Self {
        Self { schemas }
    }

    /// Compares `actual` against `planned`.
    ///
    /// The returned diagnostics contain one error per inconsistency.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource type has no schema.
    pub fn check(
        &self,
        planned: &ResourceInstanceChange,
        actual: &ResourceInstanceChange,
    ) -> Result<Diagnostics> {
        let addr = actual.display_addr();
        let schema = self
            .schemas
            .schema_for(&actual.addr.resource_type)
            .ok_or_else(|| ConfigError::UnsupportedResourceType {
                type_name: actual.addr.resource_type.clone(),
            })?;
        let provider = &actual.provider_addr.source;

        trace!(
            "Verifying that actual change (action {}) matches planned change (action {})",
            actual.action,
            planned.action
        );

        let mut diags = Diagnostics::new();

        if planned.action != actual.action {
            match (planned.action, actual.action) {
                (Action::Update, Action::NoOp) => {
                    debug!("After incorporating new values learned so far during apply, {addr} change has become NoOp.");
                }
                (Action::CreateThenDelete, Action::DeleteThenCreate)
                | (Action::DeleteThenCreate, Action::CreateThenDelete) => {
                    diags.push(Diagnostic::error(
                        Fault::Engine,
                        "Plan engine produced inconsistent final plan",
                        format!(
                            "When expanding the plan for {addr} to include new values learned so far during apply, the planned action changed from {} to {}.\n\nThis is a bug in the plan engine and should be reported.",
                            planned.action, actual.action
                        ),
                    ));
                }
                _ => {
                    diags.push(Diagnostic::error(
                        Fault::Provider,
                        "Provider produced inconsistent final plan",
                        format!(
                            "When expanding the plan for {addr} to include new values learned so far during apply, provider {provider:?} changed the planned action from {} to {}.\n\nThis is a bug in the provider, which should be reported in the provider's own issue tracker.",
                            planned.action, actual.action
                        ),
                    ));
                }
            }
        }

        let errs = assert_object_compatible(schema, &planned.after, &actual.after);
        for err in redact_sensitive(errs, &planned.after_marks) {
            diags.push(Diagnostic::error(
                Fault::Provider,
                "Provider produced inconsistent final plan",
                format!(
                    "When expanding the plan for {addr} to include new values learned so far during apply, provider {provider:?} produced an invalid new value for {}.\n\nThis is a bug in the provider, which should be reported in the provider's own issue tracker.",
                    err.prefixed(&actual.addr.to_string())
                ),
            ));
        }

        Ok(diags)
    }
}
