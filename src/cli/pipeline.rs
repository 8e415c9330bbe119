//! Plan and destroy runs over a loaded scenario.
//!
//! Each run builds a scripted provider from the scenario, drives the diff
//! engine, records the resulting change into a fresh changeset, and reduces
//! it for both execution node roles.

use tracing::{debug, info};

use super::output::{NodeSummary, PlanReport};
use crate::config::Scenario;
use crate::error::{Diagnostics, Result};
use crate::hooks::LoggingHook;
use crate::planner::{DiffEngine, DiffInput, NodeRole, PlanChecker, ResourceInstanceChange, reduce};
use crate::provider::ScriptedProvider;
use crate::state::{ChangeRecorder, ChangeSet, DeposedKey, Generation};

/// Runs the plan pass of `scenario`, followed by the apply pass when
/// `apply_pass` is set.
///
/// The apply pass re-plans with the apply responses, passing the planned
/// change as the previous change, and checks the result against it. Check
/// failures are reported as error diagnostics in the returned report.
///
/// # Errors
///
/// Returns an error if the scenario cannot be decoded or a diff fails.
pub async fn plan_scenario(scenario: &Scenario, apply_pass: bool) -> Result<PlanReport> {
    let prior = scenario.prior_object()?;
    let config = scenario.resource_config()?;
    let hook = LoggingHook;

    let mut input = DiffInput::new(&scenario.addr, &config)
        .with_create_before_destroy(scenario.config.create_before_destroy);
    if let Some(prior) = &prior {
        input = input.with_prior(prior);
    }

    let changes = ChangeSet::new();
    let recorder = ChangeRecorder::new(changes.clone(), &scenario.schema);

    info!("Planning {}", scenario.addr);
    let provider = scenario.scripted_provider(&scenario.plan).await?;
    let planned = DiffEngine::new(&provider, &scenario.schema, scenario.provider.clone())
        .with_hooks(&hook)
        .with_stub(scenario.stub)
        .compute_diff(input)
        .await?;
    recorder
        .record(&scenario.addr, &planned.change.generation(), Some(&planned.change))
        .await?;

    let mut diagnostics = planned.diagnostics;
    let mut title = String::from("Plan");
    let mut change = planned.change;

    if apply_pass {
        info!("Re-planning {} for apply", scenario.addr);
        let responses = scenario.apply.as_deref().unwrap_or_default();
        let provider = scenario.scripted_provider(responses).await?;
        let actual = DiffEngine::new(&provider, &scenario.schema, scenario.provider.clone())
            .with_hooks(&hook)
            .with_stub(scenario.stub)
            .compute_diff(input.with_previous_change(&change))
            .await?;

        let check = PlanChecker::new(&scenario.schema).check(&change, &actual.change)?;
        debug!("Apply pass check produced {} diagnostic(s)", check.len());
        diagnostics.append(actual.diagnostics);
        diagnostics.append(check);

        recorder
            .record(&scenario.addr, &actual.change.generation(), Some(&actual.change))
            .await?;
        title = String::from("Apply");
        change = actual.change;
    }

    Ok(PlanReport {
        title,
        nodes: node_summaries(&change, &[NodeRole::Destroy, NodeRole::Apply]),
        change: Some(change),
        records: changes.records().await,
        diagnostics,
    })
}

/// Plans the deletion of the scenario's recorded object.
///
/// `deposed` overrides the deposed key recorded in the scenario.
///
/// # Errors
///
/// Returns an error if the scenario cannot be decoded or a hook aborts the
/// diff.
pub async fn destroy_scenario(scenario: &Scenario, deposed: Option<DeposedKey>) -> Result<PlanReport> {
    let prior = scenario.prior_object()?;
    let deposed = deposed.or_else(|| scenario.deposed_key().cloned());
    let generation = Generation::from_deposed(deposed.as_ref());
    let provider = ScriptedProvider::new();
    let hook = LoggingHook;

    info!("Planning destruction of {} ({generation})", scenario.addr);
    let change = DiffEngine::new(&provider, &scenario.schema, scenario.provider.clone())
        .with_hooks(&hook)
        .with_stub(scenario.stub)
        .compute_destroy(&scenario.addr, deposed.as_ref(), prior.as_ref())?;

    let changes = ChangeSet::new();
    ChangeRecorder::new(changes.clone(), &scenario.schema)
        .record(&scenario.addr, &generation, change.as_ref())
        .await?;

    Ok(PlanReport {
        title: String::from("Destroy"),
        nodes: change
            .as_ref()
            .map(|c| node_summaries(c, &[NodeRole::Destroy]))
            .unwrap_or_default(),
        change,
        records: changes.records().await,
        diagnostics: Diagnostics::new(),
    })
}

fn node_summaries(change: &ResourceInstanceChange, roles: &[NodeRole]) -> Vec<NodeSummary> {
    roles
        .iter()
        .map(|&role| NodeSummary {
            role,
            action: reduce(change, role).action,
        })
        .collect()
}
