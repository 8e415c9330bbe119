//! A provider that replays scripted responses.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::debug;

use super::{PlanRequest, PlanResponse, Provider, ValidateRequest};
use crate::error::Diagnostics;
use crate::value::{Path, PathSet};

/// One scripted answer to a plan request.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedPlan {
    /// Return this response as-is.
    Respond(PlanResponse),
    /// Plan the proposed value, with `unknown` locations left unknown.
    Echo {
        /// Locations the provider leaves unknown.
        unknown: PathSet,
        /// Attributes whose change forces replacement.
        requires_replace: Vec<Path>,
    },
}

impl ScriptedPlan {
    fn answer(self, request: &PlanRequest) -> PlanResponse {
        match self {
            Self::Respond(response) => response,
            Self::Echo {
                unknown,
                requires_replace,
            } => PlanResponse::planned(request.proposed_new_state.with_unknowns(&unknown))
                .with_private(request.prior_private.clone())
                .with_requires_replace(requires_replace),
        }
    }
}

/// Replays scripted validation and plan responses in order, and records every
/// request it receives.
///
/// Once the plan script runs out, the proposed value is planned unchanged.
/// Once the validation script runs out, every configuration is valid.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    plans: Mutex<VecDeque<ScriptedPlan>>,
    validations: Mutex<VecDeque<Diagnostics>>,
    plan_requests: Mutex<Vec<PlanRequest>>,
    validate_requests: Mutex<Vec<ValidateRequest>>,
}

impl ScriptedProvider {
    /// Creates a provider with empty scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider that answers plan requests with `plans` in order.
    #[must_use]
    pub fn with_plans(plans: impl IntoIterator<Item = ScriptedPlan>) -> Self {
        Self {
            plans: Mutex::new(plans.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Queues a plan answer.
    pub async fn push_plan(&self, plan: ScriptedPlan) {
        self.plans.lock().await.push_back(plan);
    }

    /// Queues a validation answer.
    pub async fn push_validation(&self, diagnostics: Diagnostics) {
        self.validations.lock().await.push_back(diagnostics);
    }

    /// Plan requests received so far.
    pub async fn plan_requests(&self) -> Vec<PlanRequest> {
        self.plan_requests.lock().await.clone()
    }

    /// Validation requests received so far.
    pub async fn validate_requests(&self) -> Vec<ValidateRequest> {
        self.validate_requests.lock().await.clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn validate_resource_config(&self, request: ValidateRequest) -> Diagnostics {
        self.validate_requests.lock().await.push(request);
        self.validations.lock().await.pop_front().unwrap_or_default()
    }

    async fn plan_resource_change(&self, request: PlanRequest) -> PlanResponse {
        let scripted = self.plans.lock().await.pop_front();
        let response = match scripted {
            Some(plan) => plan.answer(&request),
            None => {
                debug!("Plan script exhausted for {}, echoing proposed value", request.type_name);
                ScriptedPlan::Echo {
                    unknown: PathSet::new(),
                    requires_replace: Vec::new(),
                }
                .answer(&request)
            }
        };
        self.plan_requests.lock().await.push(request);
        response
    }
}
