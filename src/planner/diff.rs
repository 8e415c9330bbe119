//! Diff engine for planning changes to resource instances.
//!
//! This module asks the provider to plan a change from a prior object and the
//! desired configuration, verifies the provider's answer, and classifies the
//! result into an [`Action`]. Destruction is planned without consulting the
//! provider.

use tracing::{debug, trace, warn};

use super::assert::{assert_plan_valid, redact_sensitive};
use super::change::{Action, ResourceInstanceChange};
use super::ignore::filter_ignored;
use super::proposed::proposed_new_object;
use crate::config::ResourceConfig;
use crate::error::{ConfigError, Diagnostic, Diagnostics, Fault, Result};
use crate::hooks::{DiffHook, NoopHook};
use crate::provider::{PlanRequest, PlanResponse, Provider, ValidateRequest};
use crate::schema::{ProviderSchema, Schema};
use crate::state::{
    DeposedKey, Generation, ObjectStatus, ProviderAddr, ResourceInstanceAddr,
    ResourceInstanceObject,
};
use crate::value::{Marks, Path, PathError, PathSet, Type, Value};

const PROVIDER_BUG: &str =
    "This is a bug in the provider, which should be reported in the provider's own issue tracker.";

/// Engine computing planned changes for resource instances.
///
/// The engine only holds shared references, so one engine can diff disjoint
/// instances concurrently.
pub struct DiffEngine<'a> {
    /// Provider planning the changes.
    provider: &'a dyn Provider,
    /// Schemas published by the provider.
    schemas: &'a ProviderSchema,
    /// Provider configuration managing the instances.
    provider_addr: ProviderAddr,
    /// Hook sink notified around each diff.
    hooks: &'a dyn DiffHook,
    /// Read-only preview: hooks are not called.
    stub: bool,
}

/// Input of one [`DiffEngine::compute_diff`] call.
#[derive(Debug, Clone, Copy)]
pub struct DiffInput<'a> {
    /// Instance being planned.
    pub addr: &'a ResourceInstanceAddr,
    /// Current object of the instance, if any.
    pub prior: Option<&'a ResourceInstanceObject>,
    /// Desired configuration.
    pub config: &'a ResourceConfig,
    /// Create the replacement before destroying the prior object.
    pub create_before_destroy: bool,
    /// Change planned for this instance by an earlier pass.
    pub previous_change: Option<&'a ResourceInstanceChange>,
}

impl<'a> DiffInput<'a> {
    /// Creates an input planning `config` for an instance with no prior object.
    #[must_use]
    pub const fn new(addr: &'a ResourceInstanceAddr, config: &'a ResourceConfig) -> Self {
        Self {
            addr,
            prior: None,
            config,
            create_before_destroy: false,
            previous_change: None,
        }
    }

    /// Sets the prior object.
    #[must_use]
    pub const fn with_prior(mut self, prior: &'a ResourceInstanceObject) -> Self {
        self.prior = Some(prior);
        self
    }

    /// Sets the replacement order.
    #[must_use]
    pub const fn with_create_before_destroy(mut self, create_before_destroy: bool) -> Self {
        self.create_before_destroy = create_before_destroy;
        self
    }

    /// Sets the change planned by an earlier pass.
    #[must_use]
    pub const fn with_previous_change(mut self, change: &'a ResourceInstanceChange) -> Self {
        self.previous_change = Some(change);
        self
    }
}

/// Result of a successful diff.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOutcome {
    /// The planned change.
    pub change: ResourceInstanceChange,
    /// Object the instance is expected to hold once the change is applied.
    pub planned_state: ResourceInstanceObject,
    /// Warnings gathered along the way.
    pub diagnostics: Diagnostics,
}

impl<'a> DiffEngine<'a> {
    /// Creates a diff engine.
    #[must_use]
    pub fn new(
        provider: &'a dyn Provider,
        schemas: &'a ProviderSchema,
        provider_addr: ProviderAddr,
    ) -> Self {
        Self {
            provider,
            schemas,
            provider_addr,
            hooks: &NoopHook,
            stub: false,
        }
    }

    /// Sets the hook sink.
    #[must_use]
    pub fn with_hooks(mut self, hooks: &'a dyn DiffHook) -> Self {
        self.hooks = hooks;
        self
    }

    /// Enables or disables stub mode.
    #[must_use]
    pub fn with_stub(mut self, stub: bool) -> Self {
        self.stub = stub;
        self
    }

    /// Provider configuration managing the instances.
    #[must_use]
    pub const fn provider_addr(&self) -> &ProviderAddr {
        &self.provider_addr
    }

    /// Plans the change that brings an instance to its desired configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource type is unsupported, the provider
    /// rejects the configuration, the provider's plan is invalid, or a hook
    /// aborts the diff.
    ///
    /// # Panics
    ///
    /// Panics if the provider address has no provider type or the provider
    /// returns no planned value.
    #[allow(clippy::too_many_lines)]
    pub async fn compute_diff(&self, input: DiffInput<'_>) -> Result<DiffOutcome> {
        let DiffInput {
            addr,
            prior,
            config,
            create_before_destroy,
            previous_change,
        } = input;

        self.require_provider_type(addr, None);
        let schema = self.schema_for(addr)?;
        let provider_meta = self.provider_meta(addr, config)?;

        // Once a replace order was planned it must not be re-derived.
        let create_before_destroy = previous_change.map_or(create_before_destroy, |prev| {
            prev.action == Action::CreateThenDelete
        });

        let null_prior = Value::null(schema.implied_type());
        let tainted = prior.filter(|obj| obj.is_tainted());
        let (mut before, mut before_marks) = match prior {
            Some(obj) if !obj.is_tainted() => (obj.value.clone(), obj.marks.clone()),
            _ => (null_prior.clone(), Marks::new()),
        };
        let prior_private = prior
            .filter(|obj| !obj.is_tainted())
            .map(|obj| obj.private.clone())
            .unwrap_or_default();

        let mut diags = self
            .provider
            .validate_resource_config(ValidateRequest {
                type_name: addr.resource_type.clone(),
                config: config.value.clone(),
            })
            .await;
        if diags.has_errors() {
            return Err(diags.into());
        }

        let effective_config = filter_ignored(&before, &config.value, &config.ignore);
        let proposed = proposed_new_object(schema, &before, &effective_config);

        if !self.stub {
            self.hooks
                .pre_diff(addr, &Generation::Current, &before, &proposed)?;
        }

        trace!("Planning {addr} with {}", self.provider_addr);
        let response = self
            .plan(
                addr,
                PlanRequest {
                    type_name: addr.resource_type.clone(),
                    config: effective_config.clone(),
                    prior_state: before.clone(),
                    proposed_new_state: proposed,
                    prior_private,
                    provider_meta: provider_meta.clone(),
                },
            )
            .await;
        let PlanResponse {
            planned_state,
            planned_private: mut private,
            requires_replace,
            legacy_type_system,
            diagnostics,
        } = response;
        diags.append(diagnostics);
        if diags.has_errors() {
            return Err(diags.into());
        }
        let mut planned = self.require_planned(addr, planned_state);

        self.check_conformance(addr, schema, &planned, &config.marks, &mut diags);
        if diags.has_errors() {
            return Err(diags.into());
        }

        let errs = assert_plan_valid(schema, &before, &effective_config, &planned);
        if !errs.is_empty() {
            let errs = redact_sensitive(errs, &config.marks);
            if legacy_type_system {
                let problems: String = errs
                    .iter()
                    .map(|err| format!("\n      - {}", err.prefixed(&addr.to_string())))
                    .collect();
                warn!(
                    "Provider {} produced an invalid plan for {addr}, but we are tolerating it because it is using the legacy plugin SDK.\n    The following problems may be the cause of any confusing errors from downstream operations:{problems}",
                    self.provider_addr.source
                );
            } else {
                for err in &errs {
                    diags.push(self.invalid_plan(addr, err));
                }
                return Err(diags.into());
            }
        }

        // Legacy providers may echo ignored values back in mutated form.
        if legacy_type_system {
            planned = filter_ignored(&before, &planned, &config.ignore);
        }

        let mut after_marks = config.marks.filter_to(&planned);

        let required_replace =
            self.required_replace(addr, &before, &planned, &requires_replace, &mut diags);
        if diags.has_errors() {
            return Err(diags.into());
        }

        let mut action = if before.is_null() {
            Action::Create
        } else if planned.equals(&before) == Some(true) {
            Action::NoOp
        } else if !required_replace.is_empty() {
            Action::replace(create_before_destroy)
        } else {
            Action::Update
        };
        trace!("Provider planned {action} for {addr}");

        if action.is_replace() {
            // The replacement is planned as a fresh object, from the
            // configuration as written.
            let response = self
                .plan(
                    addr,
                    PlanRequest {
                        type_name: addr.resource_type.clone(),
                        config: config.value.clone(),
                        prior_state: null_prior.clone(),
                        proposed_new_state: proposed_new_object(schema, &null_prior, &config.value),
                        prior_private: private,
                        provider_meta,
                    },
                )
                .await;
            if response.diagnostics.has_errors() {
                diags.append(response.diagnostics);
                return Err(diags.into());
            }
            planned = self.require_planned(addr, response.planned_state);
            private = response.planned_private;
            after_marks = config.marks.filter_to(&planned);

            self.check_conformance(addr, schema, &planned, &config.marks, &mut diags);
            if diags.has_errors() {
                return Err(diags.into());
            }
        }

        if let Some(obj) = tainted.filter(|obj| !obj.value.is_null()) {
            if action == Action::Create {
                action = Action::replace(create_before_destroy);
                before = obj.value.clone();
                before_marks = obj.marks.clone();
            }
        }

        if action == Action::NoOp && before_marks.sensitive_paths() != after_marks.sensitive_paths()
        {
            debug!("Sensitivity of {addr} changed, planning an update");
            action = Action::Update;
        }

        // During apply the prior object of a replace is already gone.
        if let Some(prev) = previous_change {
            if prev.action.is_replace() && action == Action::Create {
                trace!(
                    "{addr} has action {action} but previous change was {}, keeping the replace",
                    prev.action
                );
                action = prev.action;
                before = prev.before.clone();
                before_marks = prev.before_marks.clone();
            }
        }

        if !self.stub {
            self.hooks
                .post_diff(addr, &Generation::Current, action, &before, &planned)?;
        }

        debug!("Planned {} {addr}: {action}", action.symbol());

        let planned_state = ResourceInstanceObject::new(planned.clone())
            .with_status(ObjectStatus::Planned)
            .with_marks(after_marks.clone())
            .with_private(private.clone());
        let change = ResourceInstanceChange {
            addr: addr.clone(),
            deposed_key: None,
            provider_addr: self.provider_addr.clone(),
            action,
            before,
            after: planned,
            before_marks,
            after_marks,
            private,
            required_replace,
        };

        Ok(DiffOutcome {
            change,
            planned_state,
            diagnostics: diags,
        })
    }

    /// Plans the deletion of an object.
    ///
    /// Returns `None` when there is nothing left to delete.
    ///
    /// # Errors
    ///
    /// Returns an error if a hook aborts the diff.
    ///
    /// # Panics
    ///
    /// Panics if the provider address has no provider type.
    pub fn compute_destroy(
        &self,
        addr: &ResourceInstanceAddr,
        deposed: Option<&DeposedKey>,
        prior: Option<&ResourceInstanceObject>,
    ) -> Result<Option<ResourceInstanceChange>> {
        self.require_provider_type(addr, deposed);

        let Some(prior) = prior.filter(|obj| !obj.value.is_null()) else {
            trace!("{addr} is already absent, nothing to destroy");
            return Ok(None);
        };

        let generation = Generation::from_deposed(deposed);
        let after = Value::null(Type::Dynamic);

        self.hooks.pre_diff(addr, &generation, &prior.value, &after)?;

        let change = ResourceInstanceChange {
            addr: addr.clone(),
            deposed_key: deposed.cloned(),
            provider_addr: self.provider_addr.clone(),
            action: Action::Delete,
            before: prior.value.clone(),
            after,
            before_marks: prior.marks.clone(),
            after_marks: Marks::new(),
            private: prior.private.clone(),
            required_replace: PathSet::new(),
        };

        self.hooks
            .post_diff(addr, &generation, Action::Delete, &change.before, &change.after)?;

        debug!("Planned {} {}: {}", Action::Delete.symbol(), change.display_addr(), Action::Delete);
        Ok(Some(change))
    }

    #[allow(clippy::panic)]
    fn require_provider_type(&self, addr: &ResourceInstanceAddr, deposed: Option<&DeposedKey>) {
        if self.provider_addr.provider_type().is_empty() {
            match deposed {
                Some(key) => panic!(
                    "bug in diff computation: {addr} (deposed {key}) has no provider type"
                ),
                None => panic!("bug in diff computation: {addr} has no provider type"),
            }
        }
    }

    #[allow(clippy::panic)]
    fn require_planned(&self, addr: &ResourceInstanceAddr, planned: Option<Value>) -> Value {
        match planned {
            Some(value) => value,
            None => panic!(
                "bug in provider client: provider {} produced nil value for {addr}",
                self.provider_addr.source
            ),
        }
    }

    fn schema_for(&self, addr: &ResourceInstanceAddr) -> Result<&'a Schema> {
        self.schemas
            .schema_for(&addr.resource_type)
            .ok_or_else(|| {
                ConfigError::UnsupportedResourceType {
                    type_name: addr.resource_type.clone(),
                }
                .into()
            })
    }

    fn provider_meta(&self, addr: &ResourceInstanceAddr, config: &ResourceConfig) -> Result<Value> {
        match &config.provider_meta {
            Some(_) if self.schemas.provider_meta.is_none() => {
                Err(ConfigError::ProviderMetaUnsupported {
                    provider: self.provider_addr.source.clone(),
                    addr: addr.to_string(),
                }
                .into())
            }
            Some(meta) => Ok(meta.clone()),
            None => Ok(Value::null(Type::Dynamic)),
        }
    }

    async fn plan(&self, addr: &ResourceInstanceAddr, request: PlanRequest) -> PlanResponse {
        let prior_null = request.prior_state.is_null();
        let response = self.provider.plan_resource_change(request).await;
        trace!(
            "Provider answered plan for {addr} (prior null: {prior_null}, {} diagnostics)",
            response.diagnostics.len()
        );
        response
    }

    fn check_conformance(
        &self,
        addr: &ResourceInstanceAddr,
        schema: &Schema,
        planned: &Value,
        marks: &Marks,
        diags: &mut Diagnostics,
    ) {
        let errs = planned.conformance_errors(&schema.implied_type());
        for err in redact_sensitive(errs, marks) {
            diags.push(self.invalid_plan(addr, &err));
        }
    }

    fn required_replace(
        &self,
        addr: &ResourceInstanceAddr,
        prior: &Value,
        planned: &Value,
        paths: &[Path],
        diags: &mut Diagnostics,
    ) -> PathSet {
        let mut required = PathSet::new();
        if prior.is_null() {
            return required;
        }

        for path in paths {
            let (prior_at, planned_at) = match (prior.get_path(path), planned.get_path(path)) {
                (Ok(p), Ok(n)) => (p, n),
                (Ok(p), Err(_)) => {
                    let n = Value::null(p.ty());
                    (p, n)
                }
                (Err(_), Ok(n)) => (Value::null(n.ty()), n),
                (Err(_), Err(_)) => {
                    diags.push(self.provider_bug(
                        "Provider produced invalid plan",
                        format!(
                            "Provider {:?} has indicated \"requires replacement\" on {addr} for a non-existent attribute path {path}.",
                            self.provider_addr.source
                        ),
                    ));
                    continue;
                }
            };
            if prior_at.equals(&planned_at) != Some(true) {
                required.insert(path.clone());
            }
        }

        required
    }

    fn invalid_plan(&self, addr: &ResourceInstanceAddr, err: &PathError) -> Diagnostic {
        self.provider_bug(
            "Provider produced invalid plan",
            format!(
                "Provider {:?} planned an invalid value for {}.",
                self.provider_addr.source,
                err.prefixed(&addr.to_string())
            ),
        )
    }

    fn provider_bug(&self, summary: &str, detail: String) -> Diagnostic {
        Diagnostic::error(Fault::Provider, summary, format!("{detail}\n\n{PROVIDER_BUG}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HalldyllError;
    use crate::hooks::testing::{HookCall, RecordingHook};
    use crate::planner::{IgnoreSpec, NodeRole, reduce};
    use crate::provider::{MockProvider, ScriptedPlan, ScriptedProvider};
    use crate::schema::Attribute;

    fn schema() -> Schema {
        Schema::new()
            .with_attribute("id", Attribute::computed(Type::String))
            .with_attribute("name", Attribute::required(Type::String))
            .with_attribute("size", Attribute::optional(Type::Number))
            .with_attribute("ami", Attribute::optional(Type::String))
            .with_attribute("tags", Attribute::optional(Type::map(Type::String)))
    }

    fn schemas() -> ProviderSchema {
        ProviderSchema::new().with_resource_type("acme_instance", schema())
    }

    fn addr() -> ResourceInstanceAddr {
        ResourceInstanceAddr::new("acme_instance", "web")
    }

    fn provider_addr() -> ProviderAddr {
        ProviderAddr::new("registry.example.com/acme/acme")
    }

    /// Object of the test schema with every unset attribute null.
    fn obj(attrs: &[(&str, Value)]) -> Value {
        let mut value = schema().all_attributes_null();
        if let Value::Object(map) = &mut value {
            for (name, attr) in attrs {
                map.insert((*name).to_string(), attr.clone());
            }
        }
        value
    }

    fn echo() -> ScriptedPlan {
        ScriptedPlan::Echo {
            unknown: PathSet::new(),
            requires_replace: Vec::new(),
        }
    }

    fn diags(err: &HalldyllError) -> &Diagnostics {
        err.diagnostics().unwrap()
    }

    #[tokio::test]
    async fn test_null_prior_creates() {
        let provider = ScriptedProvider::with_plans([ScriptedPlan::Echo {
            unknown: [Path::attr("id")].into_iter().collect(),
            requires_replace: Vec::new(),
        }]);
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let config = ResourceConfig::new(obj(&[("name", Value::string("x"))]));
        let addr = addr();

        let outcome = engine.compute_diff(DiffInput::new(&addr, &config)).await.unwrap();

        assert_eq!(outcome.change.action, Action::Create);
        assert!(outcome.change.before.is_null());
        assert_eq!(outcome.change.after.get_attr("id"), Some(Value::unknown(Type::String)));
        assert_eq!(outcome.change.after.get_attr("name"), Some(Value::string("x")));
        assert_eq!(outcome.planned_state.status, ObjectStatus::Planned);
        assert!(outcome.change.required_replace.is_empty());
    }

    #[tokio::test]
    async fn test_update_scenario() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let before = obj(&[("name", Value::string("a")), ("size", Value::number(1))]);
        let after = obj(&[("name", Value::string("a")), ("size", Value::number(2))]);
        let prior = ResourceInstanceObject::new(before.clone());
        let config = ResourceConfig::new(after.clone());
        let addr = addr();

        let outcome = engine
            .compute_diff(DiffInput::new(&addr, &config).with_prior(&prior))
            .await
            .unwrap();

        assert_eq!(outcome.change.action, Action::Update);
        assert_eq!(outcome.change.before, before);
        assert_eq!(outcome.change.after, after);
    }

    #[tokio::test]
    async fn test_plan_equal_to_prior_is_noop() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let value = obj(&[("id", Value::string("i-1")), ("name", Value::string("a"))]);
        let prior = ResourceInstanceObject::new(value.clone());
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]));
        let addr = addr();

        let outcome = engine
            .compute_diff(DiffInput::new(&addr, &config).with_prior(&prior))
            .await
            .unwrap();

        assert_eq!(outcome.change.action, Action::NoOp);
        assert_eq!(outcome.change.after, value);
    }

    #[tokio::test]
    async fn test_sensitivity_change_forces_update() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let prior = ResourceInstanceObject::new(obj(&[("name", Value::string("a"))]));
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]))
            .with_marks(Marks::sensitive([&Path::attr("name")]));
        let addr = addr();

        let outcome = engine
            .compute_diff(DiffInput::new(&addr, &config).with_prior(&prior))
            .await
            .unwrap();

        assert_eq!(outcome.change.action, Action::Update);
        assert!(outcome.change.after_marks.covers_sensitive(&Path::attr("name")));
        assert!(outcome.planned_state.marks.covers_sensitive(&Path::attr("name")));
    }

    #[tokio::test]
    async fn test_replanning_own_output_is_noop() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let config = ResourceConfig::new(obj(&[
            ("name", Value::string("a")),
            ("size", Value::number(3)),
        ]));
        let addr = addr();

        let first = engine.compute_diff(DiffInput::new(&addr, &config)).await.unwrap();
        let prior = first.planned_state.clone().with_status(ObjectStatus::Ready);
        let second = engine
            .compute_diff(DiffInput::new(&addr, &config).with_prior(&prior))
            .await
            .unwrap();

        assert_eq!(first.change.action, Action::Create);
        assert_eq!(second.change.action, Action::NoOp);
    }

    #[tokio::test]
    async fn test_tainted_prior_is_replaced() {
        for (create_before_destroy, expected) in
            [(false, Action::DeleteThenCreate), (true, Action::CreateThenDelete)]
        {
            let provider = ScriptedProvider::new();
            let schemas = schemas();
            let engine = DiffEngine::new(&provider, &schemas, provider_addr());
            let tainted = obj(&[("id", Value::string("i-1")), ("name", Value::string("a"))]);
            let prior = ResourceInstanceObject::new(tainted.clone())
                .with_status(ObjectStatus::Tainted)
                .with_private(vec![9, 9]);
            let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]));
            let addr = addr();

            let outcome = engine
                .compute_diff(
                    DiffInput::new(&addr, &config)
                        .with_prior(&prior)
                        .with_create_before_destroy(create_before_destroy),
                )
                .await
                .unwrap();

            assert_eq!(outcome.change.action, expected);
            assert_eq!(outcome.change.before, tainted);
            let requests = provider.plan_requests().await;
            assert_eq!(requests.len(), 1);
            assert!(requests[0].prior_state.is_null());
            assert!(requests[0].prior_private.is_empty());
        }
    }

    #[tokio::test]
    async fn test_tainted_null_prior_is_created() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let prior =
            ResourceInstanceObject::new(Value::null(Type::Dynamic)).with_status(ObjectStatus::Tainted);
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]));
        let addr = addr();

        let outcome = engine
            .compute_diff(DiffInput::new(&addr, &config).with_prior(&prior))
            .await
            .unwrap();

        assert_eq!(outcome.change.action, Action::Create);
        assert!(outcome.change.before.is_null());
        assert_eq!(reduce(&outcome.change, NodeRole::Destroy).action, Action::NoOp);
    }

    #[tokio::test]
    async fn test_requires_replace_replans_from_null_prior() {
        let provider = ScriptedProvider::with_plans([
            ScriptedPlan::Echo {
                unknown: PathSet::new(),
                requires_replace: vec![Path::attr("ami")],
            },
            ScriptedPlan::Echo {
                unknown: [Path::attr("id")].into_iter().collect(),
                requires_replace: Vec::new(),
            },
        ]);
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let before = obj(&[
            ("id", Value::string("i-1")),
            ("name", Value::string("web")),
            ("ami", Value::string("old")),
        ]);
        let prior = ResourceInstanceObject::new(before.clone()).with_private(vec![7]);
        let config = ResourceConfig::new(obj(&[
            ("name", Value::string("web")),
            ("ami", Value::string("new")),
        ]));
        let addr = addr();

        let outcome = engine
            .compute_diff(DiffInput::new(&addr, &config).with_prior(&prior))
            .await
            .unwrap();

        assert_eq!(outcome.change.action, Action::DeleteThenCreate);
        assert_eq!(outcome.change.before, before);
        assert_eq!(outcome.change.after.get_attr("id"), Some(Value::unknown(Type::String)));
        assert_eq!(outcome.change.after.get_attr("ami"), Some(Value::string("new")));
        assert!(outcome.change.required_replace.contains(&Path::attr("ami")));

        let requests = provider.plan_requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].prior_state, before);
        assert!(requests[1].prior_state.is_null());
        assert_eq!(requests[1].prior_private, vec![7]);
        assert_eq!(requests[1].proposed_new_state.get_attr("id"), Some(Value::null(Type::String)));
    }

    #[tokio::test]
    async fn test_unchanged_requires_replace_path_is_dropped() {
        let provider = ScriptedProvider::with_plans([ScriptedPlan::Echo {
            unknown: PathSet::new(),
            requires_replace: vec![Path::attr("name")],
        }]);
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let prior = ResourceInstanceObject::new(obj(&[
            ("name", Value::string("a")),
            ("size", Value::number(1)),
        ]));
        let config = ResourceConfig::new(obj(&[
            ("name", Value::string("a")),
            ("size", Value::number(2)),
        ]));
        let addr = addr();

        let outcome = engine
            .compute_diff(DiffInput::new(&addr, &config).with_prior(&prior))
            .await
            .unwrap();

        assert_eq!(outcome.change.action, Action::Update);
        assert!(outcome.change.required_replace.is_empty());
    }

    #[tokio::test]
    async fn test_requires_replace_on_missing_path_is_provider_bug() {
        let provider = ScriptedProvider::with_plans([ScriptedPlan::Echo {
            unknown: PathSet::new(),
            requires_replace: vec![Path::attr("nope")],
        }]);
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let prior = ResourceInstanceObject::new(obj(&[("name", Value::string("a"))]));
        let config = ResourceConfig::new(obj(&[("name", Value::string("b"))]));
        let addr = addr();

        let err = engine
            .compute_diff(DiffInput::new(&addr, &config).with_prior(&prior))
            .await
            .unwrap_err();

        let diag = diags(&err).iter().next().unwrap();
        assert_eq!(diag.fault, Fault::Provider);
        assert!(diag.detail.contains("non-existent attribute path nope"));
        assert!(diag.detail.contains(PROVIDER_BUG));
    }

    #[tokio::test]
    async fn test_invalid_plan_is_rejected() {
        let planned = obj(&[("name", Value::string("other"))]);
        let provider =
            ScriptedProvider::with_plans([ScriptedPlan::Respond(PlanResponse::planned(planned))]);
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]));
        let addr = addr();

        let err = engine.compute_diff(DiffInput::new(&addr, &config)).await.unwrap_err();

        let diag = diags(&err).iter().next().unwrap();
        assert_eq!(diag.summary, "Provider produced invalid plan");
        assert!(diag.detail.contains("acme_instance.web.name: planned value \"other\" does not match config value \"a\""));
    }

    #[tokio::test]
    async fn test_invalid_plan_redacts_sensitive_values() {
        let planned = obj(&[("name", Value::string("leaked"))]);
        let provider =
            ScriptedProvider::with_plans([ScriptedPlan::Respond(PlanResponse::planned(planned))]);
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let config = ResourceConfig::new(obj(&[("name", Value::string("secret"))]))
            .with_marks(Marks::sensitive([&Path::attr("name")]));
        let addr = addr();

        let err = engine.compute_diff(DiffInput::new(&addr, &config)).await.unwrap_err();

        let detail = &diags(&err).iter().next().unwrap().detail;
        assert!(!detail.contains("secret"));
        assert!(!detail.contains("leaked"));
    }

    #[tokio::test]
    async fn test_legacy_provider_invalid_plan_is_tolerated() {
        let prior_value = obj(&[("name", Value::string("a")), ("size", Value::number(1))]);
        let planned = obj(&[("name", Value::string("A")), ("size", Value::number(2))]);
        let provider = ScriptedProvider::with_plans([ScriptedPlan::Respond(
            PlanResponse::planned(planned.clone()).with_legacy_type_system(),
        )]);
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let prior = ResourceInstanceObject::new(prior_value);
        let config = ResourceConfig::new(obj(&[
            ("name", Value::string("b")),
            ("size", Value::number(2)),
        ]));
        let addr = addr();

        let outcome = engine
            .compute_diff(DiffInput::new(&addr, &config).with_prior(&prior))
            .await
            .unwrap();

        assert_eq!(outcome.change.action, Action::Update);
        assert_eq!(outcome.change.after, planned);
    }

    #[tokio::test]
    async fn test_legacy_plan_is_filtered_for_ignored_paths() {
        let prior_value = obj(&[("name", Value::string("a")), ("size", Value::number(1))]);
        let planned = obj(&[("name", Value::string("a")), ("size", Value::number(9))]);
        let provider = ScriptedProvider::with_plans([ScriptedPlan::Respond(
            PlanResponse::planned(planned).with_legacy_type_system(),
        )]);
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let prior = ResourceInstanceObject::new(prior_value.clone());
        let config = ResourceConfig::new(obj(&[
            ("name", Value::string("a")),
            ("size", Value::number(2)),
        ]))
        .with_ignore(IgnoreSpec::Paths(vec![Path::attr("size")]));
        let addr = addr();

        let outcome = engine
            .compute_diff(DiffInput::new(&addr, &config).with_prior(&prior))
            .await
            .unwrap();

        assert_eq!(outcome.change.action, Action::NoOp);
        assert_eq!(outcome.change.after, prior_value);
    }

    #[tokio::test]
    async fn test_nonconforming_plan_is_rejected() {
        let planned = Value::object([("name", Value::string("a"))]);
        let provider =
            ScriptedProvider::with_plans([ScriptedPlan::Respond(PlanResponse::planned(planned))]);
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]));
        let addr = addr();

        let err = engine.compute_diff(DiffInput::new(&addr, &config)).await.unwrap_err();

        assert!(diags(&err).has_errors());
        assert!(diags(&err).iter().all(|d| d.fault == Fault::Provider));
    }

    #[tokio::test]
    async fn test_ignore_changes_reach_provider() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let tags = |pairs: &[(&str, &str)]| {
            Value::map(Type::String, pairs.iter().map(|(k, v)| (*k, Value::string(*v))))
        };
        let prior = ResourceInstanceObject::new(obj(&[
            ("name", Value::string("a")),
            ("tags", tags(&[("a", "1")])),
        ]));
        let config = ResourceConfig::new(obj(&[
            ("name", Value::string("a")),
            ("tags", tags(&[("a", "2"), ("b", "3")])),
        ]))
        .with_ignore(IgnoreSpec::Paths(vec![r#"tags["a"]"#.parse().unwrap()]));
        let addr = addr();

        let outcome = engine
            .compute_diff(DiffInput::new(&addr, &config).with_prior(&prior))
            .await
            .unwrap();

        let requests = provider.plan_requests().await;
        assert_eq!(requests[0].config.get_attr("tags"), Some(tags(&[("a", "1"), ("b", "3")])));
        assert_eq!(outcome.change.action, Action::Update);
    }

    #[tokio::test]
    async fn test_validation_error_aborts_before_planning() {
        let provider = ScriptedProvider::new();
        provider
            .push_validation(Diagnostic::error(Fault::Config, "Invalid name", "too long").into())
            .await;
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]));
        let addr = addr();

        let err = engine.compute_diff(DiffInput::new(&addr, &config)).await.unwrap_err();

        assert_eq!(diags(&err).iter().next().unwrap().summary, "Invalid name");
        assert!(provider.plan_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_plan_warnings_are_kept() {
        let provider = ScriptedProvider::new();
        provider
            .push_validation(Diagnostic::warning(Fault::Config, "Deprecated", "use b").into())
            .await;
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]));
        let addr = addr();

        let outcome = engine.compute_diff(DiffInput::new(&addr, &config)).await.unwrap();

        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(!outcome.diagnostics.has_errors());
    }

    #[tokio::test]
    async fn test_hooks_see_proposed_and_final_values() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let hooks = RecordingHook::default();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr()).with_hooks(&hooks);
        let prior_value = obj(&[("id", Value::string("i-1")), ("name", Value::string("a"))]);
        let prior = ResourceInstanceObject::new(prior_value.clone());
        let config = ResourceConfig::new(obj(&[("name", Value::string("b"))]));
        let addr = addr();

        let outcome = engine
            .compute_diff(DiffInput::new(&addr, &config).with_prior(&prior))
            .await
            .unwrap();

        let expected_after = obj(&[("id", Value::string("i-1")), ("name", Value::string("b"))]);
        assert_eq!(
            hooks.calls(),
            vec![
                HookCall::Pre {
                    generation: Generation::Current,
                    before: prior_value.clone(),
                    proposed: expected_after.clone(),
                },
                HookCall::Post {
                    generation: Generation::Current,
                    action: Action::Update,
                    before: prior_value,
                    after: expected_after,
                },
            ]
        );
        assert_eq!(outcome.change.action, Action::Update);
    }

    #[tokio::test]
    async fn test_hook_error_aborts() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let hooks = RecordingHook {
            fail_pre: true,
            ..RecordingHook::default()
        };
        let engine = DiffEngine::new(&provider, &schemas, provider_addr()).with_hooks(&hooks);
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]));
        let addr = addr();

        let err = engine.compute_diff(DiffInput::new(&addr, &config)).await.unwrap_err();

        assert!(matches!(err, HalldyllError::Hook(_)));
        assert_eq!(err.to_string(), "stopped by hook");
        assert!(provider.plan_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_stub_mode_skips_hooks() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let hooks = RecordingHook {
            fail_pre: true,
            ..RecordingHook::default()
        };
        let engine = DiffEngine::new(&provider, &schemas, provider_addr())
            .with_hooks(&hooks)
            .with_stub(true);
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]));
        let addr = addr();

        let outcome = engine.compute_diff(DiffInput::new(&addr, &config)).await.unwrap();

        assert_eq!(outcome.change.action, Action::Create);
        assert!(hooks.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_resource_type() {
        let provider = ScriptedProvider::new();
        let schemas = ProviderSchema::new();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]));
        let addr = addr();

        let err = engine.compute_diff(DiffInput::new(&addr, &config)).await.unwrap_err();

        assert!(matches!(
            err,
            HalldyllError::Config(ConfigError::UnsupportedResourceType { .. })
        ));
    }

    #[tokio::test]
    async fn test_provider_meta_requires_schema() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]))
            .with_provider_meta(Value::object([("module", Value::string("m"))]));
        let addr = addr();

        let err = engine.compute_diff(DiffInput::new(&addr, &config)).await.unwrap_err();

        assert!(matches!(
            err,
            HalldyllError::Config(ConfigError::ProviderMetaUnsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_provider_meta_is_forwarded() {
        let provider = ScriptedProvider::new();
        let schemas = schemas().with_provider_meta(
            Schema::new().with_attribute("module", Attribute::optional(Type::String)),
        );
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let meta = Value::object([("module", Value::string("m"))]);
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]))
            .with_provider_meta(meta.clone());
        let addr = addr();

        engine.compute_diff(DiffInput::new(&addr, &config)).await.unwrap();

        assert_eq!(provider.plan_requests().await[0].provider_meta, meta);
    }

    #[tokio::test]
    #[should_panic(expected = "produced nil value")]
    async fn test_nil_plan_panics() {
        let provider =
            ScriptedProvider::with_plans([ScriptedPlan::Respond(PlanResponse::nil())]);
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]));
        let addr = addr();

        let _ = engine.compute_diff(DiffInput::new(&addr, &config)).await;
    }

    #[tokio::test]
    async fn test_previous_replace_is_kept_during_apply() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let old = obj(&[("id", Value::string("i-1")), ("name", Value::string("a"))]);
        let previous = ResourceInstanceChange {
            addr: addr(),
            deposed_key: None,
            provider_addr: provider_addr(),
            action: Action::CreateThenDelete,
            before: old.clone(),
            after: obj(&[("id", Value::unknown(Type::String)), ("name", Value::string("b"))]),
            before_marks: Marks::new(),
            after_marks: Marks::new(),
            private: Vec::new(),
            required_replace: PathSet::new(),
        };
        let config = ResourceConfig::new(obj(&[("name", Value::string("b"))]));
        let addr = addr();

        let outcome = engine
            .compute_diff(DiffInput::new(&addr, &config).with_previous_change(&previous))
            .await
            .unwrap();

        assert_eq!(outcome.change.action, Action::CreateThenDelete);
        assert_eq!(outcome.change.before, old);
    }

    #[tokio::test]
    async fn test_previous_change_decides_replace_order() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let prior = ResourceInstanceObject::new(obj(&[("name", Value::string("a"))]))
            .with_status(ObjectStatus::Tainted);
        let previous = ResourceInstanceChange {
            addr: addr(),
            deposed_key: None,
            provider_addr: provider_addr(),
            action: Action::DeleteThenCreate,
            before: prior.value.clone(),
            after: obj(&[("name", Value::string("a"))]),
            before_marks: Marks::new(),
            after_marks: Marks::new(),
            private: Vec::new(),
            required_replace: PathSet::new(),
        };
        let config = ResourceConfig::new(obj(&[("name", Value::string("a"))]));
        let addr = addr();

        let outcome = engine
            .compute_diff(
                DiffInput::new(&addr, &config)
                    .with_prior(&prior)
                    .with_create_before_destroy(true)
                    .with_previous_change(&previous),
            )
            .await
            .unwrap();

        assert_eq!(outcome.change.action, Action::DeleteThenCreate);
    }

    #[tokio::test]
    async fn test_update_makes_one_provider_round_trip() {
        let mut provider = MockProvider::new();
        provider
            .expect_validate_resource_config()
            .times(1)
            .returning(|_| Diagnostics::new());
        provider
            .expect_plan_resource_change()
            .times(1)
            .returning(|request| PlanResponse::planned(request.proposed_new_state));
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr());
        let prior = ResourceInstanceObject::new(obj(&[("name", Value::string("a"))]));
        let config = ResourceConfig::new(obj(&[("name", Value::string("b"))]));
        let addr = addr();

        let outcome = engine
            .compute_diff(DiffInput::new(&addr, &config).with_prior(&prior))
            .await
            .unwrap();

        assert_eq!(outcome.change.action, Action::Update);
    }

    #[test]
    fn test_destroy_without_prior_is_noop() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let hooks = RecordingHook::default();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr()).with_hooks(&hooks);

        assert!(engine.compute_destroy(&addr(), None, None).unwrap().is_none());
        let gone = ResourceInstanceObject::new(Value::null(schema().implied_type()));
        assert!(engine.compute_destroy(&addr(), None, Some(&gone)).unwrap().is_none());
        assert!(hooks.calls().is_empty());
    }

    #[test]
    fn test_destroy_deposed_object() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let hooks = RecordingHook::default();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr()).with_hooks(&hooks);
        let key = DeposedKey::new("00000001");
        let value = obj(&[("id", Value::string("i-1")), ("name", Value::string("a"))]);
        let prior = ResourceInstanceObject::new(value.clone())
            .with_marks(Marks::sensitive([&Path::attr("name")]))
            .with_private(vec![1, 2]);

        let change = engine
            .compute_destroy(&addr(), Some(&key), Some(&prior))
            .unwrap()
            .unwrap();

        assert_eq!(change.action, Action::Delete);
        assert_eq!(change.before, value);
        assert!(change.after.is_null());
        assert_eq!(change.deposed_key, Some(key.clone()));
        assert_eq!(change.private, vec![1, 2]);
        assert_eq!(change.before_marks, prior.marks);

        let calls = hooks.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(
            &calls[1],
            HookCall::Post { generation: Generation::Deposed(k), action: Action::Delete, .. } if *k == key
        ));
    }

    #[test]
    fn test_destroy_hooks_run_in_stub_mode() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let hooks = RecordingHook::default();
        let engine = DiffEngine::new(&provider, &schemas, provider_addr())
            .with_hooks(&hooks)
            .with_stub(true);
        let prior = ResourceInstanceObject::new(obj(&[("name", Value::string("a"))]));

        engine.compute_destroy(&addr(), None, Some(&prior)).unwrap();

        assert_eq!(hooks.calls().len(), 2);
    }

    #[test]
    #[should_panic(expected = "has no provider type")]
    fn test_destroy_without_provider_type_panics() {
        let provider = ScriptedProvider::new();
        let schemas = schemas();
        let engine = DiffEngine::new(&provider, &schemas, ProviderAddr::new(""));
        let prior = ResourceInstanceObject::new(obj(&[("name", Value::string("a"))]));

        let _ = engine.compute_destroy(&addr(), None, Some(&prior));
    }
}
