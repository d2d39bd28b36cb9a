/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Evaluation of configured targets and aspect values.
//!
//! The free functions here compute a single value from scratch. All
//! recursion goes through [`AspectCalculation`], so the evaluator decides
//! memoization and re-use; [`crate::testing::InMemoryEvaluator`] is the
//! in-process implementation.

use std::sync::Arc;

use async_trait::async_trait;
use dupe::Dupe;
use itertools::Itertools;
use quarry_core::configuration::data::ConfigurationData;
use quarry_core::package::BuildFilePath;
use quarry_core::provider::id::ProviderId;
use quarry_core::provider::id::ProviderIdSet;
use quarry_core::target::configured_target_label::ConfiguredTargetLabel;
use quarry_core::target::label::TargetLabel;
use quarry_node::aspect::AspectDefinition;
use quarry_node::aspect::AspectId;
use quarry_node::aspect::AspectParameters;
use quarry_node::attrs::configuration_context::AttrConfigurationContext;
use quarry_node::attrs::configuration_context::AttrConfigurationContextImpl;
use quarry_node::attrs::configured_attr::ConfiguredAttr;
use quarry_node::nodes::targets_map::TargetGraph;
use quarry_node::nodes::unconfigured::RuleData;
use quarry_node::nodes::unconfigured::TargetNode;
use starlark_map::small_map::SmallMap;
use starlark_map::small_set::SmallSet;

use crate::events::AnalysisFailureEvent;
use crate::events::EventSink;
use crate::gate;
use crate::keep_going;
use crate::key::AspectKey;
use crate::planner;
use crate::resolve;
use crate::value::AspectValue;
use crate::value::ConfiguredTarget;
use crate::value::ProviderCollection;
use crate::value::RegisteredAction;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("no aspect registered for `{0}`")]
    UnknownAspect(AspectId),
    #[error("no rule implementation registered for `{0}`")]
    UnknownRuleType(String),
    #[error("cannot evaluate aspect `{0}`: `{1}` is not a rule target")]
    AspectKeyOnNonRule(AspectId, TargetLabel),
    #[error(
        "Aspect '{aspect}', applied to '{target}', does not provide advertised provider '{provider}'"
    )]
    MissingAdvertisedProvider {
        aspect: String,
        target: TargetLabel,
        provider: String,
    },
    #[error("{}", .0.iter().map(|e| e.to_string()).join("\n"))]
    AdvertisedProvidersMissing(Vec<AnalysisError>),
    #[error("attribute `{0}` of `{1}` is not a string attribute, cannot use it as an aspect parameter")]
    NonStringParamAttr(String, TargetLabel),
}

/// Recursive evaluation seam. An incremental evaluator implements this and
/// memoizes per key; [`compute_aspect_value`] and
/// [`compute_configured_target`] call back through it for every dependency.
#[async_trait]
pub trait AspectCalculation: Send + Sync {
    async fn aspect_value(&self, key: &AspectKey) -> anyhow::Result<AspectValue>;

    async fn configured_target(
        &self,
        label: &ConfiguredTargetLabel,
    ) -> anyhow::Result<ConfiguredTarget>;
}

/// Everything evaluation needs besides the evaluator itself.
pub struct AnalysisEnv<'a> {
    pub graph: &'a TargetGraph,
    pub registry: &'a AnalysisRegistry,
    pub events: &'a dyn EventSink,
}

/// Evaluation context handed to an aspect implementation.
pub struct AspectEvalCtx<'a> {
    key: &'a AspectKey,
    base: &'a ConfiguredTarget,
    prereqs: &'a [AspectValue],
    implicit_deps: &'a SmallMap<String, ConfiguredTarget>,
    providers: ProviderCollection,
    actions: Vec<RegisteredAction>,
}

impl<'a> AspectEvalCtx<'a> {
    pub fn key(&self) -> &'a AspectKey {
        self.key
    }

    /// The configured target the aspect is applied to.
    pub fn target(&self) -> &'a ConfiguredTarget {
        self.base
    }

    pub fn param(&self, name: &str) -> Option<&'a str> {
        self.key.params().get(name)
    }

    /// Values of this aspect on the dependencies it propagated to.
    pub fn prereqs(&self) -> &'a [AspectValue] {
        self.prereqs
    }

    pub fn implicit_dep(&self, attr: &str) -> Option<&'a ConfiguredTarget> {
        self.implicit_deps.get(attr)
    }

    pub fn add_provider(&mut self, id: ProviderId, value: &str) {
        self.providers.add(id, value);
    }

    pub fn register_action(&mut self, mnemonic: &str, outputs: &[&str]) {
        self.actions.push(RegisteredAction {
            owner: self.key.label().dupe(),
            mnemonic: Arc::from(mnemonic),
            outputs: outputs.iter().map(|o| Arc::from(*o)).collect(),
        });
    }
}

/// One dependency edge as seen by a rule implementation: the dependency's
/// own analysis plus the values of the aspects the rule attached to it.
pub struct DepView {
    pub attr: String,
    pub target: ConfiguredTarget,
    pub aspect_values: Vec<AspectValue>,
}

impl DepView {
    /// The dependency's providers with the attached aspects' providers
    /// merged in.
    pub fn merged_providers(&self) -> ProviderCollection {
        crate::merge::merge_providers(self.target.providers(), &self.aspect_values)
    }
}

/// Analysis context handed to a rule implementation.
pub struct RuleAnalysisCtx<'a> {
    label: &'a ConfiguredTargetLabel,
    node: &'a TargetNode,
    attrs: &'a SmallMap<String, ConfiguredAttr>,
    deps: &'a [DepView],
    providers: ProviderCollection,
    actions: Vec<RegisteredAction>,
}

impl<'a> RuleAnalysisCtx<'a> {
    pub fn label(&self) -> &'a ConfiguredTargetLabel {
        self.label
    }

    pub fn node(&self) -> &'a TargetNode {
        self.node
    }

    pub fn attr(&self, name: &str) -> Option<&'a ConfiguredAttr> {
        self.attrs.get(name)
    }

    pub fn deps(&self) -> &'a [DepView] {
        self.deps
    }

    pub fn add_provider(&mut self, id: ProviderId, value: &str) {
        self.providers.add(id, value);
    }

    pub fn register_action(&mut self, mnemonic: &str, outputs: &[&str]) {
        self.actions.push(RegisteredAction {
            owner: self.label.dupe(),
            mnemonic: Arc::from(mnemonic),
            outputs: outputs.iter().map(|o| Arc::from(*o)).collect(),
        });
    }
}

pub trait AspectImpl: Send + Sync {
    fn evaluate(&self, ctx: &mut AspectEvalCtx<'_>) -> anyhow::Result<()>;
}

pub trait RuleImpl: Send + Sync {
    fn analyze(&self, ctx: &mut RuleAnalysisCtx<'_>) -> anyhow::Result<()>;
}

pub struct AspectEntry {
    pub def: Arc<AspectDefinition>,
    pub imp: Arc<dyn AspectImpl>,
}

/// Registered rule and aspect implementations, by rule type and aspect id.
#[derive(Default)]
pub struct AnalysisRegistry {
    rules: SmallMap<String, Arc<dyn RuleImpl>>,
    aspects: SmallMap<AspectId, AspectEntry>,
}

impl AnalysisRegistry {
    pub fn new() -> AnalysisRegistry {
        AnalysisRegistry::default()
    }

    pub fn register_rule(&mut self, rule_type: &str, imp: Arc<dyn RuleImpl>) {
        self.rules.insert(rule_type.to_owned(), imp);
    }

    pub fn register_aspect(&mut self, def: AspectDefinition, imp: Arc<dyn AspectImpl>) {
        self.aspects.insert(def.id().dupe(), AspectEntry {
            def: Arc::new(def),
            imp,
        });
    }

    pub fn rule(&self, rule_type: &str) -> anyhow::Result<&Arc<dyn RuleImpl>> {
        self.rules
            .get(rule_type)
            .ok_or_else(|| AnalysisError::UnknownRuleType(rule_type.to_owned()).into())
    }

    pub fn aspect(&self, id: &AspectId) -> anyhow::Result<&AspectEntry> {
        self.aspects
            .get(id)
            .ok_or_else(|| AnalysisError::UnknownAspect(id.dupe()).into())
    }
}

/// Evaluate one aspect key from scratch. Dependencies (the base target, the
/// same aspect on planned dependencies, implicit dependency targets) are
/// requested through `calc`.
pub async fn compute_aspect_value(
    env: &AnalysisEnv<'_>,
    calc: &dyn AspectCalculation,
    key: &AspectKey,
) -> anyhow::Result<AspectValue> {
    tracing::debug!(%key, "computing aspect value");
    let target = key.label();
    let node = env.graph.get(target.unconfigured())?;
    // Keys are created post alias resolution, so the node is a rule.
    let rule = node.as_rule().ok_or_else(|| {
        AnalysisError::AspectKeyOnNonRule(key.aspect().dupe(), target.unconfigured().dupe())
    })?;
    let entry = env.registry.aspect(key.aspect())?;

    let (dep_keys, implicit_labels) = {
        let cfg_ctx = AttrConfigurationContextImpl::new(env.graph, target.cfg());
        let dep_keys: Vec<AspectKey> = planner::plan_deps(env.graph, rule, &entry.def, &cfg_ctx)?
            .into_iter()
            .map(|dep| {
                AspectKey::new(
                    dep.configure(target.cfg().dupe()),
                    key.aspect().dupe(),
                    key.params().clone(),
                )
            })
            .collect();
        let implicit_labels: Vec<(String, TargetLabel)> = entry
            .def
            .implicit_deps()
            .iter()
            .map(|(name, dep)| {
                Ok((name.clone(), resolve::resolve_alias_chain(env.graph, dep, &cfg_ctx)?))
            })
            .collect::<anyhow::Result<_>>()?;
        (dep_keys, implicit_labels)
    };

    let base = calc.configured_target(target).await?;
    // Planned on advertisements; an attachment only sticks if the dep's
    // analysis actually produced the required providers.
    let prereqs: Vec<AspectValue> = keep_going::try_join_all(
        false,
        dep_keys
            .iter()
            .map(|k| async move {
                let dep = calc.configured_target(k.label()).await?;
                if !gate::satisfied(&entry.def, dep.providers()) {
                    return Ok(None);
                }
                Ok(Some(calc.aspect_value(k).await?))
            })
            .collect(),
    )
    .await?
    .into_iter()
    .flatten()
    .collect();
    let mut implicit_deps = SmallMap::with_capacity(implicit_labels.len());
    for (name, dep) in implicit_labels {
        let configured = calc
            .configured_target(&dep.configure(target.cfg().dupe()))
            .await?;
        implicit_deps.insert(name, configured);
    }

    let mut ctx = AspectEvalCtx {
        key,
        base: &base,
        prereqs: &prereqs,
        implicit_deps: &implicit_deps,
        providers: ProviderCollection::new(),
        actions: Vec::new(),
    };
    if let Err(e) = entry.imp.evaluate(&mut ctx) {
        env.events.analysis_failure(AnalysisFailureEvent {
            key: Some(key.dupe()),
            target: target.dupe(),
            message: format!("{:#}", e),
            location: Some(node.build_file()),
        });
        return Err(e.context(format!("Error evaluating aspect `{}`", key)));
    }

    check_advertised_providers(env, key, &entry.def, &ctx.providers, node.build_file())?;
    let AspectEvalCtx {
        providers, actions, ..
    } = ctx;

    let mut transitive_build_files = SmallSet::new();
    transitive_build_files.insert(node.build_file());
    for prereq in &prereqs {
        for file in prereq.transitive_build_files() {
            transitive_build_files.insert(file.dupe());
        }
    }

    Ok(AspectValue::new(
        key.dupe(),
        providers,
        actions,
        transitive_build_files,
        prereqs,
    ))
}

/// Every advertised provider must be present in the evaluation's output. One
/// failure event per missing provider.
fn check_advertised_providers(
    env: &AnalysisEnv<'_>,
    key: &AspectKey,
    def: &AspectDefinition,
    providers: &ProviderCollection,
    location: BuildFilePath,
) -> anyhow::Result<()> {
    let mut missing: Vec<AnalysisError> = Vec::new();
    for id in def.advertised_providers().iter() {
        if !providers.contains(id) {
            missing.push(AnalysisError::MissingAdvertisedProvider {
                aspect: key.aspect().name().to_owned(),
                target: key.label().unconfigured().dupe(),
                provider: id.to_string(),
            });
        }
    }
    if missing.is_empty() {
        return Ok(());
    }
    for error in &missing {
        env.events.analysis_failure(AnalysisFailureEvent {
            key: Some(key.dupe()),
            target: key.label().dupe(),
            message: error.to_string(),
            location: Some(location.dupe()),
        });
    }
    if missing.len() == 1 {
        Err(missing.pop().unwrap().into())
    } else {
        Err(AnalysisError::AdvertisedProvidersMissing(missing).into())
    }
}

struct PlannedEdge {
    attr: String,
    target: ConfiguredTargetLabel,
    aspect_keys: Vec<AspectKey>,
}

/// Analyze one configured target from scratch. Aliases delegate to the
/// terminal target of the chain, `config_setting` targets have no analysis,
/// rules run their registered implementation over analyzed dependencies.
pub async fn compute_configured_target(
    env: &AnalysisEnv<'_>,
    calc: &dyn AspectCalculation,
    label: &ConfiguredTargetLabel,
) -> anyhow::Result<ConfiguredTarget> {
    tracing::debug!(%label, "computing configured target");
    let node = env.graph.get(label.unconfigured())?;

    if node.is_alias() {
        let cfg_ctx = AttrConfigurationContextImpl::new(env.graph, label.cfg());
        let terminal = resolve::resolve_alias_chain(env.graph, label.unconfigured(), &cfg_ctx)?;
        return calc
            .configured_target(&terminal.configure(label.cfg().dupe()))
            .await;
    }
    if node.as_config_setting().is_some() {
        return Ok(ConfiguredTarget::leaf(label.dupe(), node.dupe()));
    }

    let rule = node.as_rule().unwrap_or_else(|| unreachable!());
    let rule_impl = env.registry.rule(&rule.rule_type)?;

    let (configured_attrs, edges) = {
        let cfg_ctx = AttrConfigurationContextImpl::new(env.graph, label.cfg());
        plan_edges(env, rule, label, &cfg_ctx)?
    };

    let dep_views = keep_going::try_join_all(
        false,
        edges
            .iter()
            .map(|edge| async move {
                let target = calc.configured_target(&edge.target).await?;
                let mut aspect_values = Vec::with_capacity(edge.aspect_keys.len());
                for aspect_key in &edge.aspect_keys {
                    // Gated on advertisements when planned; the attachment
                    // only sticks if the providers were actually produced.
                    let entry = env.registry.aspect(aspect_key.aspect())?;
                    if !gate::satisfied(&entry.def, target.providers()) {
                        continue;
                    }
                    aspect_values.push(calc.aspect_value(aspect_key).await?);
                }
                Ok(DepView {
                    attr: edge.attr.clone(),
                    target,
                    aspect_values,
                })
            })
            .collect(),
    )
    .await?;

    let mut ctx = RuleAnalysisCtx {
        label,
        node,
        attrs: &configured_attrs,
        deps: &dep_views,
        providers: ProviderCollection::new(),
        actions: Vec::new(),
    };
    if let Err(e) = rule_impl.analyze(&mut ctx) {
        env.events.analysis_failure(AnalysisFailureEvent {
            key: None,
            target: label.dupe(),
            message: format!("{:#}", e),
            location: Some(node.build_file()),
        });
        return Err(e.context(format!("Error running analysis for `{}`", label)));
    }
    let RuleAnalysisCtx {
        providers, actions, ..
    } = ctx;

    let mut deps = Vec::with_capacity(dep_views.len());
    let mut aspect_deps = Vec::new();
    for view in dep_views {
        deps.push(view.target);
        aspect_deps.extend(view.aspect_values);
    }
    Ok(ConfiguredTarget::new(
        label.dupe(),
        node.dupe(),
        providers,
        actions,
        deps,
        aspect_deps,
    ))
}

/// Configure all attributes and plan the dependency edges, including the
/// aspect keys the rule attaches to each edge. Gating and alias resolution
/// happen here, before any dependency is requested.
fn plan_edges(
    env: &AnalysisEnv<'_>,
    rule: &RuleData,
    label: &ConfiguredTargetLabel,
    cfg_ctx: &dyn AttrConfigurationContext,
) -> anyhow::Result<(SmallMap<String, ConfiguredAttr>, Vec<PlannedEdge>)> {
    let mut configured_attrs = SmallMap::with_capacity(rule.attrs.len());
    let mut edges = Vec::new();
    for (attr_name, attr) in &rule.attrs {
        let configured = attr.configure(cfg_ctx)?;
        for dep in resolve::resolve_attr_deps(env.graph, attr, cfg_ctx)? {
            let mut aspect_keys = Vec::new();
            if let Some(attached) = rule.attr_aspects.get(attr_name) {
                let dep_node = env.graph.get(&dep)?;
                let advertised = advertised_providers(dep_node);
                for attachment in attached.iter() {
                    let entry = env.registry.aspect(&attachment.aspect)?;
                    if !gate::attaches(&entry.def, &advertised) {
                        continue;
                    }
                    let params = build_params(
                        rule,
                        label.unconfigured(),
                        &attachment.params_from_attrs,
                        cfg_ctx,
                    )?;
                    aspect_keys.push(AspectKey::new(
                        dep.configure(label.cfg().dupe()),
                        attachment.aspect.dupe(),
                        params,
                    ));
                }
            }
            edges.push(PlannedEdge {
                attr: attr_name.clone(),
                target: dep.configure(label.cfg().dupe()),
                aspect_keys,
            });
        }
        configured_attrs.insert(attr_name.clone(), configured);
    }
    Ok((configured_attrs, edges))
}

fn advertised_providers(node: &TargetNode) -> ProviderIdSet {
    match node.as_rule() {
        Some(rule) => rule.advertised_providers.dupe(),
        None => ProviderIdSet::default(),
    }
}

/// Aspect parameters sourced from string attributes of the attaching rule.
fn build_params(
    rule: &RuleData,
    owner: &TargetLabel,
    params_from_attrs: &[String],
    cfg_ctx: &dyn AttrConfigurationContext,
) -> anyhow::Result<AspectParameters> {
    params_from_attrs
        .iter()
        .map(|name| {
            let value = rule
                .attrs
                .get(name)
                .map(|attr| attr.configure(cfg_ctx))
                .transpose()?
                .as_ref()
                .and_then(ConfiguredAttr::as_str)
                .ok_or_else(|| {
                    AnalysisError::NonStringParamAttr(name.clone(), owner.dupe())
                })?
                .to_owned();
            Ok((name.clone(), value))
        })
        .collect::<anyhow::Result<Vec<(String, String)>>>()
        .map(AspectParameters::from_iter)
}

/// One top-level target with the aspects requested on it.
pub struct TopLevelRequest {
    pub target: TargetLabel,
    pub aspects: Vec<(AspectId, AspectParameters)>,
}

#[derive(Copy, Clone, Dupe, Debug, Eq, PartialEq)]
pub enum ErrorPolicy {
    /// Stop at the first failed request; unfinished siblings are dropped.
    FailFast,
    /// Analyze every request, reporting per-request results.
    KeepGoing,
}

#[derive(Debug)]
pub struct AnalysisResult {
    pub target: ConfiguredTarget,
    pub aspect_values: Vec<AspectValue>,
}

impl AnalysisResult {
    /// The target's providers with the top-level aspects' providers merged.
    pub fn merged_providers(&self) -> ProviderCollection {
        crate::merge::merge_providers(self.target.providers(), &self.aspect_values)
    }
}

/// Analyze the requested targets in one configuration, applying the
/// requested aspects to each. A requested aspect whose provider gate rejects
/// the target is skipped, not an error.
pub async fn analyze_top_level(
    env: &AnalysisEnv<'_>,
    calc: &dyn AspectCalculation,
    cfg: &ConfigurationData,
    requests: &[TopLevelRequest],
    policy: ErrorPolicy,
) -> anyhow::Result<Vec<anyhow::Result<AnalysisResult>>> {
    let futs = requests
        .iter()
        .map(|request| async move {
            let terminal = {
                let cfg_ctx = AttrConfigurationContextImpl::new(env.graph, cfg);
                resolve::resolve_alias_chain(env.graph, &request.target, &cfg_ctx)?
            };
            let configured_label = terminal.configure(cfg.dupe());
            let target = calc.configured_target(&configured_label).await?;
            let advertised = advertised_providers(env.graph.get(&terminal)?);
            let mut aspect_values = Vec::new();
            for (aspect, params) in &request.aspects {
                let entry = env.registry.aspect(aspect)?;
                if !gate::attaches(&entry.def, &advertised)
                    || !gate::satisfied(&entry.def, target.providers())
                {
                    continue;
                }
                let key = AspectKey::new(configured_label.dupe(), aspect.dupe(), params.clone());
                aspect_values.push(calc.aspect_value(&key).await?);
            }
            Ok(AnalysisResult {
                target,
                aspect_values,
            })
        })
        .collect::<Vec<_>>();
    match policy {
        ErrorPolicy::KeepGoing => Ok(keep_going::join_all_results(futs).await),
        ErrorPolicy::FailFast => Ok(futures::future::try_join_all(futs)
            .await?
            .into_iter()
            .map(Ok)
            .collect()),
    }
}
