/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! In-process evaluator and canned rule/aspect implementations for tests.

use std::fmt;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use dupe::Dupe;
use quarry_core::provider::id::ProviderId;
use quarry_core::target::configured_target_label::ConfiguredTargetLabel;
use quarry_node::aspect::AspectParameters;
use quarry_node::nodes::targets_map::TargetGraph;
use starlark_map::small_map::SmallMap;
use tokio::sync::Mutex;
use tokio::sync::OnceCell;

use crate::calculation::compute_aspect_value;
use crate::calculation::compute_configured_target;
use crate::calculation::AnalysisEnv;
use crate::calculation::AnalysisRegistry;
use crate::calculation::AspectCalculation;
use crate::calculation::AspectEvalCtx;
use crate::calculation::AspectImpl;
use crate::calculation::RuleAnalysisCtx;
use crate::calculation::RuleImpl;
use crate::events::AnalysisFailureEvent;
use crate::events::EventSink;
use crate::key::AspectKey;
use crate::value::AspectValue;
use crate::value::ConfiguredTarget;

/// A clonable error, so a memoized failure can be handed to every waiter.
#[derive(Clone)]
pub struct SharedError(Arc<anyhow::Error>);

impl SharedError {
    pub fn new(e: anyhow::Error) -> SharedError {
        SharedError(Arc::new(e))
    }
}

impl Display for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl fmt::Debug for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl std::error::Error for SharedError {}

type Memo<K, V> = Mutex<SmallMap<K, Arc<OnceCell<Result<V, SharedError>>>>>;

/// Memoizing evaluator: each aspect key and each configured target label is
/// computed at most once, failures included.
pub struct InMemoryEvaluator {
    graph: Arc<TargetGraph>,
    registry: Arc<AnalysisRegistry>,
    events: Arc<dyn EventSink>,
    aspects: Memo<AspectKey, AspectValue>,
    targets: Memo<ConfiguredTargetLabel, ConfiguredTarget>,
}

impl InMemoryEvaluator {
    pub fn new(
        graph: Arc<TargetGraph>,
        registry: Arc<AnalysisRegistry>,
        events: Arc<dyn EventSink>,
    ) -> InMemoryEvaluator {
        InMemoryEvaluator {
            graph,
            registry,
            events,
            aspects: Mutex::new(SmallMap::new()),
            targets: Mutex::new(SmallMap::new()),
        }
    }

    pub fn env(&self) -> AnalysisEnv<'_> {
        AnalysisEnv {
            graph: &self.graph,
            registry: &self.registry,
            events: &*self.events,
        }
    }
}

async fn memo_cell<K: Clone + std::hash::Hash + Eq, V>(
    memo: &Memo<K, V>,
    key: &K,
) -> Arc<OnceCell<Result<V, SharedError>>> {
    let mut map = memo.lock().await;
    match map.get(key) {
        Some(cell) => cell.clone(),
        None => {
            let cell = Arc::new(OnceCell::new());
            map.insert(key.clone(), cell.clone());
            cell
        }
    }
}

#[async_trait]
impl AspectCalculation for InMemoryEvaluator {
    async fn aspect_value(&self, key: &AspectKey) -> anyhow::Result<AspectValue> {
        let cell = memo_cell(&self.aspects, key).await;
        let result = cell
            .get_or_init(|| async {
                compute_aspect_value(&self.env(), self, key)
                    .await
                    .map_err(SharedError::new)
            })
            .await;
        result.clone().map_err(anyhow::Error::new)
    }

    async fn configured_target(
        &self,
        label: &ConfiguredTargetLabel,
    ) -> anyhow::Result<ConfiguredTarget> {
        let cell = memo_cell(&self.targets, label).await;
        let result = cell
            .get_or_init(|| async {
                compute_configured_target(&self.env(), self, label)
                    .await
                    .map_err(SharedError::new)
            })
            .await;
        result.clone().map_err(anyhow::Error::new)
    }
}

/// Keeps every failure event for assertions.
#[derive(Default)]
pub struct CollectingEventSink {
    events: StdMutex<Vec<AnalysisFailureEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> CollectingEventSink {
        CollectingEventSink::default()
    }

    pub fn events(&self) -> Vec<AnalysisFailureEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn analysis_failure(&self, event: AnalysisFailureEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn rule_info() -> ProviderId {
    ProviderId::native("RuleInfo")
}

pub fn aspect_info() -> ProviderId {
    ProviderId::native("AspectInfo")
}

pub fn params(entries: &[(&str, &str)]) -> AspectParameters {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

/// Adds `rule <label>` to `RuleInfo` and folds in the `AspectInfo` values of
/// aspects attached to its dependencies.
pub struct CollectingRule;

impl RuleImpl for CollectingRule {
    fn analyze(&self, ctx: &mut RuleAnalysisCtx<'_>) -> anyhow::Result<()> {
        ctx.add_provider(
            rule_info(),
            &format!("rule {}", ctx.label().unconfigured()),
        );
        for dep in ctx.deps() {
            for value in &dep.aspect_values {
                for v in value.providers().values_of(&aspect_info()) {
                    ctx.add_provider(rule_info(), v);
                }
            }
        }
        Ok(())
    }
}

/// `CollectingRule` that also produces one instance of every provider the
/// target advertises, so planned attachments survive the post-analysis gate.
pub struct HonestRule;

impl RuleImpl for HonestRule {
    fn analyze(&self, ctx: &mut RuleAnalysisCtx<'_>) -> anyhow::Result<()> {
        if let Some(rule) = ctx.node().as_rule() {
            let advertised = rule.advertised_providers.dupe();
            for id in advertised.iter() {
                ctx.add_provider((**id).clone(), "produced");
            }
        }
        CollectingRule.analyze(ctx)
    }
}

/// `CollectingRule` that also registers one action owned by the target.
pub struct ActionRule;

impl RuleImpl for ActionRule {
    fn analyze(&self, ctx: &mut RuleAnalysisCtx<'_>) -> anyhow::Result<()> {
        let label = ctx.label().unconfigured();
        ctx.register_action("RuleAction", &[&format!(
            "{}/{}.out",
            label.pkg().as_str(),
            label.name()
        )]);
        CollectingRule.analyze(ctx)
    }
}

/// Adds `aspect <label>` (plus ` data <value>` per parameter) to
/// `AspectInfo` and folds in the values of its prereqs.
pub struct CollectingAspect;

impl AspectImpl for CollectingAspect {
    fn evaluate(&self, ctx: &mut AspectEvalCtx<'_>) -> anyhow::Result<()> {
        let mut entry = format!("aspect {}", ctx.key().label().unconfigured());
        for (_, value) in ctx.key().params().iter() {
            entry.push_str(&format!(" data {}", value));
        }
        ctx.add_provider(aspect_info(), &entry);
        for prereq in ctx.prereqs() {
            for v in prereq.providers().values_of(&aspect_info()) {
                ctx.add_provider(aspect_info(), v);
            }
        }
        Ok(())
    }
}

/// Adds a fixed `AspectInfo` value. For telling two aspect classes apart.
pub struct StringAspect(pub &'static str);

impl AspectImpl for StringAspect {
    fn evaluate(&self, ctx: &mut AspectEvalCtx<'_>) -> anyhow::Result<()> {
        ctx.add_provider(aspect_info(), self.0);
        Ok(())
    }
}

/// Always fails.
pub struct ErrorAspect;

impl AspectImpl for ErrorAspect {
    fn evaluate(&self, _ctx: &mut AspectEvalCtx<'_>) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("Aspect error"))
    }
}

/// Registers one action per target it lands on, output unique to the
/// target/aspect pair. Collects like `CollectingAspect`.
pub struct ActionAspect;

impl AspectImpl for ActionAspect {
    fn evaluate(&self, ctx: &mut AspectEvalCtx<'_>) -> anyhow::Result<()> {
        let label = ctx.key().label().unconfigured();
        ctx.register_action("AspectAction", &[&format!(
            "{}/{}.{}.out",
            label.pkg().as_str(),
            label.name(),
            ctx.key().aspect().name()
        )]);
        CollectingAspect.evaluate(ctx)
    }
}

/// Registers one action with a fixed output wherever it lands. Two
/// attachments on different targets collide.
pub struct FixedOutputAspect(pub &'static str);

impl AspectImpl for FixedOutputAspect {
    fn evaluate(&self, ctx: &mut AspectEvalCtx<'_>) -> anyhow::Result<()> {
        ctx.register_action("AspectAction", &[self.0]);
        Ok(())
    }
}
