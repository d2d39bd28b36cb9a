/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Results of analysis: provider collections, registered actions, configured
//! targets and aspect values.

use std::sync::Arc;

use allocative::Allocative;
use dupe::Dupe;
use quarry_core::package::BuildFilePath;
use quarry_core::provider::id::ProviderId;
use quarry_core::target::configured_target_label::ConfiguredTargetLabel;
use quarry_node::nodes::unconfigured::TargetNode;
use starlark_map::small_map::SmallMap;
use starlark_map::small_set::SmallSet;

use crate::key::AspectKey;

/// Provider instances keyed by provider id. Values are sets of strings;
/// merging unions the value sets per id, keeping first-seen order.
#[derive(Debug, Clone, Default, Allocative)]
pub struct ProviderCollection {
    map: SmallMap<Arc<ProviderId>, SmallSet<Arc<str>>>,
}

impl ProviderCollection {
    pub fn new() -> ProviderCollection {
        ProviderCollection::default()
    }

    pub fn add(&mut self, id: ProviderId, value: &str) {
        match self.map.get_mut(&id) {
            Some(values) => {
                values.insert(Arc::from(value));
            }
            None => {
                let mut values = SmallSet::new();
                values.insert(Arc::from(value));
                self.map.insert(Arc::new(id), values);
            }
        }
    }

    pub fn add_all(&mut self, other: &ProviderCollection) {
        for (id, values) in &other.map {
            match self.map.get_mut(&**id) {
                Some(own) => {
                    for v in values {
                        own.insert(v.dupe());
                    }
                }
                None => {
                    self.map.insert(id.dupe(), values.clone());
                }
            }
        }
    }

    pub fn contains(&self, id: &ProviderId) -> bool {
        self.map.contains_key(id)
    }

    /// Values of a provider in first-seen order, empty when absent.
    pub fn values_of(&self, id: &ProviderId) -> Vec<&str> {
        match self.map.get(id) {
            Some(values) => values.iter().map(|v| &**v).collect(),
            None => Vec::new(),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &Arc<ProviderId>> {
        self.map.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// An action registered during analysis. Ownership is part of the action:
/// actions registered by an aspect are owned by the target the aspect was
/// applied to, distinct from the actions of the target's own rule.
#[derive(Debug, Clone, Allocative)]
pub struct RegisteredAction {
    pub owner: ConfiguredTargetLabel,
    pub mnemonic: Arc<str>,
    pub outputs: Box<[Arc<str>]>,
}

/// Analysis result of a configured target: what the rule implementation
/// produced, plus the dependency structure the analysis walked, kept so
/// action collection can traverse the configured graph afterwards.
#[derive(Debug, Clone, Dupe, Allocative)]
pub struct ConfiguredTarget(Arc<ConfiguredTargetData>);

#[derive(Debug, Allocative)]
struct ConfiguredTargetData {
    label: ConfiguredTargetLabel,
    node: TargetNode,
    providers: ProviderCollection,
    actions: Vec<RegisteredAction>,
    deps: Vec<ConfiguredTarget>,
    /// Aspect values of aspects this target's rule attached to its own
    /// dependencies.
    aspect_deps: Vec<AspectValue>,
}

impl ConfiguredTarget {
    pub fn new(
        label: ConfiguredTargetLabel,
        node: TargetNode,
        providers: ProviderCollection,
        actions: Vec<RegisteredAction>,
        deps: Vec<ConfiguredTarget>,
        aspect_deps: Vec<AspectValue>,
    ) -> ConfiguredTarget {
        ConfiguredTarget(Arc::new(ConfiguredTargetData {
            label,
            node,
            providers,
            actions,
            deps,
            aspect_deps,
        }))
    }

    /// A target with no analysis of its own, e.g. a `config_setting`.
    pub fn leaf(label: ConfiguredTargetLabel, node: TargetNode) -> ConfiguredTarget {
        ConfiguredTarget::new(
            label,
            node,
            ProviderCollection::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }

    pub fn label(&self) -> &ConfiguredTargetLabel {
        &self.0.label
    }

    pub fn node(&self) -> &TargetNode {
        &self.0.node
    }

    pub fn providers(&self) -> &ProviderCollection {
        &self.0.providers
    }

    pub fn actions(&self) -> &[RegisteredAction] {
        &self.0.actions
    }

    pub fn deps(&self) -> &[ConfiguredTarget] {
        &self.0.deps
    }

    pub fn aspect_deps(&self) -> &[AspectValue] {
        &self.0.aspect_deps
    }

    pub fn build_file(&self) -> BuildFilePath {
        self.0.node.build_file()
    }
}

/// Result of one aspect evaluation.
#[derive(Debug, Clone, Dupe, Allocative)]
pub struct AspectValue(Arc<AspectValueData>);

#[derive(Debug, Allocative)]
struct AspectValueData {
    key: AspectKey,
    providers: ProviderCollection,
    actions: Vec<RegisteredAction>,
    /// Build files of every target the aspect evaluation touched. Any edit
    /// to one of them invalidates this value.
    transitive_build_files: SmallSet<BuildFilePath>,
    /// Values of the same aspect on the dependencies it propagated to.
    prereqs: Vec<AspectValue>,
}

impl AspectValue {
    pub fn new(
        key: AspectKey,
        providers: ProviderCollection,
        actions: Vec<RegisteredAction>,
        transitive_build_files: SmallSet<BuildFilePath>,
        prereqs: Vec<AspectValue>,
    ) -> AspectValue {
        AspectValue(Arc::new(AspectValueData {
            key,
            providers,
            actions,
            transitive_build_files,
            prereqs,
        }))
    }

    pub fn key(&self) -> &AspectKey {
        &self.0.key
    }

    pub fn providers(&self) -> &ProviderCollection {
        &self.0.providers
    }

    pub fn actions(&self) -> &[RegisteredAction] {
        &self.0.actions
    }

    pub fn transitive_build_files(&self) -> &SmallSet<BuildFilePath> {
        &self.0.transitive_build_files
    }

    pub fn prereqs(&self) -> &[AspectValue] {
        &self.0.prereqs
    }
}

#[cfg(test)]
mod tests {
    use quarry_core::provider::id::ProviderId;

    use crate::value::ProviderCollection;

    #[test]
    fn merge_unions_per_id() {
        let mut a = ProviderCollection::new();
        a.add(ProviderId::native("FooInfo"), "one");
        a.add(ProviderId::native("FooInfo"), "two");

        let mut b = ProviderCollection::new();
        b.add(ProviderId::native("FooInfo"), "one");
        b.add(ProviderId::native("FooInfo"), "three");
        b.add(ProviderId::native("BarInfo"), "four");

        a.add_all(&b);
        assert_eq!(
            vec!["one", "two", "three"],
            a.values_of(&ProviderId::native("FooInfo"))
        );
        assert_eq!(vec!["four"], a.values_of(&ProviderId::native("BarInfo")));
        assert!(!a.contains(&ProviderId::native("QuuxInfo")));
    }
}
