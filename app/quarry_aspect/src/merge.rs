/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Post-analysis aggregation: merging aspect providers into target providers
//! and collecting registered actions across the configured graph.

use std::sync::Arc;

use dupe::Dupe;
use itertools::Itertools;
use quarry_core::target::configured_target_label::ConfiguredTargetLabel;
use starlark_map::small_map::SmallMap;
use starlark_map::small_set::SmallSet;
use starlark_map::sorted_map::SortedMap;

use crate::calculation::AnalysisResult;
use crate::key::AspectKey;
use crate::value::AspectValue;
use crate::value::ConfiguredTarget;
use crate::value::ProviderCollection;
use crate::value::RegisteredAction;

#[derive(Debug, thiserror::Error)]
enum ActionError {
    #[error("output `{output}` is produced by both `{first}` and `{second}`")]
    DuplicateOutput {
        output: String,
        first: ConfiguredTargetLabel,
        second: ConfiguredTargetLabel,
    },
    #[error("{}", .0.iter().map(|e| e.to_string()).join("\n"))]
    DuplicateOutputs(Vec<ActionError>),
}

/// A target's providers with attached aspect providers merged in. Per id the
/// value sets union; the target's own values come first.
pub fn merge_providers(own: &ProviderCollection, aspects: &[AspectValue]) -> ProviderCollection {
    let mut merged = own.clone();
    for value in aspects {
        merged.add_all(value.providers());
    }
    merged
}

struct ActionCollector {
    top_level_only: bool,
    by_owner: SmallMap<ConfiguredTargetLabel, Vec<RegisteredAction>>,
    outputs: SmallMap<Arc<str>, ConfiguredTargetLabel>,
    visited_targets: SmallSet<ConfiguredTargetLabel>,
    visited_keys: SmallSet<AspectKey>,
    /// All collisions seen so far, reported together at the end.
    collisions: Vec<ActionError>,
}

impl ActionCollector {
    fn record(&mut self, actions: &[RegisteredAction]) {
        for action in actions {
            for output in action.outputs.iter() {
                match self.outputs.get(output) {
                    Some(first) => {
                        self.collisions.push(ActionError::DuplicateOutput {
                            output: output.to_string(),
                            first: first.dupe(),
                            second: action.owner.dupe(),
                        });
                    }
                    None => {
                        self.outputs.insert(output.dupe(), action.owner.dupe());
                    }
                }
            }
            match self.by_owner.get_mut(&action.owner) {
                Some(list) => list.push(action.clone()),
                None => {
                    self.by_owner
                        .insert(action.owner.dupe(), vec![action.clone()]);
                }
            }
        }
    }

    fn visit_target(
        &mut self,
        target: &ConfiguredTarget,
        allowed: Option<&SmallSet<quarry_node::aspect::AspectId>>,
    ) {
        if !self.visited_targets.insert(target.label().dupe()) {
            return;
        }
        self.record(target.actions());
        for value in target.aspect_deps() {
            let permitted = match allowed {
                None => true,
                Some(allowed) => allowed.contains(value.key().aspect()),
            };
            if permitted {
                self.visit_aspect_value(value);
            }
        }
        for dep in target.deps() {
            self.visit_target(dep, allowed);
        }
    }

    fn visit_aspect_value(&mut self, value: &AspectValue) {
        if !self.visited_keys.insert(value.key().dupe()) {
            return;
        }
        self.record(value.actions());
        for prereq in value.prereqs() {
            self.visit_aspect_value(prereq);
        }
    }
}

/// Collect every registered action reachable from the analyzed top-level
/// targets, grouped by owner. An output produced twice is an error; the walk
/// keeps going so every collision is in the error, not just the first.
///
/// With `top_level_only`, aspect actions are restricted per top-level target
/// to the aspects requested on it and the aspects its own rule attaches;
/// actions of aspects injected deeper in the graph are left out.
pub fn actions_by_owner(
    results: &[AnalysisResult],
    top_level_only: bool,
) -> anyhow::Result<SortedMap<ConfiguredTargetLabel, Vec<RegisteredAction>>> {
    let mut collector = ActionCollector {
        top_level_only,
        by_owner: SmallMap::new(),
        outputs: SmallMap::new(),
        visited_targets: SmallSet::new(),
        visited_keys: SmallSet::new(),
        collisions: Vec::new(),
    };
    for result in results {
        let allowed = if collector.top_level_only {
            let mut allowed = SmallSet::new();
            for value in &result.aspect_values {
                allowed.insert(value.key().aspect().dupe());
            }
            if let Some(rule) = result.target.node().as_rule() {
                for attached in rule.attr_aspects.values() {
                    for attachment in attached.iter() {
                        allowed.insert(attachment.aspect.dupe());
                    }
                }
            }
            Some(allowed)
        } else {
            None
        };
        collector.visit_target(&result.target, allowed.as_ref());
        for value in &result.aspect_values {
            collector.visit_aspect_value(value);
        }
    }
    let mut collisions = collector.collisions;
    match collisions.len() {
        0 => Ok(SortedMap::from(collector.by_owner)),
        1 => Err(collisions.pop().unwrap().into()),
        _ => Err(ActionError::DuplicateOutputs(collisions).into()),
    }
}
