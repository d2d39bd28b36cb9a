/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use allocative::Allocative;
use dupe::Dupe;
use quarry_core::target::label::TargetLabel;
use starlark_map::small_map::SmallMap;

use crate::nodes::unconfigured::TargetNode;

#[derive(Debug, thiserror::Error)]
enum TargetGraphError {
    #[error("target `{0}` is defined twice")]
    RegisteredTargetTwice(TargetLabel),
    #[error("unknown target `{0}`")]
    UnknownTarget(TargetLabel),
}

/// All known unconfigured targets, by label.
#[derive(Debug, Default, Allocative)]
pub struct TargetGraph {
    map: SmallMap<TargetLabel, TargetNode>,
}

impl TargetGraph {
    pub fn new() -> TargetGraph {
        TargetGraph::default()
    }

    pub fn record(&mut self, node: TargetNode) -> anyhow::Result<()> {
        let label = node.label().dupe();
        if self.map.contains_key(&label) {
            return Err(TargetGraphError::RegisteredTargetTwice(label).into());
        }
        self.map.insert(label, node);
        Ok(())
    }

    pub fn get(&self, label: &TargetLabel) -> anyhow::Result<&TargetNode> {
        self.map
            .get(label)
            .ok_or_else(|| TargetGraphError::UnknownTarget(label.dupe()).into())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TargetLabel, &TargetNode)> {
        self.map.iter()
    }
}

/// For tests.
impl FromIterator<TargetNode> for TargetGraph {
    fn from_iter<T: IntoIterator<Item = TargetNode>>(iter: T) -> TargetGraph {
        let mut graph = TargetGraph::new();
        for node in iter {
            graph.record(node).unwrap();
        }
        graph
    }
}
