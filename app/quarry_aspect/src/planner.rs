/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Attachment planning: given a rule target an aspect is attached to, decide
//! which dependency targets the aspect propagates to.

use dupe::Dupe;
use quarry_core::provider::id::ProviderIdSet;
use quarry_core::target::label::TargetLabel;
use quarry_node::aspect::AspectAttachmentPolicy;
use quarry_node::aspect::AspectDefinition;
use quarry_node::attrs::configuration_context::AttrConfigurationContext;
use quarry_node::nodes::targets_map::TargetGraph;
use quarry_node::nodes::unconfigured::RuleData;
use starlark_map::small_set::SmallSet;

use crate::gate;
use crate::resolve;

/// Whether the aspect walks down the named attribute.
///
/// Under the all-attributes policy the aspect's own implicit attributes are
/// excluded. The aspect adds those attributes to every node it lands on, so
/// propagating down them would re-attach the aspect to its own tools without
/// end. A tool also reachable through a regular attribute still gets the
/// aspect through that edge.
fn edge_matches_policy(def: &AspectDefinition, attr_name: &str) -> bool {
    match def.policy() {
        AspectAttachmentPolicy::Explicit(attrs) => attrs.contains(attr_name),
        AspectAttachmentPolicy::All => !def.implicit_deps().contains_key(attr_name),
    }
}

/// The dependency targets an aspect on `rule` propagates to: targets of the
/// attributes the policy selects, alias chains resolved, gated on advertised
/// providers, deduplicated in first-seen order.
pub fn plan_deps(
    graph: &TargetGraph,
    rule: &RuleData,
    def: &AspectDefinition,
    ctx: &dyn AttrConfigurationContext,
) -> anyhow::Result<Vec<TargetLabel>> {
    let mut seen: SmallSet<TargetLabel> = SmallSet::new();
    let mut planned = Vec::new();
    for (attr_name, attr) in &rule.attrs {
        if !edge_matches_policy(def, attr_name) {
            continue;
        }
        for dep in resolve::resolve_attr_deps(graph, attr, ctx)? {
            if seen.contains(&dep) {
                continue;
            }
            let node = graph.get(&dep)?;
            let advertised = match node.as_rule() {
                Some(rule) => rule.advertised_providers.dupe(),
                None => ProviderIdSet::default(),
            };
            if !gate::attaches(def, &advertised) {
                tracing::debug!(aspect = %def.id(), label = %dep, "provider gate rejected");
                continue;
            }
            seen.insert(dep.dupe());
            planned.push(dep);
        }
    }
    Ok(planned)
}

#[cfg(test)]
mod tests {
    use quarry_core::configuration::data::ConfigurationData;
    use quarry_core::provider::id::ProviderId;
    use quarry_core::target::label::TargetLabel;
    use quarry_node::aspect::AspectAttachmentPolicy;
    use quarry_node::aspect::AspectDefinition;
    use quarry_node::aspect::AspectId;
    use quarry_node::attrs::configuration_context::AttrConfigurationContextImpl;
    use quarry_node::nodes::targets_map::TargetGraph;
    use quarry_node::nodes::testing::TargetNodeBuilder;

    use crate::planner::plan_deps;

    fn labels(labels: &[&str]) -> Vec<TargetLabel> {
        labels.iter().map(|l| TargetLabel::testing_parse(l)).collect()
    }

    fn plan(graph: &TargetGraph, target: &str, def: &AspectDefinition) -> Vec<TargetLabel> {
        let cfg = ConfigurationData::testing_new("t", &[]);
        let ctx = AttrConfigurationContextImpl::new(graph, &cfg);
        let node = graph.get(&TargetLabel::testing_parse(target)).unwrap();
        plan_deps(graph, node.as_rule().unwrap(), def, &ctx).unwrap()
    }

    #[test]
    fn explicit_policy_selects_attributes() {
        let graph = TargetGraph::from_iter([
            TargetNodeBuilder::rule("//a:dep").build(),
            TargetNodeBuilder::rule("//a:tool").build(),
            TargetNodeBuilder::rule("//a:top")
                .dep_attr("deps", &["//a:dep"])
                .dep_attr("tools", &["//a:tool"])
                .build(),
        ]);
        let def = AspectDefinition::new(
            AspectId::native("checker"),
            AspectAttachmentPolicy::explicit(&["deps"]),
        );
        assert_eq!(labels(&["//a:dep"]), plan(&graph, "//a:top", &def));
    }

    #[test]
    fn all_policy_selects_everything_but_own_implicit_attrs() {
        let graph = TargetGraph::from_iter([
            TargetNodeBuilder::rule("//a:dep").build(),
            TargetNodeBuilder::rule("//a:tool").build(),
            TargetNodeBuilder::rule("//a:top")
                .dep_attr("deps", &["//a:dep"])
                .dep_attr("$checker_tool", &["//a:tool"])
                .build(),
        ]);
        let def = AspectDefinition::new(
            AspectId::native("checker"),
            AspectAttachmentPolicy::All,
        )
        .with_implicit_dep("$checker_tool", TargetLabel::testing_parse("//a:tool"));
        assert_eq!(labels(&["//a:dep"]), plan(&graph, "//a:top", &def));
    }

    #[test]
    fn tool_reachable_through_a_regular_attr_is_planned_once() {
        let graph = TargetGraph::from_iter([
            TargetNodeBuilder::rule("//a:tool").build(),
            TargetNodeBuilder::rule("//a:top")
                .dep_attr("deps", &["//a:tool"])
                .dep_attr("$checker_tool", &["//a:tool"])
                .build(),
        ]);
        let def = AspectDefinition::new(
            AspectId::native("checker"),
            AspectAttachmentPolicy::All,
        )
        .with_implicit_dep("$checker_tool", TargetLabel::testing_parse("//a:tool"));
        assert_eq!(labels(&["//a:tool"]), plan(&graph, "//a:top", &def));
    }

    #[test]
    fn same_target_in_two_attributes_is_planned_once() {
        let graph = TargetGraph::from_iter([
            TargetNodeBuilder::rule("//a:dep").build(),
            TargetNodeBuilder::rule("//a:top")
                .dep_attr("deps", &["//a:dep"])
                .dep_attr("extra", &["//a:dep"])
                .build(),
        ]);
        let def = AspectDefinition::new(
            AspectId::native("checker"),
            AspectAttachmentPolicy::explicit(&["deps", "extra"]),
        );
        assert_eq!(labels(&["//a:dep"]), plan(&graph, "//a:top", &def));
    }

    #[test]
    fn gate_filters_planned_deps() {
        let graph = TargetGraph::from_iter([
            TargetNodeBuilder::rule("//a:honest").advertise(&["FooInfo"]).build(),
            TargetNodeBuilder::rule("//a:silent").build(),
            TargetNodeBuilder::rule("//a:top")
                .dep_attr("deps", &["//a:honest", "//a:silent"])
                .build(),
        ]);
        let def = AspectDefinition::new(
            AspectId::native("checker"),
            AspectAttachmentPolicy::explicit(&["deps"]),
        )
        .requiring(Box::new([[ProviderId::native("FooInfo")]
            .into_iter()
            .collect()]));
        assert_eq!(labels(&["//a:honest"]), plan(&graph, "//a:top", &def));
    }
}
