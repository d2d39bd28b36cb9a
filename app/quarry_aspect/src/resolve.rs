/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Alias resolution. Aspects and dependency edges never land on an alias:
//! chains are followed to the terminal target first, so the same target
//! reached through an alias and through its real name is one node.

use dupe::Dupe;
use dupe::IterDupedExt;
use quarry_core::target::label::TargetLabel;
use quarry_node::attrs::coerced_attr::CoercedAttr;
use quarry_node::attrs::configuration_context::AttrConfigurationContext;
use quarry_node::attrs::configured_attr::ConfiguredAttr;
use quarry_node::attrs::traversal::ConfiguredAttrTraversal;
use quarry_node::nodes::targets_map::TargetGraph;
use starlark_map::small_set::SmallSet;

#[derive(Debug, thiserror::Error)]
enum AliasResolutionError {
    #[error("{}", display_cycle(.0))]
    Cycle(Vec<TargetLabel>),
    #[error("`actual` of alias `{0}` did not resolve to a single target")]
    MalformedActual(TargetLabel),
}

fn display_cycle(chain: &[TargetLabel]) -> String {
    use std::fmt::Write;
    let mut s = String::new();
    writeln!(s, "Alias cycle detected (`->` means \"points at\"):").unwrap();
    for label in chain {
        writeln!(s, "  {} ->", label).unwrap();
    }
    if let Some(first) = chain.first() {
        write!(s, "  {}", first).unwrap();
    }
    s
}

/// Follow alias forwarding until a non-alias node. The `actual` attribute of
/// an alias may be a `select`, so resolution is configuration-dependent.
pub fn resolve_alias_chain(
    graph: &TargetGraph,
    label: &TargetLabel,
    ctx: &dyn AttrConfigurationContext,
) -> anyhow::Result<TargetLabel> {
    let mut visited: SmallSet<TargetLabel> = SmallSet::new();
    let mut current = label.dupe();
    loop {
        let node = graph.get(&current)?;
        let Some(alias) = node.as_alias() else {
            return Ok(current);
        };
        visited.insert(current.dupe());
        let next = match alias.actual.configure(ctx)? {
            ConfiguredAttr::Dep(next) => next,
            _ => return Err(AliasResolutionError::MalformedActual(current).into()),
        };
        if visited.contains(&next) {
            let chain: Vec<TargetLabel> = visited
                .iter()
                .skip_while(|l| **l != next)
                .duped()
                .collect();
            return Err(AliasResolutionError::Cycle(chain).into());
        }
        current = next;
    }
}

struct CollectDeps {
    deps: Vec<TargetLabel>,
}

impl ConfiguredAttrTraversal for CollectDeps {
    fn dep(&mut self, dep: &TargetLabel) -> anyhow::Result<()> {
        self.deps.push(dep.dupe());
        Ok(())
    }
}

/// Configure an attribute and return its dependency labels, alias chains
/// resolved, in attribute order.
pub fn resolve_attr_deps(
    graph: &TargetGraph,
    attr: &CoercedAttr,
    ctx: &dyn AttrConfigurationContext,
) -> anyhow::Result<Vec<TargetLabel>> {
    let configured = attr.configure(ctx)?;
    let mut traversal = CollectDeps { deps: Vec::new() };
    configured.traverse(&mut traversal)?;
    traversal
        .deps
        .iter()
        .map(|dep| resolve_alias_chain(graph, dep, ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use quarry_core::configuration::data::ConfigurationData;
    use quarry_core::target::label::TargetLabel;
    use quarry_node::attrs::configuration_context::AttrConfigurationContextImpl;
    use quarry_node::nodes::targets_map::TargetGraph;
    use quarry_node::nodes::testing;
    use quarry_node::nodes::testing::TargetNodeBuilder;

    use crate::resolve::resolve_alias_chain;

    #[test]
    fn follows_chains() {
        let graph = TargetGraph::from_iter([
            TargetNodeBuilder::rule("//a:real").build(),
            testing::alias("//a:one", "//a:two"),
            testing::alias("//a:two", "//a:real"),
        ]);
        let cfg = ConfigurationData::testing_new("t", &[]);
        let ctx = AttrConfigurationContextImpl::new(&graph, &cfg);
        assert_eq!(
            TargetLabel::testing_parse("//a:real"),
            resolve_alias_chain(&graph, &TargetLabel::testing_parse("//a:one"), &ctx).unwrap()
        );
    }

    #[test]
    fn reports_cycles_as_a_chain() {
        let graph = TargetGraph::from_iter([
            testing::alias("//a:one", "//a:two"),
            testing::alias("//a:two", "//a:three"),
            testing::alias("//a:three", "//a:two"),
        ]);
        let cfg = ConfigurationData::testing_new("t", &[]);
        let ctx = AttrConfigurationContextImpl::new(&graph, &cfg);
        let err = resolve_alias_chain(&graph, &TargetLabel::testing_parse("//a:one"), &ctx)
            .unwrap_err()
            .to_string();
        assert!(err.contains("Alias cycle detected"), "{}", err);
        assert!(err.contains("//a:two ->"), "{}", err);
        assert!(err.contains("//a:three ->"), "{}", err);
        // The entry point of the chain is not part of the cycle.
        assert!(!err.contains("//a:one"), "{}", err);
    }

    #[test]
    fn select_in_alias_actual() {
        let graph = TargetGraph::from_iter([
            TargetNodeBuilder::rule("//a:linux").build(),
            TargetNodeBuilder::rule("//a:other").build(),
            testing::config_setting("//c:linux", &[("//os:os", "linux")]),
            testing::alias_select(
                "//a:pick",
                &[("//c:linux", "//a:linux")],
                Some("//a:other"),
            ),
        ]);
        let linux = ConfigurationData::testing_new("linux", &[("//os:os", "linux")]);
        let ctx = AttrConfigurationContextImpl::new(&graph, &linux);
        assert_eq!(
            TargetLabel::testing_parse("//a:linux"),
            resolve_alias_chain(&graph, &TargetLabel::testing_parse("//a:pick"), &ctx).unwrap()
        );

        let macos = ConfigurationData::testing_new("macos", &[("//os:os", "macos")]);
        let ctx = AttrConfigurationContextImpl::new(&graph, &macos);
        assert_eq!(
            TargetLabel::testing_parse("//a:other"),
            resolve_alias_chain(&graph, &TargetLabel::testing_parse("//a:pick"), &ctx).unwrap()
        );
    }
}
