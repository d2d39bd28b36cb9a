/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Node construction helpers for tests.

use quarry_core::configuration::config_setting::ConfigSettingData;
use quarry_core::provider::id::ProviderId;
use quarry_core::target::label::TargetLabel;
use starlark_map::small_map::SmallMap;

use crate::aspect::AspectId;
use crate::aspect::AttachedAspect;
use crate::attrs::coerced_attr::CoercedAttr;
use crate::nodes::unconfigured::RuleData;
use crate::nodes::unconfigured::TargetNode;

pub struct TargetNodeBuilder {
    label: TargetLabel,
    rule_type: String,
    attrs: SmallMap<String, CoercedAttr>,
    attr_aspects: SmallMap<String, Vec<AttachedAspect>>,
    advertised: Vec<ProviderId>,
}

impl TargetNodeBuilder {
    pub fn rule(label: &str) -> TargetNodeBuilder {
        TargetNodeBuilder {
            label: TargetLabel::testing_parse(label),
            rule_type: "test_rule".to_owned(),
            attrs: SmallMap::new(),
            attr_aspects: SmallMap::new(),
            advertised: Vec::new(),
        }
    }

    pub fn rule_type(mut self, rule_type: &str) -> Self {
        self.rule_type = rule_type.to_owned();
        self
    }

    pub fn dep_attr(mut self, attr: &str, deps: &[&str]) -> Self {
        let value = CoercedAttr::List(deps.iter().map(|d| CoercedAttr::testing_dep(d)).collect());
        self.attrs.insert(attr.to_owned(), value);
        self
    }

    pub fn string_attr(mut self, attr: &str, value: &str) -> Self {
        self.attrs
            .insert(attr.to_owned(), CoercedAttr::testing_string(value));
        self
    }

    pub fn select_dep_attr(
        mut self,
        attr: &str,
        entries: &[(&str, &str)],
        default: Option<&str>,
    ) -> Self {
        let value = CoercedAttr::testing_select(
            &entries
                .iter()
                .map(|(k, d)| (*k, CoercedAttr::testing_dep(d)))
                .collect::<Vec<_>>(),
            default.map(CoercedAttr::testing_dep),
        );
        self.attrs.insert(attr.to_owned(), value);
        self
    }

    pub fn apply_aspect(self, attr: &str, aspect: &AspectId) -> Self {
        self.attach(attr, AttachedAspect::new(aspect.clone()))
    }

    pub fn apply_aspect_with_params(
        self,
        attr: &str,
        aspect: &AspectId,
        params_from_attrs: &[&str],
    ) -> Self {
        self.attach(
            attr,
            AttachedAspect::with_params_from_attrs(aspect.clone(), params_from_attrs),
        )
    }

    fn attach(mut self, attr: &str, attached: AttachedAspect) -> Self {
        match self.attr_aspects.get_mut(attr) {
            Some(aspects) => aspects.push(attached),
            None => {
                self.attr_aspects.insert(attr.to_owned(), vec![attached]);
            }
        }
        self
    }

    pub fn advertise(mut self, providers: &[&str]) -> Self {
        self.advertised
            .extend(providers.iter().map(|p| ProviderId::native(p)));
        self
    }

    pub fn build(self) -> TargetNode {
        TargetNode::rule(self.label, RuleData {
            rule_type: self.rule_type,
            attrs: self.attrs,
            attr_aspects: self
                .attr_aspects
                .into_iter()
                .map(|(k, v)| (k, v.into_boxed_slice()))
                .collect(),
            advertised_providers: self.advertised.into_iter().collect(),
        })
    }
}

pub fn alias(label: &str, actual: &str) -> TargetNode {
    TargetNode::alias(
        TargetLabel::testing_parse(label),
        CoercedAttr::testing_dep(actual),
    )
}

pub fn alias_select(label: &str, entries: &[(&str, &str)], default: Option<&str>) -> TargetNode {
    TargetNode::alias(
        TargetLabel::testing_parse(label),
        CoercedAttr::testing_select(
            &entries
                .iter()
                .map(|(k, d)| (*k, CoercedAttr::testing_dep(d)))
                .collect::<Vec<_>>(),
            default.map(CoercedAttr::testing_dep),
        ),
    )
}

pub fn config_setting(label: &str, constraints: &[(&str, &str)]) -> TargetNode {
    TargetNode::config_setting(
        TargetLabel::testing_parse(label),
        ConfigSettingData::testing_new(constraints),
    )
}
