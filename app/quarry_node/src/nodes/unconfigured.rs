/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use allocative::Allocative;
use dupe::Dupe;
use quarry_core::configuration::config_setting::ConfigSettingData;
use quarry_core::package::BuildFilePath;
use quarry_core::provider::id::ProviderIdSet;
use quarry_core::target::label::TargetLabel;
use starlark_map::small_map::SmallMap;

use crate::aspect::AttachedAspect;
use crate::attrs::coerced_attr::CoercedAttr;

/// A node of the unconfigured target graph. Cheap to clone.
#[derive(Clone, Dupe, Debug, Allocative)]
pub struct TargetNode(Arc<TargetNodeData>);

#[derive(Debug, Allocative)]
struct TargetNodeData {
    label: TargetLabel,
    variant: TargetNodeVariant,
}

#[derive(Debug, Allocative)]
enum TargetNodeVariant {
    Rule(RuleData),
    Alias(AliasData),
    ConfigSetting(ConfigSettingData),
}

#[derive(Debug, Allocative)]
pub struct RuleData {
    pub rule_type: String,
    pub attrs: SmallMap<String, CoercedAttr>,
    /// Aspects the rule attaches to the targets of an attribute, keyed by
    /// attribute name.
    pub attr_aspects: SmallMap<String, Box<[AttachedAspect]>>,
    pub advertised_providers: ProviderIdSet,
}

#[derive(Debug, Allocative)]
pub struct AliasData {
    /// The forwarded target. May be a `select`.
    pub actual: CoercedAttr,
}

impl TargetNode {
    pub fn rule(label: TargetLabel, data: RuleData) -> TargetNode {
        TargetNode(Arc::new(TargetNodeData {
            label,
            variant: TargetNodeVariant::Rule(data),
        }))
    }

    pub fn alias(label: TargetLabel, actual: CoercedAttr) -> TargetNode {
        TargetNode(Arc::new(TargetNodeData {
            label,
            variant: TargetNodeVariant::Alias(AliasData { actual }),
        }))
    }

    pub fn config_setting(label: TargetLabel, data: ConfigSettingData) -> TargetNode {
        TargetNode(Arc::new(TargetNodeData {
            label,
            variant: TargetNodeVariant::ConfigSetting(data),
        }))
    }

    pub fn label(&self) -> &TargetLabel {
        &self.0.label
    }

    pub fn build_file(&self) -> BuildFilePath {
        self.0.label.pkg().build_file()
    }

    pub fn is_alias(&self) -> bool {
        matches!(self.0.variant, TargetNodeVariant::Alias(..))
    }

    pub fn as_rule(&self) -> Option<&RuleData> {
        match &self.0.variant {
            TargetNodeVariant::Rule(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_alias(&self) -> Option<&AliasData> {
        match &self.0.variant {
            TargetNodeVariant::Alias(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_config_setting(&self) -> Option<&ConfigSettingData> {
        match &self.0.variant {
            TargetNodeVariant::ConfigSetting(data) => Some(data),
            _ => None,
        }
    }
}
