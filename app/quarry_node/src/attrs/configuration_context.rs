/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use quarry_core::configuration::config_setting::ConfigSettingData;
use quarry_core::configuration::data::ConfigurationData;
use quarry_core::target::label::TargetLabel;

use crate::nodes::targets_map::TargetGraph;

#[derive(Debug, thiserror::Error)]
enum AttrConfigurationContextError {
    #[error("select key `{0}` is not a `config_setting` target")]
    NotAConfigSetting(TargetLabel),
}

/// Resolution context for `select`: the active configuration plus lookup of
/// the `config_setting` targets select keys point at.
pub trait AttrConfigurationContext {
    fn cfg(&self) -> &ConfigurationData;

    /// The key's `config_setting` data when it matches the active
    /// configuration, `None` when it does not match, an error when the key
    /// is not a `config_setting` target at all.
    fn matched_setting(&self, label: &TargetLabel)
    -> anyhow::Result<Option<&ConfigSettingData>>;
}

pub struct AttrConfigurationContextImpl<'a> {
    graph: &'a TargetGraph,
    cfg: &'a ConfigurationData,
}

impl<'a> AttrConfigurationContextImpl<'a> {
    pub fn new(graph: &'a TargetGraph, cfg: &'a ConfigurationData) -> Self {
        AttrConfigurationContextImpl { graph, cfg }
    }
}

impl AttrConfigurationContext for AttrConfigurationContextImpl<'_> {
    fn cfg(&self) -> &ConfigurationData {
        self.cfg
    }

    fn matched_setting(
        &self,
        label: &TargetLabel,
    ) -> anyhow::Result<Option<&ConfigSettingData>> {
        let node = self.graph.get(label)?;
        let setting = node
            .as_config_setting()
            .ok_or_else(|| AttrConfigurationContextError::NotAConfigSetting(label.clone()))?;
        Ok(if self.cfg.matches(setting) {
            Some(setting)
        } else {
            None
        })
    }
}
