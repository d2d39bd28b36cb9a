/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::OnceLock;

use allocative::Allocative;
use dupe::Dupe;

use crate::configuration::config_setting::ConfigSettingData;

/// A build configuration. Cheap to clone and to hash; two configurations
/// compare equal when they were built from the same label and constraints.
#[derive(Clone, Dupe, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
pub struct ConfigurationData(Arc<ConfigurationPlatformData>);

#[derive(Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
struct ConfigurationPlatformData {
    label: String,
    data: ConfigSettingData,
}

impl ConfigurationData {
    pub fn new(label: &str, data: ConfigSettingData) -> ConfigurationData {
        ConfigurationData(Arc::new(ConfigurationPlatformData {
            label: label.to_owned(),
            data,
        }))
    }

    /// The configuration of nodes that have not been configured yet, and of
    /// targets that are configuration-independent.
    pub fn unbound() -> ConfigurationData {
        static UNBOUND: OnceLock<ConfigurationData> = OnceLock::new();
        UNBOUND
            .get_or_init(|| ConfigurationData::new("<unbound>", ConfigSettingData::default()))
            .dupe()
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    /// True when every constraint the setting asks for holds in this
    /// configuration.
    pub fn matches(&self, setting: &ConfigSettingData) -> bool {
        ConfigSettingData::is_subset(&setting.constraints, &self.0.data.constraints)
    }

    pub fn testing_new(label: &str, constraints: &[(&str, &str)]) -> ConfigurationData {
        ConfigurationData::new(label, ConfigSettingData::testing_new(constraints))
    }
}

impl Display for ConfigurationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use crate::configuration::config_setting::ConfigSettingData;
    use crate::configuration::data::ConfigurationData;

    #[test]
    fn matches_is_subset() {
        let cfg =
            ConfigurationData::testing_new("linux-arm64", &[
                ("//os:os", "linux"),
                ("//cpu:cpu", "arm64"),
            ]);

        assert!(cfg.matches(&ConfigSettingData::testing_new(&[("//os:os", "linux")])));
        assert!(cfg.matches(&ConfigSettingData::testing_new(&[
            ("//os:os", "linux"),
            ("//cpu:cpu", "arm64"),
        ])));
        assert!(!cfg.matches(&ConfigSettingData::testing_new(&[("//os:os", "macos")])));
        assert!(!cfg.matches(&ConfigSettingData::testing_new(&[("//sanitizer:san", "asan")])));

        // The empty setting matches everything.
        assert!(cfg.matches(&ConfigSettingData::default()));
    }
}
