/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::collections::BTreeMap;

use allocative::Allocative;

use crate::configuration::constraints::ConstraintKey;
use crate::configuration::constraints::ConstraintValue;

/// The constraint values a `config_setting` target selects on.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
pub struct ConfigSettingData {
    pub constraints: BTreeMap<ConstraintKey, ConstraintValue>,
}

impl ConfigSettingData {
    pub(crate) fn is_subset<K: Ord, V: Eq>(a: &BTreeMap<K, V>, b: &BTreeMap<K, V>) -> bool {
        a.len() <= b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
    }

    /// `self` refines `that` when it selects on strictly more information.
    /// Used to pick the most specific branch when several `select` keys
    /// match the active configuration.
    pub fn refines(&self, that: &ConfigSettingData) -> bool {
        self.constraints.len() > that.constraints.len()
            && Self::is_subset(&that.constraints, &self.constraints)
    }

    pub fn testing_new(constraints: &[(&str, &str)]) -> ConfigSettingData {
        ConfigSettingData {
            constraints: constraints
                .iter()
                .map(|(k, v)| (ConstraintKey::new(k), ConstraintValue::new(v)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::configuration::config_setting::ConfigSettingData;

    #[test]
    fn refines() {
        let c_linux = ConfigSettingData::testing_new(&[("//os:os", "linux")]);
        let c_arm64 = ConfigSettingData::testing_new(&[("//cpu:cpu", "arm64")]);
        let c_linux_arm64 =
            ConfigSettingData::testing_new(&[("//os:os", "linux"), ("//cpu:cpu", "arm64")]);
        let c_linux_x86_64 =
            ConfigSettingData::testing_new(&[("//os:os", "linux"), ("//cpu:cpu", "x86_64")]);

        // A config setting does not refine an identical config setting.
        assert!(!c_linux.refines(&c_linux));

        assert!(!c_linux.refines(&c_arm64));
        assert!(!c_arm64.refines(&c_linux));

        assert!(c_linux_arm64.refines(&c_linux));
        assert!(c_linux_arm64.refines(&c_arm64));

        assert!(!c_linux_x86_64.refines(&c_linux_arm64));
    }
}
