/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt;
use std::fmt::Display;

use allocative::Allocative;
use dupe::Dupe;

use crate::configuration::data::ConfigurationData;
use crate::package::PackageLabel;
use crate::target::label::TargetLabel;

/// A target label paired with the configuration it is analyzed in.
#[derive(Clone, Dupe, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
pub struct ConfiguredTargetLabel {
    target: TargetLabel,
    cfg: ConfigurationData,
}

impl ConfiguredTargetLabel {
    pub fn new(target: TargetLabel, cfg: ConfigurationData) -> ConfiguredTargetLabel {
        ConfiguredTargetLabel { target, cfg }
    }

    pub fn unconfigured(&self) -> &TargetLabel {
        &self.target
    }

    pub fn cfg(&self) -> &ConfigurationData {
        &self.cfg
    }

    pub fn pkg(&self) -> PackageLabel {
        self.target.pkg()
    }
}

impl Display for ConfiguredTargetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.target, self.cfg)
    }
}
