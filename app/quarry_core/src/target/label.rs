/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

use allocative::Allocative;
use dupe::Dupe;

use crate::configuration::data::ConfigurationData;
use crate::package::PackageLabel;
use crate::target::configured_target_label::ConfiguredTargetLabel;

#[derive(Debug, thiserror::Error)]
enum TargetLabelError {
    #[error("Invalid target label `{0}`")]
    Invalid(String),
}

/// An unconfigured target label, e.g. `//foo/bar:baz`.
///
/// Stored as the full label string; package and name are sliced out on
/// demand.
#[derive(Clone, Dupe, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
pub struct TargetLabel(Arc<str>);

impl TargetLabel {
    pub fn parse(label: &str) -> anyhow::Result<TargetLabel> {
        let Some(rest) = label.strip_prefix("//") else {
            return Err(TargetLabelError::Invalid(label.to_owned()).into());
        };
        match rest.split_once(':') {
            Some((pkg, name)) if !name.is_empty() && !name.contains(':') && !pkg.contains(':') => {
                Ok(TargetLabel(Arc::from(label)))
            }
            _ => Err(TargetLabelError::Invalid(label.to_owned()).into()),
        }
    }

    pub fn testing_parse(label: &str) -> TargetLabel {
        TargetLabel::parse(label).unwrap()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn pkg(&self) -> PackageLabel {
        let rest = &self.0["//".len()..];
        let (pkg, _) = rest.split_once(':').unwrap();
        PackageLabel::new(pkg)
    }

    pub fn name(&self) -> &str {
        let (_, name) = self.0.split_once(':').unwrap();
        name
    }

    pub fn configure(&self, cfg: ConfigurationData) -> ConfiguredTargetLabel {
        ConfiguredTargetLabel::new(self.dupe(), cfg)
    }
}

impl Display for TargetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::target::label::TargetLabel;

    #[test]
    fn parse() {
        let label = TargetLabel::testing_parse("//foo/bar:baz");
        assert_eq!("//foo/bar", &label.pkg().to_string());
        assert_eq!("baz", label.name());
        assert_eq!("//foo/bar:baz", &label.to_string());

        assert!(TargetLabel::parse("foo/bar:baz").is_err());
        assert!(TargetLabel::parse("//foo/bar").is_err());
        assert!(TargetLabel::parse("//foo:bar:baz").is_err());
        assert!(TargetLabel::parse("//foo:").is_err());
    }
}
