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
use quarry_core::target::configured_target_label::ConfiguredTargetLabel;
use quarry_node::aspect::AspectId;
use quarry_node::aspect::AspectParameters;

/// Identity of one aspect evaluation: an aspect class with parameters,
/// applied to a configured target. Keys on the same evaluation compare
/// equal, so an incremental evaluator computes each at most once.
///
/// The target label is always post alias resolution. Keys are created with
/// resolved labels so that an aspect reaching the same target through an
/// alias and through its real name is one evaluation, not two.
#[derive(Clone, Dupe, Debug, Eq, PartialEq, Hash, Allocative)]
pub struct AspectKey(Arc<AspectKeyData>);

#[derive(Debug, Eq, PartialEq, Hash, Allocative)]
struct AspectKeyData {
    label: ConfiguredTargetLabel,
    aspect: AspectId,
    params: AspectParameters,
}

impl AspectKey {
    pub fn new(
        label: ConfiguredTargetLabel,
        aspect: AspectId,
        params: AspectParameters,
    ) -> AspectKey {
        AspectKey(Arc::new(AspectKeyData {
            label,
            aspect,
            params,
        }))
    }

    pub fn label(&self) -> &ConfiguredTargetLabel {
        &self.0.label
    }

    pub fn aspect(&self) -> &AspectId {
        &self.0.aspect
    }

    pub fn params(&self) -> &AspectParameters {
        &self.0.params
    }

    /// Human-readable description, e.g. `checker of //foo:bar` or
    /// `//tools:lint.bzl%lint of //foo:bar`.
    pub fn describe(&self) -> String {
        format!("{} of {}", self.0.aspect, self.0.label.unconfigured())
    }
}

impl Display for AspectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.0.aspect, self.0.label)
    }
}
