/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use allocative::Allocative;
use quarry_core::target::label::TargetLabel;

use crate::attrs::traversal::ConfiguredAttrTraversal;

/// An attribute value after `select` resolution. There is exactly one value
/// per attribute per configuration.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Allocative)]
pub enum ConfiguredAttr {
    None,
    String(Arc<str>),
    Dep(TargetLabel),
    List(Box<[ConfiguredAttr]>),
}

impl ConfiguredAttr {
    pub fn traverse(&self, traversal: &mut dyn ConfiguredAttrTraversal) -> anyhow::Result<()> {
        match self {
            ConfiguredAttr::None => Ok(()),
            ConfiguredAttr::String(..) => Ok(()),
            ConfiguredAttr::Dep(dep) => traversal.dep(dep),
            ConfiguredAttr::List(list) => {
                for v in list.iter() {
                    v.traverse(traversal)?;
                }
                Ok(())
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfiguredAttr::String(v) => Some(v),
            _ => None,
        }
    }
}
