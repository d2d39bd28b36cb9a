/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use quarry_core::target::label::TargetLabel;

pub trait ConfiguredAttrTraversal {
    fn dep(&mut self, dep: &TargetLabel) -> anyhow::Result<()>;
}
