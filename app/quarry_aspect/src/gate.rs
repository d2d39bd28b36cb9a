/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use quarry_core::provider::id::ProviderIdSet;
use quarry_node::aspect::AspectDefinition;

use crate::value::ProviderCollection;

/// The provider gate at planning time: whether an aspect attaches to a
/// target that advertises the given providers. Advertisements are all that
/// is known before the target is analyzed; [`satisfied`] re-checks the
/// requirement against what the analysis actually produced.
///
/// The aspect's requirement is a disjunction of conjunctions. An empty
/// requirement attaches to anything.
pub fn attaches(def: &AspectDefinition, advertised: &ProviderIdSet) -> bool {
    def.required_providers().is_empty()
        || def
            .required_providers()
            .iter()
            .any(|required| required.is_subset_of(advertised))
}

/// The provider gate after the target's analysis. An attachment planned on
/// an advertisement is dropped when the providers were never produced, so a
/// target advertising providers it does not produce does not get the aspect.
pub fn satisfied(def: &AspectDefinition, produced: &ProviderCollection) -> bool {
    def.required_providers().is_empty()
        || def
            .required_providers()
            .iter()
            .any(|required| required.iter().all(|id| produced.contains(id)))
}
