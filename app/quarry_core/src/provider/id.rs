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
use starlark_map::small_set::SmallSet;

use crate::bzl::ImportPath;

/// Identity of a provider. Providers defined in an extension file carry the
/// path of that file; native providers have no path.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
pub struct ProviderId {
    pub path: Option<ImportPath>,
    pub name: String,
}

impl ProviderId {
    pub fn native(name: &str) -> ProviderId {
        ProviderId {
            path: None,
            name: name.to_owned(),
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An ordered set of provider ids, as used for a rule's advertised providers
/// and for an aspect's required providers.
#[derive(Debug, Clone, Dupe, Default, Eq, PartialEq, Allocative)]
pub struct ProviderIdSet(Arc<SmallSet<Arc<ProviderId>>>);

impl ProviderIdSet {
    pub fn contains(&self, id: &ProviderId) -> bool {
        self.0.contains(id)
    }

    pub fn is_subset_of(&self, other: &ProviderIdSet) -> bool {
        self.0.iter().all(|id| other.0.contains(&**id))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ProviderId>> {
        self.0.iter()
    }
}

impl FromIterator<Arc<ProviderId>> for ProviderIdSet {
    fn from_iter<T: IntoIterator<Item = Arc<ProviderId>>>(iter: T) -> ProviderIdSet {
        ProviderIdSet(Arc::new(SmallSet::from_iter(iter)))
    }
}

impl FromIterator<ProviderId> for ProviderIdSet {
    fn from_iter<T: IntoIterator<Item = ProviderId>>(iter: T) -> ProviderIdSet {
        iter.into_iter().map(Arc::new).collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::provider::id::ProviderId;
    use crate::provider::id::ProviderIdSet;

    pub(crate) fn provider_id_set(names: &[&str]) -> ProviderIdSet {
        names.iter().map(|name| ProviderId::native(name)).collect()
    }
}
