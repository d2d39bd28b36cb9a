/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Aspect definitions: identity, attachment policy, provider requirements
//! and implicit dependencies. The definition is what a rule attribute or a
//! command line names; attaching it to a configured target produces an
//! aspect key in `quarry_aspect`.

use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

use allocative::Allocative;
use dupe::Dupe;
use quarry_core::bzl::ImportPath;
use quarry_core::provider::id::ProviderIdSet;
use quarry_core::target::label::TargetLabel;
use starlark_map::small_map::SmallMap;
use starlark_map::small_set::SmallSet;
use starlark_map::sorted_map::SortedMap;

/// Identity of an aspect class. Two attachments of the same class to the
/// same target merge into one evaluation (parameters permitting).
#[derive(Clone, Dupe, Debug, Eq, PartialEq, Hash, Allocative)]
pub enum AspectId {
    /// Built-in aspect, identified by name alone.
    Native(Arc<NativeAspectId>),
    /// Aspect defined in an extension file, identified by the file and the
    /// name it is bound to there.
    Starlark(Arc<StarlarkAspectId>),
}

#[derive(Debug, Eq, PartialEq, Hash, Allocative)]
pub struct NativeAspectId {
    pub name: String,
}

#[derive(Debug, Eq, PartialEq, Hash, Allocative)]
pub struct StarlarkAspectId {
    pub import_path: ImportPath,
    pub name: String,
}

impl AspectId {
    pub fn native(name: &str) -> AspectId {
        AspectId::Native(Arc::new(NativeAspectId {
            name: name.to_owned(),
        }))
    }

    pub fn starlark(import_path: ImportPath, name: &str) -> AspectId {
        AspectId::Starlark(Arc::new(StarlarkAspectId {
            import_path,
            name: name.to_owned(),
        }))
    }

    pub fn name(&self) -> &str {
        match self {
            AspectId::Native(id) => &id.name,
            AspectId::Starlark(id) => &id.name,
        }
    }
}

impl Display for AspectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectId::Native(id) => f.write_str(&id.name),
            AspectId::Starlark(id) => write!(f, "{}%{}", id.import_path, id.name),
        }
    }
}

/// String-valued aspect parameters. Part of aspect identity: the same class
/// with different parameters evaluates separately.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Allocative)]
pub struct AspectParameters(SortedMap<String, String>);

impl AspectParameters {
    pub fn empty() -> AspectParameters {
        AspectParameters::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for AspectParameters {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> AspectParameters {
        AspectParameters(SortedMap::from_iter(iter))
    }
}

/// Which dependency edges of a target an aspect walks down.
#[derive(Clone, Debug, Allocative)]
pub enum AspectAttachmentPolicy {
    /// Only the named attributes.
    Explicit(SmallSet<String>),
    /// Every attribute, including attributes of the aspect itself.
    All,
}

impl AspectAttachmentPolicy {
    pub fn explicit(attrs: &[&str]) -> AspectAttachmentPolicy {
        AspectAttachmentPolicy::Explicit(attrs.iter().map(|a| (*a).to_owned()).collect())
    }
}

/// The static shape of an aspect class.
#[derive(Debug, Allocative)]
pub struct AspectDefinition {
    id: AspectId,
    policy: AspectAttachmentPolicy,
    /// Disjunction of conjunctions: the aspect attaches to a target
    /// advertising all providers of at least one of these sets. Empty means
    /// attach to anything.
    required_providers: Box<[ProviderIdSet]>,
    advertised_providers: ProviderIdSet,
    /// Dependencies the aspect itself brings along, keyed by attribute name.
    implicit_deps: SmallMap<String, TargetLabel>,
}

impl AspectDefinition {
    pub fn new(id: AspectId, policy: AspectAttachmentPolicy) -> AspectDefinition {
        AspectDefinition {
            id,
            policy,
            required_providers: Box::new([]),
            advertised_providers: ProviderIdSet::default(),
            implicit_deps: SmallMap::new(),
        }
    }

    pub fn requiring(mut self, required: Box<[ProviderIdSet]>) -> AspectDefinition {
        self.required_providers = required;
        self
    }

    pub fn advertising(mut self, advertised: ProviderIdSet) -> AspectDefinition {
        self.advertised_providers = advertised;
        self
    }

    pub fn with_implicit_dep(mut self, attr: &str, dep: TargetLabel) -> AspectDefinition {
        self.implicit_deps.insert(attr.to_owned(), dep);
        self
    }

    pub fn id(&self) -> &AspectId {
        &self.id
    }

    pub fn policy(&self) -> &AspectAttachmentPolicy {
        &self.policy
    }

    pub fn required_providers(&self) -> &[ProviderIdSet] {
        &self.required_providers
    }

    pub fn advertised_providers(&self) -> &ProviderIdSet {
        &self.advertised_providers
    }

    pub fn implicit_deps(&self) -> &SmallMap<String, TargetLabel> {
        &self.implicit_deps
    }
}

/// An aspect a rule attaches to the targets of one of its attributes.
#[derive(Clone, Debug, Allocative)]
pub struct AttachedAspect {
    pub aspect: AspectId,
    /// Names of string attributes of the attaching rule whose values become
    /// aspect parameters of the same name.
    pub params_from_attrs: Box<[String]>,
}

impl AttachedAspect {
    pub fn new(aspect: AspectId) -> AttachedAspect {
        AttachedAspect {
            aspect,
            params_from_attrs: Box::new([]),
        }
    }

    pub fn with_params_from_attrs(aspect: AspectId, attrs: &[&str]) -> AttachedAspect {
        AttachedAspect {
            aspect,
            params_from_attrs: attrs.iter().map(|a| (*a).to_owned()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use quarry_core::bzl::ImportPath;

    use crate::aspect::AspectId;
    use crate::aspect::AspectParameters;

    #[test]
    fn display() {
        assert_eq!("checker", AspectId::native("checker").to_string());
        assert_eq!(
            "//tools:lint.bzl%lint_aspect",
            AspectId::starlark(ImportPath::testing_new("//tools:lint.bzl"), "lint_aspect")
                .to_string()
        );
    }

    #[test]
    fn parameters_are_order_independent() {
        let a: AspectParameters = [
            ("baz".to_owned(), "1".to_owned()),
            ("qux".to_owned(), "2".to_owned()),
        ]
        .into_iter()
        .collect();
        let b: AspectParameters = [
            ("qux".to_owned(), "2".to_owned()),
            ("baz".to_owned(), "1".to_owned()),
        ]
        .into_iter()
        .collect();
        assert_eq!(a, b);
        assert_eq!(Some("1"), a.get("baz"));
        assert!(AspectParameters::empty().is_empty());
    }
}
