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

/// A package: the directory a build file lives in, e.g. `//foo/bar`.
#[derive(Clone, Dupe, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
pub struct PackageLabel(Arc<str>);

impl PackageLabel {
    /// `path` is the package path without the leading `//`.
    pub fn new(path: &str) -> PackageLabel {
        PackageLabel(Arc::from(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn build_file(&self) -> BuildFilePath {
        BuildFilePath { package: self.dupe() }
    }
}

impl Display for PackageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}", self.0)
    }
}

/// Path of the build file defining a package. Used both as failure-event
/// location and as build-description provenance for incremental
/// re-evaluation.
#[derive(Clone, Dupe, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
pub struct BuildFilePath {
    package: PackageLabel,
}

impl BuildFilePath {
    pub fn package(&self) -> &PackageLabel {
        &self.package
    }
}

impl Display for BuildFilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/BUILD", self.package)
    }
}
