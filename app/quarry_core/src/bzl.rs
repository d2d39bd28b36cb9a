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

#[derive(Debug, thiserror::Error)]
enum ImportPathError {
    #[error("Invalid import path `{0}`")]
    Invalid(String),
}

/// Path of a `.bzl` extension file. Dynamically defined aspects are
/// identified by the file that defines them plus the name they are bound to
/// in that file.
#[derive(Clone, Dupe, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
pub struct ImportPath(Arc<str>);

impl ImportPath {
    pub fn new(path: &str) -> anyhow::Result<ImportPath> {
        if !path.starts_with("//") || !path.ends_with(".bzl") {
            return Err(ImportPathError::Invalid(path.to_owned()).into());
        }
        Ok(ImportPath(Arc::from(path)))
    }

    pub fn testing_new(path: &str) -> ImportPath {
        ImportPath::new(path).unwrap()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ImportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
