/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Constraints are the key-value pairs configurations are made of, e.g.
//! `//os:os = linux`. A `config_setting` matches a configuration when its
//! constraints are a subset of the configuration's.

use std::sync::Arc;

use allocative::Allocative;
use dupe::Dupe;

/// A constraint setting, e.g. `//os:os`.
#[derive(
    Clone,
    Dupe,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Allocative,
    derive_more::Display
)]
pub struct ConstraintKey(Arc<str>);

impl ConstraintKey {
    pub fn new(key: &str) -> ConstraintKey {
        ConstraintKey(Arc::from(key))
    }
}

/// A value of a constraint setting, e.g. `linux`.
#[derive(
    Clone,
    Dupe,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    Allocative,
    derive_more::Display
)]
pub struct ConstraintValue(Arc<str>);

impl ConstraintValue {
    pub fn new(value: &str) -> ConstraintValue {
        ConstraintValue(Arc::from(value))
    }
}
