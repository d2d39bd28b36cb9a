/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The unconfigured target graph: nodes, their attributes (including
//! `select`), and the aspect definitions attached to rule attributes.

pub mod aspect;
pub mod attrs;
pub mod nodes;
