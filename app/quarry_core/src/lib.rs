/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Core vocabulary types shared by the rest of quarry: labels, packages,
//! configurations and provider identities. Nothing here knows about the
//! target graph or about evaluation.

pub mod bzl;
pub mod configuration;
pub mod package;
pub mod provider;
pub mod target;
