/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Aspect propagation and evaluation.
//!
//! An aspect key names an aspect class (with parameters) applied to a
//! configured target. Evaluating a key resolves alias chains, checks the
//! provider gate, plans which dependency edges the aspect walks down,
//! recursively evaluates the same aspect on those dependencies, runs the
//! aspect implementation and checks its advertised providers. Evaluation
//! goes through the [`calculation::AspectCalculation`] trait so an
//! incremental evaluator can memoize per key.

pub mod calculation;
pub mod events;
pub mod gate;
pub mod keep_going;
pub mod key;
pub mod merge;
pub mod planner;
pub mod resolve;
pub mod testing;
pub mod value;
