/*
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use quarry_core::package::BuildFilePath;
use quarry_core::target::configured_target_label::ConfiguredTargetLabel;

use crate::key::AspectKey;

/// Emitted when analysis of a target or an aspect evaluation fails. The key
/// is set for aspect failures so the event names the aspect, not just the
/// target it was applied to.
#[derive(Clone, Debug)]
pub struct AnalysisFailureEvent {
    pub key: Option<AspectKey>,
    pub target: ConfiguredTargetLabel,
    pub message: String,
    pub location: Option<BuildFilePath>,
}

pub trait EventSink: Send + Sync {
    fn analysis_failure(&self, event: AnalysisFailureEvent);
}

/// Forwards failure events to the `tracing` subscriber.
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn analysis_failure(&self, event: AnalysisFailureEvent) {
        match (&event.key, &event.location) {
            (Some(key), Some(location)) => {
                tracing::error!(%key, %location, "{}", event.message)
            }
            (Some(key), None) => tracing::error!(%key, "{}", event.message),
            (None, Some(location)) => {
                tracing::error!(label = %event.target, %location, "{}", event.message)
            }
            (None, None) => tracing::error!(label = %event.target, "{}", event.message),
        }
    }
}
