//! Notification bus port — publish/subscribe for core happenings.

use std::future::Future;

use serde::Serialize;

use lightsout_domain::decision::AutomationDecision;
use lightsout_domain::error::LightsOutError;
use lightsout_domain::time::Timestamp;

/// Something interesting the core wants observers to know about.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A detection run swapped a new pattern set into the registry.
    DetectionCompleted {
        version: u64,
        patterns: usize,
        generated_at: Timestamp,
    },
    /// The automation coordinator reached a verdict.
    DecisionRecorded { decision: AutomationDecision },
}

/// Publishes notifications to interested subscribers.
pub trait NotificationPublisher {
    /// Publish a notification to all current subscribers.
    fn publish(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), LightsOutError>> + Send;
}

impl<T: NotificationPublisher + Send + Sync> NotificationPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), LightsOutError>> + Send {
        (**self).publish(notification)
    }
}
