//! In-process notification bus backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;

use lightsout_domain::error::LightsOutError;

use crate::ports::{Notification, NotificationPublisher};

/// In-process bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the notification is simply dropped).
pub struct InProcessEventBus {
    sender: broadcast::Sender<Notification>,
}

impl InProcessEventBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to notifications published *after* this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl NotificationPublisher for InProcessEventBus {
    fn publish(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), LightsOutError>> + Send {
        // send only fails without receivers
        let _ = self.sender.send(notification);
        async { Ok(()) }
    }
}
