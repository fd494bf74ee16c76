//! Periodic background jobs and the shutdown signal that stops them.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Broadcasts a one-shot shutdown request to every loop.
#[derive(Debug)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sender: watch::Sender::new(false),
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

/// Resolve once shutdown has been requested (or its sender is gone).
pub async fn shutdown_requested(mut signal: watch::Receiver<bool>) {
    // wait_for returns Err only when the sender was dropped
    let _ = signal.wait_for(|stop| *stop).await;
}

/// Spawn a task calling `job` every `period` until shutdown.
///
/// The first call happens immediately. A slow job delays the next tick
/// instead of queueing a burst of catch-up calls, so a job never overlaps
/// with itself.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    signal: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let stop = shutdown_requested(signal);
        tokio::pin!(stop);
        tracing::debug!(job = name, ?period, "periodic job started");
        loop {
            tokio::select! {
                () = &mut stop => break,
                _ = interval.tick() => job().await,
            }
        }
        tracing::debug!(job = name, "periodic job stopped");
    })
}
