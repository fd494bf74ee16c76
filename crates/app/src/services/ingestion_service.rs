//! Ingestion service — turns bridge polls into state-change events.

use std::sync::Arc;

use chrono::Duration;
use serde::Deserialize;

use lightsout_domain::error::LightsOutError;
use lightsout_domain::time::{Timestamp, saturating_sub};

use crate::ports::{EventStore, PollSource};
use crate::state_cache::DeviceStateCache;

/// Polling and retention settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub poll_interval_secs: u64,
    /// Events older than this are purged.
    pub retention_days: u32,
    pub purge_interval_secs: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            retention_days: 90,
            purge_interval_secs: 86_400,
        }
    }
}

/// What one poll produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    pub devices: usize,
    pub changes: usize,
}

/// Polls the bridge and appends every observed change to the event store.
pub struct IngestionService<PS, ES> {
    source: PS,
    store: ES,
    states: Arc<DeviceStateCache>,
    retention_days: u32,
}

impl<PS, ES> IngestionService<PS, ES>
where
    PS: PollSource,
    ES: EventStore,
{
    pub fn new(source: PS, store: ES, states: Arc<DeviceStateCache>, retention_days: u32) -> Self {
        Self {
            source,
            store,
            states,
            retention_days,
        }
    }

    /// Poll once, stamping changes with the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::poll_at`].
    pub async fn poll(&self) -> Result<PollReport, LightsOutError> {
        self.poll_at(lightsout_domain::time::now()).await
    }

    /// Poll once, stamping changes with `at`.
    ///
    /// Changes are stored before the state cache moves forward, so a storage
    /// failure leaves them to be detected again on the next poll. Stamps never
    /// go below the newest stored event, even if the wall clock steps back.
    ///
    /// # Errors
    ///
    /// Returns [`LightsOutError::Poll`] when the bridge cannot be read,
    /// [`LightsOutError::Validation`] for malformed snapshots, or a storage
    /// error from the event store.
    #[tracing::instrument(skip(self))]
    pub async fn poll_at(&self, at: Timestamp) -> Result<PollReport, LightsOutError> {
        let snapshot = self.source.poll().await?;
        snapshot.validate()?;

        if self.states.last_recorded().is_none()
            && let Some(newest) = self.store.get_recent(1).await?.into_iter().next()
        {
            self.states.record_stamp(newest.timestamp);
        }
        let stamped = self.states.stamp(at);
        if stamped > at {
            tracing::debug!(%at, %stamped, "clock behind the event log, holding timestamps");
        }

        let changes = self.states.diff(&snapshot, stamped);
        let count = changes.len();
        if !changes.is_empty() {
            self.store.append(changes).await?;
            self.states.record_stamp(stamped);
            tracing::debug!(changes = count, "state changes recorded");
        }
        self.states.commit(&snapshot);

        Ok(PollReport {
            devices: snapshot.len(),
            changes: count,
        })
    }

    /// Delete events that fell out of the retention period.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the event store.
    #[tracing::instrument(skip(self))]
    pub async fn purge_expired_at(&self, now: Timestamp) -> Result<u64, LightsOutError> {
        let cutoff = saturating_sub(now, Duration::days(i64::from(self.retention_days)));
        let removed = self.store.purge_before(cutoff).await?;
        if removed > 0 {
            tracing::info!(removed, %cutoff, "expired events purged");
        }
        Ok(removed)
    }

    /// [`Self::purge_expired_at`] relative to the current time.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the event store.
    pub async fn purge_expired(&self) -> Result<u64, LightsOutError> {
        self.purge_expired_at(lightsout_domain::time::now()).await
    }
}
