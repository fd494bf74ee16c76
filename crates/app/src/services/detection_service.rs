//! Detection service — runs the pattern detector over the event window and
//! publishes the result to the registry.

use std::sync::Arc;

use chrono::Duration;

use lightsout_domain::error::{ConcurrencyConflict, LightsOutError, NotFoundError};
use lightsout_domain::id::PatternId;
use lightsout_domain::pattern::Pattern;
use lightsout_domain::time::{TimeWindow, Timestamp};

use crate::detector::PatternDetector;
use crate::pattern_registry::{PatternRegistry, PatternSet};
use crate::ports::{EventStore, Notification, NotificationPublisher, PatternCache};

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionReport {
    pub version: u64,
    pub events: usize,
    pub patterns: usize,
}

/// Owns detection runs and the hand-off to the registry.
pub struct DetectionService<ES, PC, P> {
    store: ES,
    cache: PC,
    publisher: P,
    registry: Arc<PatternRegistry>,
    detector: PatternDetector,
    running: tokio::sync::Mutex<()>,
}

impl<ES, PC, P> DetectionService<ES, PC, P>
where
    ES: EventStore,
    PC: PatternCache,
    P: NotificationPublisher,
{
    pub fn new(
        store: ES,
        cache: PC,
        publisher: P,
        registry: Arc<PatternRegistry>,
        detector: PatternDetector,
    ) -> Self {
        Self {
            store,
            cache,
            publisher,
            registry,
            detector,
            running: tokio::sync::Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }

    pub fn detector(&self) -> &PatternDetector {
        &self.detector
    }

    /// The active pattern set.
    pub fn active_patterns(&self) -> Arc<PatternSet> {
        self.registry.snapshot()
    }

    /// One active pattern by id.
    ///
    /// # Errors
    ///
    /// Returns [`LightsOutError::NotFound`] when no active pattern has `id`.
    pub fn pattern(&self, id: PatternId) -> Result<Pattern, LightsOutError> {
        self.registry.snapshot().get(id).cloned().ok_or_else(|| {
            NotFoundError {
                entity: "Pattern",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Load the cached pattern set into an empty registry.
    ///
    /// Returns the number of patterns restored.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the pattern cache.
    #[tracing::instrument(skip(self))]
    pub async fn restore_cached(&self, now: Timestamp) -> Result<usize, LightsOutError> {
        let patterns = self.cache.load().await?;
        if patterns.is_empty() || !self.registry.snapshot().is_empty() {
            return Ok(0);
        }
        let set = self.registry.replace(patterns, now);
        tracing::info!(patterns = set.len(), "pattern cache restored");
        Ok(set.len())
    }

    /// Run detection now.
    ///
    /// # Errors
    ///
    /// See [`Self::run_at`].
    pub async fn run(&self) -> Result<DetectionReport, LightsOutError> {
        self.run_at(lightsout_domain::time::now()).await
    }

    /// Run detection over the window ending at `now` and swap the result in.
    ///
    /// # Errors
    ///
    /// Returns [`LightsOutError::Conflict`] when another run is in progress
    /// (this run is skipped, not queued), [`LightsOutError::Input`] when the
    /// event window is malformed (the registry is left untouched), or a
    /// storage error from the event store.
    #[tracing::instrument(skip(self))]
    pub async fn run_at(&self, now: Timestamp) -> Result<DetectionReport, LightsOutError> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::debug!("detection already running, skipped");
            return Err(ConcurrencyConflict.into());
        };

        let span = Duration::days(i64::from(self.detector.config().window_days));
        let events = self.store.query(TimeWindow::ending_at(now, span)).await?;
        let patterns = match self.detector.detect(&events) {
            Ok(patterns) => patterns,
            Err(err) => {
                tracing::warn!(error = %err, "event window rejected, keeping previous patterns");
                return Err(err.into());
            }
        };

        let set = self.registry.replace(patterns, now);
        tracing::info!(
            version = set.version,
            events = events.len(),
            patterns = set.len(),
            "detection completed"
        );

        if let Err(err) = self.cache.save(set.patterns().to_vec()).await {
            tracing::warn!(error = %err, "failed to persist pattern cache");
        }
        if let Err(err) = self
            .publisher
            .publish(Notification::DetectionCompleted {
                version: set.version,
                patterns: set.len(),
                generated_at: now,
            })
            .await
        {
            tracing::warn!(error = %err, "failed to publish detection result");
        }

        Ok(DetectionReport {
            version: set.version,
            events: events.len(),
            patterns: set.len(),
        })
    }
}
