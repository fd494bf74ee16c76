//! Prediction service — one predictor tick: read patterns and state, predict,
//! hand actionable predictions to the coordinator.

use std::sync::{Arc, RwLock};

use chrono::Duration;

use lightsout_domain::decision::AutomationDecision;
use lightsout_domain::error::LightsOutError;
use lightsout_domain::prediction::Prediction;
use lightsout_domain::time::{TimeWindow, Timestamp, saturating_add, saturating_sub};

use crate::automation_coordinator::AutomationCoordinator;
use crate::pattern_registry::PatternRegistry;
use crate::ports::{CommandSink, EventStore, NotificationPublisher};
use crate::predictor::{PredictionContext, Predictor, lookback};
use crate::retry::Clock;
use crate::state_cache::DeviceStateCache;

/// The predictions of the most recent tick, for read-only consumers.
#[derive(Debug, Default)]
pub struct PredictionBoard {
    latest: RwLock<Arc<Vec<Prediction>>>,
}

impl PredictionBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn latest(&self) -> Arc<Vec<Prediction>> {
        Arc::clone(
            &self
                .latest
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }

    fn replace(&self, predictions: Vec<Prediction>) {
        *self
            .latest
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Arc::new(predictions);
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone)]
pub struct PredictionReport {
    pub predictions: usize,
    pub decisions: Vec<AutomationDecision>,
}

/// Drives the predictor and the automation coordinator.
pub struct PredictionService<ES, S, C, P> {
    store: ES,
    registry: Arc<PatternRegistry>,
    states: Arc<DeviceStateCache>,
    predictor: Predictor,
    coordinator: Arc<AutomationCoordinator<S, C, P>>,
    board: Arc<PredictionBoard>,
}

impl<ES, S, C, P> PredictionService<ES, S, C, P>
where
    ES: EventStore,
    S: CommandSink + Send + Sync,
    C: Clock + Send + Sync,
    P: NotificationPublisher + Send + Sync,
{
    pub fn new(
        store: ES,
        registry: Arc<PatternRegistry>,
        states: Arc<DeviceStateCache>,
        predictor: Predictor,
        coordinator: Arc<AutomationCoordinator<S, C, P>>,
        board: Arc<PredictionBoard>,
    ) -> Self {
        Self {
            store,
            registry,
            states,
            predictor,
            coordinator,
            board,
        }
    }

    pub fn board(&self) -> &Arc<PredictionBoard> {
        &self.board
    }

    /// Run one tick at the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::tick_at`].
    pub async fn tick(&self) -> Result<PredictionReport, LightsOutError> {
        self.tick_at(lightsout_domain::time::now()).await
    }

    /// Predict at `now` and submit every actionable prediction.
    ///
    /// # Errors
    ///
    /// Returns a storage error when recent events cannot be read; no
    /// predictions are made for that tick.
    #[tracing::instrument(skip(self))]
    pub async fn tick_at(&self, now: Timestamp) -> Result<PredictionReport, LightsOutError> {
        let patterns = self.registry.snapshot();
        let span = lookback(&patterns, self.predictor.config());
        // the window end is exclusive; include events stamped exactly `now`
        let window = TimeWindow {
            start: saturating_sub(now, span),
            end: saturating_add(now, Duration::milliseconds(1)),
        };
        let recent = self.store.query(window).await?;
        let states = self.states.snapshot();

        let predictions = self.predictor.predict(
            &patterns,
            &PredictionContext {
                now,
                states: &states,
                recent_events: &recent,
            },
        );
        tracing::debug!(predictions = predictions.len(), "predictor tick");
        self.board.replace(predictions.clone());

        let decisions = self.coordinator.submit_all(&predictions).await;
        Ok(PredictionReport {
            predictions: predictions.len(),
            decisions,
        })
    }
}
