//! Shared application state for axum handlers.

use std::sync::Arc;

use lightsout_app::automation_log::AutomationLog;
use lightsout_app::event_bus::InProcessEventBus;
use lightsout_app::ports::{EventStore, PatternCache};
use lightsout_app::services::detection_service::DetectionService;
use lightsout_app::services::prediction_service::PredictionBoard;
use lightsout_app::state_cache::DeviceStateCache;

/// Detection service as wired by the daemon: the event store is shared with
/// the other services and notifications go to the in-process bus.
pub type SharedDetection<ES, PC> = DetectionService<Arc<ES>, PC, Arc<InProcessEventBus>>;

/// Application state shared across all axum handlers.
///
/// Generic over the event store and pattern cache to avoid dynamic dispatch.
/// `Clone` is implemented manually so the underlying types themselves do not
/// need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<ES, PC> {
    /// Read access to persisted events (feed and counts).
    pub event_store: Arc<ES>,
    /// Pattern queries and the on-demand detection trigger.
    pub detection: Arc<SharedDetection<ES, PC>>,
    /// Predictions of the latest tick.
    pub board: Arc<PredictionBoard>,
    pub automation_log: Arc<AutomationLog>,
    pub states: Arc<DeviceStateCache>,
    /// Source of the SSE stream.
    pub event_bus: Arc<InProcessEventBus>,
}

impl<ES, PC> Clone for AppState<ES, PC> {
    fn clone(&self) -> Self {
        Self {
            event_store: Arc::clone(&self.event_store),
            detection: Arc::clone(&self.detection),
            board: Arc::clone(&self.board),
            automation_log: Arc::clone(&self.automation_log),
            states: Arc::clone(&self.states),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<ES, PC> AppState<ES, PC>
where
    ES: EventStore + Send + Sync + 'static,
    PC: PatternCache + Send + Sync + 'static,
{
    /// Create a new application state from shared services.
    pub fn new(
        event_store: Arc<ES>,
        detection: Arc<SharedDetection<ES, PC>>,
        board: Arc<PredictionBoard>,
        automation_log: Arc<AutomationLog>,
        states: Arc<DeviceStateCache>,
        event_bus: Arc<InProcessEventBus>,
    ) -> Self {
        Self {
            event_store,
            detection,
            board,
            automation_log,
            states,
            event_bus,
        }
    }
}
