//! Stub ports and a ready-made [`AppState`] for handler tests.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use chrono::{TimeZone, Utc};
use tower::ServiceExt;

use lightsout_app::automation_log::AutomationLog;
use lightsout_app::detector::{DetectorConfig, PatternDetector};
use lightsout_app::event_bus::InProcessEventBus;
use lightsout_app::pattern_registry::PatternRegistry;
use lightsout_app::ports::{EventStore, PatternCache};
use lightsout_app::services::detection_service::DetectionService;
use lightsout_app::services::prediction_service::PredictionBoard;
use lightsout_app::state_cache::DeviceStateCache;
use lightsout_domain::error::LightsOutError;
use lightsout_domain::event::{StateChange, StateChangeEvent};
use lightsout_domain::id::DeviceId;
use lightsout_domain::pattern::{Pattern, PatternParams, TimeBasedParams, WeekdayClass};
use lightsout_domain::state::{AttributeValue, Transition};
use lightsout_domain::time::{Calendar, TimeWindow, Timestamp};

use crate::state::AppState;

#[derive(Default)]
pub struct StubEventStore {
    pub events: Mutex<Vec<StateChangeEvent>>,
}

impl EventStore for StubEventStore {
    async fn append(&self, changes: Vec<StateChange>) -> Result<Vec<StateChangeEvent>, LightsOutError> {
        let mut events = self.events.lock().unwrap();
        let stored: Vec<_> = changes
            .into_iter()
            .map(|change| change.into_event(events.len() as u64 + 1))
            .collect();
        events.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn query(&self, window: TimeWindow) -> Result<Vec<StateChangeEvent>, LightsOutError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| window.contains(e.timestamp))
            .cloned()
            .collect())
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<StateChangeEvent>, LightsOutError> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn purge_before(&self, _cutoff: Timestamp) -> Result<u64, LightsOutError> {
        Ok(0)
    }

    async fn count(&self) -> Result<u64, LightsOutError> {
        Ok(self.events.lock().unwrap().len() as u64)
    }
}

#[derive(Default)]
pub struct StubPatternCache;

impl PatternCache for StubPatternCache {
    async fn load(&self) -> Result<Vec<Pattern>, LightsOutError> {
        Ok(vec![])
    }

    async fn save(&self, _patterns: Vec<Pattern>) -> Result<(), LightsOutError> {
        Ok(())
    }
}

pub struct TestContext {
    pub state: AppState<StubEventStore, StubPatternCache>,
    pub registry: Arc<PatternRegistry>,
}

pub fn base_time() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 9, 6, 59, 45).unwrap()
}

pub fn test_state() -> TestContext {
    let store = Arc::new(StubEventStore::default());
    let bus = Arc::new(InProcessEventBus::new(16));
    let registry = Arc::new(PatternRegistry::new());
    let detection = DetectionService::new(
        Arc::clone(&store),
        StubPatternCache,
        Arc::clone(&bus),
        Arc::clone(&registry),
        PatternDetector::new(DetectorConfig::default(), Calendar::utc()),
    );
    let state = AppState::new(
        store,
        Arc::new(detection),
        Arc::new(PredictionBoard::new()),
        Arc::new(AutomationLog::new(10)),
        Arc::new(DeviceStateCache::new()),
        bus,
    );
    TestContext { state, registry }
}

/// A weekday-morning hall pattern.
pub fn hall_pattern() -> Pattern {
    let ts = base_time();
    Pattern::new(
        PatternParams::TimeBased(TimeBasedParams {
            device_id: DeviceId::new("hall"),
            transition: Transition::turned_on(),
            weekday_class: WeekdayClass::Weekdays,
            mean_minute: 419.5,
            dispersion_minutes: 1.1,
        }),
        0.73,
        4,
        ts,
        ts,
    )
    .unwrap()
}

pub fn change(device: &str, on: bool, at: Timestamp) -> StateChange {
    StateChange {
        device_id: DeviceId::new(device),
        attribute: "on".to_string(),
        previous: AttributeValue::Bool(!on),
        value: AttributeValue::Bool(on),
        timestamp: at,
    }
}

pub async fn send(app: axum::Router, method: &str, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn json_body(response: Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
