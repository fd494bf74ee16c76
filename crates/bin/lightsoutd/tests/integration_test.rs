//! End-to-end smoke tests for the full lightsoutd stack.
//!
//! Each test wires the complete engine (in-memory `SQLite`, virtual bridge,
//! real services, real axum router), drives the services with explicit
//! timestamps and checks the result over HTTP via
//! `tower::ServiceExt::oneshot` — no TCP port is bound.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Datelike, Duration, TimeZone, Utc, Weekday};
use http_body_util::BodyExt;
use tower::ServiceExt;

use lightsout_adapter_http_axum::router;
use lightsout_adapter_http_axum::state::AppState;
use lightsout_adapter_storage_sqlite_sqlx::{
    Config, Database, SqliteEventStore, SqlitePatternCache,
};
use lightsout_adapter_virtual::VirtualBridge;
use lightsout_app::automation_coordinator::{AutomationCoordinator, AutomationPolicy};
use lightsout_app::automation_log::AutomationLog;
use lightsout_app::detector::{DetectorConfig, PatternDetector};
use lightsout_app::event_bus::InProcessEventBus;
use lightsout_app::pattern_registry::PatternRegistry;
use lightsout_app::ports::EventStore;
use lightsout_app::predictor::{Predictor, PredictorConfig};
use lightsout_app::retry::SystemClock;
use lightsout_app::services::detection_service::DetectionService;
use lightsout_app::services::ingestion_service::IngestionService;
use lightsout_app::services::prediction_service::{PredictionBoard, PredictionService};
use lightsout_app::state_cache::DeviceStateCache;
use lightsout_domain::error::LightsOutError;
use lightsout_domain::event::StateChange;
use lightsout_domain::id::DeviceId;
use lightsout_domain::state::{AttributeValue, ON_ATTRIBUTE};
use lightsout_domain::time::{Calendar, Timestamp};

type Bridge = Arc<VirtualBridge>;
type Store = Arc<SqliteEventStore>;
type Bus = Arc<InProcessEventBus>;

struct Stack {
    db: Database,
    bridge: Bridge,
    store: Store,
    ingestion: IngestionService<Bridge, Store>,
    detection: Arc<DetectionService<Store, SqlitePatternCache, Bus>>,
    prediction: PredictionService<Store, Bridge, SystemClock, Bus>,
    state: AppState<SqliteEventStore, SqlitePatternCache>,
}

impl Stack {
    fn router(&self) -> axum::Router {
        router::build(self.state.clone())
    }
}

/// Wire the engine against an in-memory `SQLite` database.
async fn stack(policy: AutomationPolicy) -> Stack {
    let db = Config {
        database_url: "sqlite::memory:".to_string(),
    }
    .build()
    .await
    .expect("in-memory database should initialise");
    let pool = db.pool().clone();

    let store = Arc::new(SqliteEventStore::new(pool.clone()));
    let bridge = Arc::new(VirtualBridge::default());
    let bus = Arc::new(InProcessEventBus::new(64));
    let states = Arc::new(DeviceStateCache::new());
    let registry = Arc::new(PatternRegistry::new());
    let log = Arc::new(AutomationLog::new(policy.log_capacity));
    let board = Arc::new(PredictionBoard::new());

    let ingestion = IngestionService::new(
        Arc::clone(&bridge),
        Arc::clone(&store),
        Arc::clone(&states),
        90,
    );
    let detection = Arc::new(DetectionService::new(
        Arc::clone(&store),
        SqlitePatternCache::new(pool),
        Arc::clone(&bus),
        Arc::clone(&registry),
        PatternDetector::new(DetectorConfig::default(), Calendar::utc()),
    ));
    let coordinator = Arc::new(AutomationCoordinator::new(
        Arc::clone(&bridge),
        SystemClock,
        Arc::clone(&bus),
        policy,
        Arc::clone(&states),
        Arc::clone(&log),
    ));
    let prediction = PredictionService::new(
        Arc::clone(&store),
        registry,
        Arc::clone(&states),
        Predictor::new(PredictorConfig::default(), Calendar::utc()),
        coordinator,
        Arc::clone(&board),
    );
    let state = AppState::new(
        Arc::clone(&store),
        Arc::clone(&detection),
        board,
        log,
        states,
        bus,
    );

    Stack {
        db,
        bridge,
        store,
        ingestion,
        detection,
        prediction,
        state,
    }
}

fn live_policy() -> AutomationPolicy {
    AutomationPolicy {
        enabled: true,
        dry_run: false,
        ..AutomationPolicy::default()
    }
}

fn change(device: &str, on: bool, at: Timestamp) -> StateChange {
    StateChange {
        device_id: DeviceId::new(device),
        attribute: ON_ATTRIBUTE.to_string(),
        previous: AttributeValue::Bool(!on),
        value: AttributeValue::Bool(on),
        timestamp: at,
    }
}

/// Two working weeks of the hall light going on around 07:00 and off at 07:30.
async fn seed_hall_mornings(store: &SqliteEventStore) {
    let monday = Utc.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap();
    let mut changes = Vec::new();
    for day in 0..12_i64 {
        let morning = monday + Duration::days(day);
        if matches!(morning.weekday(), Weekday::Sat | Weekday::Sun) {
            continue;
        }
        let jitter = Duration::seconds((day * 37) % 120 - 60);
        changes.push(change("hall", true, morning + jitter));
        changes.push(change("hall", false, morning + Duration::minutes(30)));
    }
    store.append(changes).await.unwrap();
}

/// Tuesday of the third week, fifteen seconds before seven.
fn tuesday_morning() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 16, 6, 59, 45).unwrap()
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send_json(app, "GET", uri).await
}

async fn send_json(app: axum::Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let resp = stack(AutomationPolicy::default())
        .await
        .router()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_record_manual_switches_as_events() {
    let stack = stack(AutomationPolicy::default()).await;
    let t0 = tuesday_morning();

    let first = stack.ingestion.poll_at(t0).await.unwrap();
    assert_eq!(first.devices, 4);
    assert_eq!(first.changes, 0, "first sight of a device seeds silently");

    stack
        .bridge
        .set(&DeviceId::new("kitchen"), ON_ATTRIBUTE, true)
        .unwrap();
    let second = stack
        .ingestion
        .poll_at(t0 + Duration::seconds(10))
        .await
        .unwrap();
    assert_eq!(second.changes, 1);

    let (status, body) = get_json(stack.router(), "/api/events").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["device_id"], "kitchen");
    assert_eq!(body[0]["value"], true);
    assert_eq!(body[0]["previous"], false);
}

#[tokio::test]
async fn should_fail_poll_when_bridge_is_offline() {
    let stack = stack(AutomationPolicy::default()).await;
    stack.bridge.set_online(false);

    let result = stack.ingestion.poll_at(tuesday_morning()).await;

    assert!(matches!(result, Err(LightsOutError::Poll(_))));
    assert_eq!(stack.store.count().await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Detection → prediction → automation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_turn_on_hall_light_from_learned_morning_habit() {
    let stack = stack(live_policy()).await;
    seed_hall_mornings(&stack.store).await;
    let now = tuesday_morning();

    stack.ingestion.poll_at(now).await.unwrap();
    let report = stack.detection.run_at(now).await.unwrap();
    assert_eq!(report.events, 20);
    assert!(report.patterns >= 1);

    let tick = stack.prediction.tick_at(now).await.unwrap();
    assert_eq!(tick.predictions, 1);
    assert_eq!(tick.decisions.len(), 1);

    let hall = stack.bridge.snapshot();
    assert_eq!(
        hall.get(&DeviceId::new("hall"), ON_ATTRIBUTE),
        Some(&AttributeValue::Bool(true))
    );

    let (_, log) = get_json(stack.router(), "/api/automation/log").await;
    assert_eq!(log[0]["verdict"], "executed");
    assert_eq!(log[0]["prediction"]["action"]["device_id"], "hall");
    assert_eq!(log[0]["outcome"]["attempts"], 1);

    let (_, predictions) = get_json(stack.router(), "/api/predictions").await;
    assert_eq!(predictions[0]["urgency"]["type"], "now");

    stack.ingestion.poll_at(now + Duration::seconds(10)).await.unwrap();
    let (status, lights) = get_json(stack.router(), "/api/lights").await;
    assert_eq!(status, StatusCode::OK);
    let hall = lights["lights"]
        .as_array()
        .unwrap()
        .iter()
        .find(|light| light["id"] == "hall")
        .unwrap();
    assert_eq!(hall["attributes"]["on"], true);
    assert_eq!(hall["reachable"], true);
}

#[tokio::test]
async fn should_only_record_decisions_in_dry_run() {
    let stack = stack(AutomationPolicy {
        enabled: true,
        ..AutomationPolicy::default()
    })
    .await;
    seed_hall_mornings(&stack.store).await;
    let now = tuesday_morning();

    stack.ingestion.poll_at(now).await.unwrap();
    stack.detection.run_at(now).await.unwrap();
    stack.prediction.tick_at(now).await.unwrap();

    assert_eq!(
        stack
            .bridge
            .snapshot()
            .get(&DeviceId::new("hall"), ON_ATTRIBUTE),
        Some(&AttributeValue::Bool(false))
    );
    let (_, log) = get_json(stack.router(), "/api/automation/log").await;
    assert_eq!(log[0]["verdict"], "skipped_dry_run");
}

#[tokio::test]
async fn should_expose_patterns_and_status_after_detection() {
    let stack = stack(AutomationPolicy::default()).await;
    seed_hall_mornings(&stack.store).await;
    stack.detection.run_at(tuesday_morning()).await.unwrap();

    let (status, patterns) = get_json(stack.router(), "/api/patterns").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patterns["version"], 1);
    let first = &patterns["patterns"][0];
    assert_eq!(first["kind"], "time_based");
    assert_eq!(first["params"]["weekday_class"], "weekdays");

    let uri = format!("/api/patterns/{}", first["id"].as_str().unwrap());
    let (status, single) = get_json(stack.router(), &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(single["id"], first["id"]);

    let (_, status_body) = get_json(stack.router(), "/api/status").await;
    assert_eq!(status_body["events"], 20);
    assert_eq!(status_body["registry_version"], 1);

    let (status, summary) = get_json(stack.router(), "/api/events/summary?days=365").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["days"], 365);
}

#[tokio::test]
async fn should_restore_cached_patterns_into_fresh_registry() {
    let stack = stack(AutomationPolicy::default()).await;
    seed_hall_mornings(&stack.store).await;
    let report = stack.detection.run_at(tuesday_morning()).await.unwrap();

    // a second service over the same database plays the restarted daemon
    let restarted = DetectionService::new(
        Arc::clone(&stack.store),
        SqlitePatternCache::new(stack.db.pool().clone()),
        Arc::new(InProcessEventBus::new(4)),
        Arc::new(PatternRegistry::new()),
        PatternDetector::new(DetectorConfig::default(), Calendar::utc()),
    );
    let restored = restarted.restore_cached(tuesday_morning()).await.unwrap();

    assert_eq!(restored, report.patterns);
    assert_eq!(
        restarted.active_patterns().patterns()[0].id,
        stack.detection.active_patterns().patterns()[0].id
    );
}

#[tokio::test]
async fn should_trigger_detection_over_http() {
    let stack = stack(AutomationPolicy::default()).await;

    let (status, body) = send_json(stack.router(), "POST", "/api/detection").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["version"], 1);
}
