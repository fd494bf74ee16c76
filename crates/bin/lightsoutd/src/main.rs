//! # lightsoutd — lightsout daemon
//!
//! Composition root that wires all adapters together and starts the engine.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars) and set up logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the bridge, storage adapters and application services
//! - Restore the cached pattern set before the first detection run
//! - Spawn the periodic loops: poll, purge, detection, prediction
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT): stop accepting commands,
//!   stop the loops, drain the server
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::task::JoinHandle;

use lightsout_adapter_http_axum::router;
use lightsout_adapter_http_axum::state::AppState;
use lightsout_adapter_storage_sqlite_sqlx::{
    Config as StorageConfig, SqliteEventStore, SqlitePatternCache,
};
use lightsout_adapter_virtual::VirtualBridge;
use lightsout_app::automation_coordinator::AutomationCoordinator;
use lightsout_app::automation_log::AutomationLog;
use lightsout_app::detector::PatternDetector;
use lightsout_app::event_bus::InProcessEventBus;
use lightsout_app::pattern_registry::PatternRegistry;
use lightsout_app::predictor::Predictor;
use lightsout_app::retry::SystemClock;
use lightsout_app::scheduler::{Shutdown, spawn_periodic};
use lightsout_app::services::detection_service::DetectionService;
use lightsout_app::services::ingestion_service::IngestionService;
use lightsout_app::services::prediction_service::{PredictionBoard, PredictionService};
use lightsout_app::state_cache::DeviceStateCache;
use lightsout_domain::error::LightsOutError;

use crate::config::Config;

const EVENT_BUS_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.logging.filter)?;
    tracing::info!(
        enabled = config.automation.enabled,
        dry_run = config.automation.dry_run,
        "lightsoutd starting"
    );

    // Database
    let db = StorageConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    // Adapters
    let event_store = Arc::new(SqliteEventStore::new(pool.clone()));
    let pattern_cache = SqlitePatternCache::new(pool);
    let bridge = Arc::new(VirtualBridge::from_config(&config.virtual_bridge));
    let event_bus = Arc::new(InProcessEventBus::new(EVENT_BUS_CAPACITY));

    // Shared state
    let calendar = config.calendar();
    let states = Arc::new(DeviceStateCache::new());
    let registry = Arc::new(PatternRegistry::new());
    let automation_log = Arc::new(AutomationLog::new(config.automation.log_capacity));
    let board = Arc::new(PredictionBoard::new());

    // Services
    let ingestion = Arc::new(IngestionService::new(
        Arc::clone(&bridge),
        Arc::clone(&event_store),
        Arc::clone(&states),
        config.ingestion.retention_days,
    ));
    let detection = Arc::new(DetectionService::new(
        Arc::clone(&event_store),
        pattern_cache,
        Arc::clone(&event_bus),
        Arc::clone(&registry),
        PatternDetector::new(config.detection.detector.clone(), calendar),
    ));
    let coordinator = Arc::new(AutomationCoordinator::new(
        Arc::clone(&bridge),
        SystemClock,
        Arc::clone(&event_bus),
        config.automation.clone(),
        Arc::clone(&states),
        Arc::clone(&automation_log),
    ));
    let prediction = Arc::new(PredictionService::new(
        Arc::clone(&event_store),
        Arc::clone(&registry),
        Arc::clone(&states),
        Predictor::new(config.prediction.predictor.clone(), calendar),
        Arc::clone(&coordinator),
        Arc::clone(&board),
    ));

    match detection.restore_cached(lightsout_domain::time::now()).await {
        Ok(0) => tracing::info!("no cached patterns, waiting for the first detection run"),
        Ok(restored) => tracing::debug!(restored, "registry primed from cache"),
        Err(err) => tracing::warn!(error = ?err, "failed to restore pattern cache"),
    }

    // Background loops
    let shutdown = Shutdown::new();
    let jobs: Vec<JoinHandle<()>> = vec![
        spawn_periodic(
            "poll",
            Duration::from_secs(config.ingestion.poll_interval_secs),
            shutdown.subscribe(),
            {
                let ingestion = Arc::clone(&ingestion);
                move || {
                    let ingestion = Arc::clone(&ingestion);
                    async move {
                        if let Err(err) = ingestion.poll().await {
                            tracing::warn!(error = ?err, "poll failed");
                        }
                    }
                }
            },
        ),
        spawn_periodic(
            "purge",
            Duration::from_secs(config.ingestion.purge_interval_secs),
            shutdown.subscribe(),
            {
                let ingestion = Arc::clone(&ingestion);
                move || {
                    let ingestion = Arc::clone(&ingestion);
                    async move {
                        if let Err(err) = ingestion.purge_expired().await {
                            tracing::warn!(error = ?err, "retention purge failed");
                        }
                    }
                }
            },
        ),
        spawn_periodic(
            "detection",
            config.detection.interval(),
            shutdown.subscribe(),
            {
                let detection = Arc::clone(&detection);
                move || {
                    let detection = Arc::clone(&detection);
                    async move {
                        match detection.run().await {
                            Ok(_) | Err(LightsOutError::Conflict(_)) => {}
                            Err(err) => tracing::warn!(error = ?err, "detection run failed"),
                        }
                    }
                }
            },
        ),
        spawn_periodic(
            "prediction",
            config.prediction.interval(),
            shutdown.subscribe(),
            {
                let prediction = Arc::clone(&prediction);
                move || {
                    let prediction = Arc::clone(&prediction);
                    async move {
                        if let Err(err) = prediction.tick().await {
                            tracing::warn!(error = ?err, "prediction tick failed");
                        }
                    }
                }
            },
        ),
    ];

    // HTTP
    let state = AppState::new(
        Arc::clone(&event_store),
        Arc::clone(&detection),
        board,
        automation_log,
        states,
        event_bus,
    );
    let app = router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "lightsoutd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("lightsoutd shutting down");
    coordinator.begin_shutdown();
    shutdown.trigger();
    for job in jobs {
        if let Err(err) = job.await {
            tracing::warn!(error = %err, "background job ended abnormally");
        }
    }
    tracing::info!("lightsoutd stopped");

    Ok(())
}

fn init_tracing(filter: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_new(filter)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .init();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
