//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod automation;
#[allow(clippy::missing_errors_doc)]
pub mod detection;
#[allow(clippy::missing_errors_doc)]
pub mod events;
pub mod lights;
#[allow(clippy::missing_errors_doc)]
pub mod patterns;
pub mod predictions;
pub mod sse;
#[allow(clippy::missing_errors_doc)]
pub mod status;

use axum::Router;
use axum::routing::{get, post};
use serde::Deserialize;

use lightsout_app::ports::{EventStore, PatternCache};

use crate::state::AppState;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

/// `?limit=` query shared by the feed endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    /// Requested limit, defaulted and capped.
    #[must_use]
    pub fn resolve(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }
}

/// Build the `/api` sub-router.
pub fn routes<ES, PC>() -> Router<AppState<ES, PC>>
where
    ES: EventStore + Send + Sync + 'static,
    PC: PatternCache + Send + Sync + 'static,
{
    Router::new()
        // Patterns
        .route("/patterns", get(patterns::list::<ES, PC>))
        .route("/patterns/{id}", get(patterns::get::<ES, PC>))
        // Predictions and decisions
        .route("/predictions", get(predictions::list::<ES, PC>))
        .route("/automation/log", get(automation::log::<ES, PC>))
        // Detection trigger
        .route("/detection", post(detection::trigger::<ES, PC>))
        // Events and status
        .route("/events", get(events::list::<ES, PC>))
        .route("/events/summary", get(events::summary::<ES, PC>))
        .route("/lights", get(lights::list::<ES, PC>))
        .route("/status", get(status::get::<ES, PC>))
        .route("/stream", get(sse::stream::<ES, PC>))
}
