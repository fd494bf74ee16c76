//! JSON handler for the recent event feed.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use lightsout_app::event_summary::{self, EventSummary};
use lightsout_app::ports::{EventStore, PatternCache};
use lightsout_domain::event::StateChangeEvent;

use super::LimitQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<StateChangeEvent>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/events?limit=` — most recent state changes, newest first.
pub async fn list<ES, PC>(
    State(state): State<AppState<ES, PC>>,
    Query(query): Query<LimitQuery>,
) -> Result<ListResponse, ApiError>
where
    ES: EventStore + Send + Sync + 'static,
    PC: PatternCache + Send + Sync + 'static,
{
    let events = state.event_store.get_recent(query.resolve()).await?;
    Ok(ListResponse::Ok(Json(events)))
}

const DEFAULT_SUMMARY_DAYS: u32 = 30;
const MAX_SUMMARY_DAYS: u32 = 365;

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<u32>,
}

impl SummaryQuery {
    #[must_use]
    pub fn resolve(&self) -> u32 {
        self.days
            .unwrap_or(DEFAULT_SUMMARY_DAYS)
            .clamp(1, MAX_SUMMARY_DAYS)
    }
}

/// Possible responses from the summary endpoint.
pub enum SummaryResponse {
    Ok(Json<EventSummary>),
}

impl IntoResponse for SummaryResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/events/summary?days=` — per-device transition counts and
/// activity by local hour.
pub async fn summary<ES, PC>(
    State(state): State<AppState<ES, PC>>,
    Query(query): Query<SummaryQuery>,
) -> Result<SummaryResponse, ApiError>
where
    ES: EventStore + Send + Sync + 'static,
    PC: PatternCache + Send + Sync + 'static,
{
    let summary = event_summary::summarize(
        state.event_store.as_ref(),
        state.detection.detector().calendar(),
        query.resolve(),
        lightsout_domain::time::now(),
    )
    .await?;
    Ok(SummaryResponse::Ok(Json(summary)))
}
