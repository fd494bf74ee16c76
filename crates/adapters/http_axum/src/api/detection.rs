//! On-demand detection trigger.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use lightsout_app::ports::{EventStore, PatternCache};
use lightsout_domain::error::LightsOutError;

use crate::error::ApiError;
use crate::state::AppState;

/// Body returned after a run.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectionBody {
    Completed {
        version: u64,
        events: usize,
        patterns: usize,
    },
    /// Another run was already in progress.
    Skipped,
}

/// Possible responses from the trigger endpoint.
pub enum TriggerResponse {
    Completed(Json<DetectionBody>),
    Skipped(Json<DetectionBody>),
}

impl IntoResponse for TriggerResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Completed(json) => json.into_response(),
            Self::Skipped(json) => (StatusCode::CONFLICT, json).into_response(),
        }
    }
}

/// `POST /api/detection` — run detection now.
pub async fn trigger<ES, PC>(
    State(state): State<AppState<ES, PC>>,
) -> Result<TriggerResponse, ApiError>
where
    ES: EventStore + Send + Sync + 'static,
    PC: PatternCache + Send + Sync + 'static,
{
    match state.detection.run().await {
        Ok(report) => Ok(TriggerResponse::Completed(Json(DetectionBody::Completed {
            version: report.version,
            events: report.events,
            patterns: report.patterns,
        }))),
        Err(LightsOutError::Conflict(_)) => Ok(TriggerResponse::Skipped(Json(DetectionBody::Skipped))),
        Err(err) => Err(err.into()),
    }
}
