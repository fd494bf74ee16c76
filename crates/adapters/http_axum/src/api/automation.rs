//! JSON handler for the automation decision log.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};

use lightsout_app::ports::{EventStore, PatternCache};
use lightsout_domain::decision::AutomationDecision;

use super::LimitQuery;
use crate::state::AppState;

/// Possible responses from the log endpoint.
pub enum LogResponse {
    Ok(Json<Vec<AutomationDecision>>),
}

impl IntoResponse for LogResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/automation/log?limit=` — recent decisions, newest first.
pub async fn log<ES, PC>(
    State(state): State<AppState<ES, PC>>,
    Query(query): Query<LimitQuery>,
) -> LogResponse
where
    ES: EventStore + Send + Sync + 'static,
    PC: PatternCache + Send + Sync + 'static,
{
    LogResponse::Ok(Json(state.automation_log.recent(query.resolve())))
}
