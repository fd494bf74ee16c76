//! JSON handler for the predictions of the latest tick.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use lightsout_app::ports::{EventStore, PatternCache};
use lightsout_domain::prediction::Prediction;

use crate::state::AppState;

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Prediction>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/predictions` — what the last prediction tick produced.
pub async fn list<ES, PC>(State(state): State<AppState<ES, PC>>) -> ListResponse
where
    ES: EventStore + Send + Sync + 'static,
    PC: PatternCache + Send + Sync + 'static,
{
    ListResponse::Ok(Json(state.board.latest().as_ref().clone()))
}
