//! JSON handlers for the active pattern set.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use lightsout_app::ports::{EventStore, PatternCache};
use lightsout_domain::id::PatternId;
use lightsout_domain::pattern::{Pattern, PatternKind};
use lightsout_domain::time::Timestamp;

use crate::error::ApiError;
use crate::state::AppState;

/// A pattern plus its human-readable description.
#[derive(Debug, Serialize)]
pub struct PatternView {
    pub kind: PatternKind,
    pub description: String,
    #[serde(flatten)]
    pub pattern: Pattern,
}

impl From<&Pattern> for PatternView {
    fn from(pattern: &Pattern) -> Self {
        Self {
            kind: pattern.kind(),
            description: pattern.to_string(),
            pattern: pattern.clone(),
        }
    }
}

/// The whole registry snapshot.
#[derive(Debug, Serialize)]
pub struct PatternListBody {
    pub version: u64,
    pub generated_at: Option<Timestamp>,
    pub patterns: Vec<PatternView>,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<PatternListBody>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<PatternView>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/patterns` — active patterns, highest confidence first.
pub async fn list<ES, PC>(State(state): State<AppState<ES, PC>>) -> ListResponse
where
    ES: EventStore + Send + Sync + 'static,
    PC: PatternCache + Send + Sync + 'static,
{
    let set = state.detection.active_patterns();
    ListResponse::Ok(Json(PatternListBody {
        version: set.version,
        generated_at: set.generated_at,
        patterns: set.patterns().iter().map(PatternView::from).collect(),
    }))
}

/// `GET /api/patterns/{id}` — one active pattern.
pub async fn get<ES, PC>(
    State(state): State<AppState<ES, PC>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    ES: EventStore + Send + Sync + 'static,
    PC: PatternCache + Send + Sync + 'static,
{
    let id = PatternId::from_str(&id)
        .map_err(|err| ApiError::BadRequest(format!("invalid pattern id: {err}")))?;
    let pattern = state.detection.pattern(id)?;
    Ok(GetResponse::Ok(Json(PatternView::from(&pattern))))
}
