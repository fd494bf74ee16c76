//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use lightsout_domain::error::LightsOutError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`LightsOutError`] (or a malformed request) to an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    Domain(LightsOutError),
    /// The request itself could not be understood (bad id, bad query).
    BadRequest(String),
}

impl From<LightsOutError> for ApiError {
    fn from(err: LightsOutError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Domain(LightsOutError::Validation(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Domain(LightsOutError::NotFound(err)) => (StatusCode::NOT_FOUND, err.to_string()),
            Self::Domain(LightsOutError::Conflict(err)) => (StatusCode::CONFLICT, err.to_string()),
            Self::Domain(LightsOutError::Input(err)) => {
                tracing::warn!(error = %err, "detector rejected the event window");
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            Self::Domain(LightsOutError::Sink(err)) => (StatusCode::BAD_GATEWAY, err.to_string()),
            Self::Domain(err @ (LightsOutError::Storage(_) | LightsOutError::Poll(_))) => {
                tracing::error!(error = ?err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
