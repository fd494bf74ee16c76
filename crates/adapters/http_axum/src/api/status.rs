//! Engine status summary.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use lightsout_app::ports::{EventStore, PatternCache};
use lightsout_domain::id::DeviceId;
use lightsout_domain::time::Timestamp;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub events: u64,
    pub patterns: usize,
    pub registry_version: u64,
    pub generated_at: Option<Timestamp>,
    pub predictions: usize,
    pub decisions_logged: usize,
    pub devices: usize,
    pub unreachable: Vec<DeviceId>,
}

/// Possible responses from the status endpoint.
pub enum GetResponse {
    Ok(Json<StatusBody>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/status`
pub async fn get<ES, PC>(State(state): State<AppState<ES, PC>>) -> Result<GetResponse, ApiError>
where
    ES: EventStore + Send + Sync + 'static,
    PC: PatternCache + Send + Sync + 'static,
{
    let events = state.event_store.count().await?;
    let set = state.detection.active_patterns();
    Ok(GetResponse::Ok(Json(StatusBody {
        events,
        patterns: set.len(),
        registry_version: set.version,
        generated_at: set.generated_at,
        predictions: state.board.latest().len(),
        decisions_logged: state.automation_log.len(),
        devices: state.states.snapshot().len(),
        unreachable: state.states.unreachable(),
    })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use lightsout_app::ports::EventStore;
    use lightsout_domain::id::DeviceId;
    use lightsout_domain::state::StateSnapshot;

    use crate::router::build;
    use crate::test_support::{base_time, change, hall_pattern, json_body, send, test_state};

    #[tokio::test]
    async fn should_summarize_engine_state() {
        let ctx = test_state();
        ctx.registry.replace(vec![hall_pattern()], base_time());
        ctx.state
            .event_store
            .append(vec![change("hall", true, base_time())])
            .await
            .unwrap();
        ctx.state.states.commit(
            &StateSnapshot::new()
                .with("hall", "on", true)
                .with("kitchen", "on", false),
        );
        ctx.state.states.mark_unreachable(DeviceId::new("kitchen"));

        let (status, body) = json_body(send(build(ctx.state), "GET", "/api/status").await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["events"], 1);
        assert_eq!(body["patterns"], 1);
        assert_eq!(body["registry_version"], 1);
        assert_eq!(body["devices"], 2);
        assert_eq!(body["unreachable"], serde_json::json!(["kitchen"]));
    }
}
