//! Current state of every polled device.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use lightsout_app::ports::{EventStore, PatternCache};
use lightsout_domain::id::DeviceId;
use lightsout_domain::state::AttributeValue;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LightBody {
    pub id: DeviceId,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub reachable: bool,
}

#[derive(Debug, Serialize)]
pub struct LightsBody {
    pub count: usize,
    pub lights: Vec<LightBody>,
}

/// Possible responses from the lights endpoint.
pub enum ListResponse {
    Ok(Json<LightsBody>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/lights` — last polled state, devices in id order.
pub async fn list<ES, PC>(State(state): State<AppState<ES, PC>>) -> ListResponse
where
    ES: EventStore + Send + Sync + 'static,
    PC: PatternCache + Send + Sync + 'static,
{
    let snapshot = state.states.snapshot();
    let lights: Vec<LightBody> = snapshot
        .iter()
        .map(|(id, attributes)| LightBody {
            id: id.clone(),
            attributes: attributes.clone(),
            reachable: !state.states.is_unreachable(id),
        })
        .collect();
    ListResponse::Ok(Json(LightsBody {
        count: lights.len(),
        lights,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use lightsout_domain::id::DeviceId;
    use lightsout_domain::state::StateSnapshot;

    use crate::router::build;
    use crate::test_support::{json_body, send, test_state};

    #[tokio::test]
    async fn should_list_current_device_states() {
        let ctx = test_state();
        ctx.state.states.commit(
            &StateSnapshot::new()
                .with("hall", "on", true)
                .with("hall", "brightness", 180_i64)
                .with("kitchen", "on", false),
        );
        ctx.state.states.mark_unreachable(DeviceId::new("kitchen"));

        let (status, body) = json_body(send(build(ctx.state), "GET", "/api/lights").await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        let lights = body["lights"].as_array().unwrap();
        assert_eq!(lights[0]["id"], "hall");
        assert_eq!(lights[0]["attributes"]["on"], true);
        assert_eq!(lights[0]["attributes"]["brightness"], 180);
        assert_eq!(lights[0]["reachable"], true);
        assert_eq!(lights[1]["id"], "kitchen");
        assert_eq!(lights[1]["reachable"], false);
    }

    #[tokio::test]
    async fn should_list_nothing_before_first_poll() {
        let ctx = test_state();
        let (status, body) = json_body(send(build(ctx.state), "GET", "/api/lights").await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
    }
}
