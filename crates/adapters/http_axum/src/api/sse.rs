//! Server-Sent Events (SSE) stream of core notifications.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use lightsout_app::ports::{EventStore, Notification, PatternCache};

use crate::state::AppState;

/// SSE event name for a notification.
fn event_name(notification: &Notification) -> &'static str {
    match notification {
        Notification::DetectionCompleted { .. } => "detection_completed",
        Notification::DecisionRecorded { .. } => "decision_recorded",
    }
}

/// `GET /api/stream` — SSE stream of detection and automation notifications.
///
/// Each notification is sent as a JSON `data:` frame whose SSE event name
/// matches its `type` tag. Lagging subscribers lose the oldest frames.
pub async fn stream<ES, PC>(
    State(state): State<AppState<ES, PC>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    ES: EventStore + Send + Sync + 'static,
    PC: PatternCache + Send + Sync + 'static,
{
    let rx = state.event_bus.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(notification) => match serde_json::to_string(&notification) {
            Ok(json) => Some(Ok(Event::default()
                .event(event_name(&notification))
                .data(json))),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize notification for SSE stream");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(skipped = n, "SSE subscriber lagged, some notifications were dropped");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
