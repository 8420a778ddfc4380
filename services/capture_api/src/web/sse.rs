//! services/capture_api/src/web/sse.rs
//!
//! Server-Sent Events feed of capture events, for clients that only need to listen.

use crate::web::state::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use course_capture_core::CaptureEvent;
use futures::stream::Stream;
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Stream capture events as they happen.
///
/// Each SSE event is named `updated` or `completed` and carries the event as JSON.
#[utoipa::path(
    get,
    path = "/capture/events",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream")
    )
)]
pub async fn events_handler(
    State(app_state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.events.subscribe();
    info!("New SSE client connected to capture events");

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => match to_sse_event(&event) {
                    Some(sse) => yield Ok(sse),
                    None => continue,
                },
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "SSE client lagged; events skipped");
                }
                Err(RecvError::Closed) => {
                    debug!("Event bus closed; ending SSE stream");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

fn to_sse_event(event: &CaptureEvent) -> Option<Event> {
    let name = match event {
        CaptureEvent::Updated(_) => "updated",
        CaptureEvent::Completed(_) => "completed",
    };
    match Event::default().event(name).json_data(event) {
        Ok(sse) => Some(sse),
        Err(e) => {
            warn!("Failed to encode capture event for SSE: {:?}", e);
            None
        }
    }
}
