//! services/capture_api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::{adapters::EventBus, config::Config};
use course_capture_core::{
    domain::CaptureSnapshot, ports::SnapshotStore, router::Route, session::SessionConfig,
    CaptureSession,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// The one capture session, shared by every handler. Calls into it are serialized by
/// the lock.
pub type SharedSession = Arc<Mutex<CaptureSession>>;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: SharedSession,
    pub events: EventBus,
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Cancelled once the session completes, which stops the timeout task.
    pub completion_token: CancellationToken,
}

impl AppState {
    pub fn new(config: Arc<Config>, snapshots: Arc<dyn SnapshotStore>) -> Self {
        let events = EventBus::new(config.event_bus_capacity);
        let session = CaptureSession::new(
            SessionConfig {
                completion_timeout: config.completion_timeout,
            },
            Arc::new(events.clone()),
        );
        Self {
            config,
            session: Arc::new(Mutex::new(session)),
            events,
            snapshots,
            completion_token: CancellationToken::new(),
        }
    }

    /// Seeds the session from a persisted snapshot before serving traffic.
    pub async fn seed(&self, snapshot: CaptureSnapshot) {
        self.session.lock().await.seed(snapshot);
    }

    /// Hands one intercepted response to the session.
    pub async fn ingest(&self, origin: &str, payload: &Value) -> Option<Route> {
        let mut session = self.session.lock().await;
        let route = session.ingest(origin, payload);
        if session.is_complete() {
            self.completion_token.cancel();
        }
        route
    }
}
