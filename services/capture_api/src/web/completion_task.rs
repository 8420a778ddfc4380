//! services/capture_api/src/web/completion_task.rs
//!
//! The background worker that enforces the completion timeout.

use crate::web::state::AppState;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Waits for the configured timeout, then flushes partial results unless the session
/// completed first (in which case the completion token is already cancelled).
pub fn spawn_completion_timer(app_state: Arc<AppState>) -> JoinHandle<()> {
    let timeout = app_state.config.completion_timeout;
    let token = app_state.completion_token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {
                info!("Capture completed before the timeout; timer stopped");
            }
            _ = tokio::time::sleep(timeout) => {
                let flushed = app_state.session.lock().await.on_timeout();
                token.cancel();
                info!(flushed, ?timeout, "Completion timeout elapsed");
            }
        }
    })
}
