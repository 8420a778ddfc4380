//! services/capture_api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! Inbound `ingest` messages are handed to the shared session; every capture event
//! on the bus is pushed back out to the client by a forwarding task.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, Mutex};
use tracing::{debug, error, info, warn};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    // The sender is wrapped in an Arc<Mutex<>> so the forwarding task and the
    // receive loop can both write to it.
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // Subscribe before acknowledging so no event published after `Connected` is missed.
    let mut events = app_state.events.subscribe();
    let session_id = app_state.session.lock().await.id();
    info!(%session_id, "New WebSocket connection established");

    if !send_message(&ws_sender, &ServerMessage::Connected { session_id }).await {
        error!("Failed to send connected message.");
        return;
    }

    // --- 1. Event Forwarding ---
    let forward_task = {
        let ws_sender = ws_sender.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if !send_message(&ws_sender, &ServerMessage::Event { event }).await {
                            debug!("Client gone; stopping event forwarding");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "WebSocket client lagged; events skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    };

    // --- 2. Main Message Loop ---
    loop {
        if let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text_message(text.as_str(), &app_state, &ws_sender).await;
                }
                Message::Close(_) => {
                    info!("Client sent close message.");
                    break;
                }
                _ => {}
            }
        } else {
            info!("Client disconnected.");
            break;
        }
    }

    // --- 3. Cleanup ---
    forward_task.abort();
    info!("WebSocket connection closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(text: &str, app_state: &Arc<AppState>, ws_sender: &WsSender) {
    let reply = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ingest { origin, payload }) => {
            let route = app_state.ingest(&origin, &payload).await;
            ServerMessage::Ingested { route }
        }
        Ok(ClientMessage::RequestSnapshot) => {
            let snapshot = app_state.session.lock().await.snapshot();
            ServerMessage::Snapshot { snapshot }
        }
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            ServerMessage::Error {
                message: format!("Invalid message: {}", e),
            }
        }
    };
    if !send_message(ws_sender, &reply).await {
        error!("Failed to send reply to client.");
    }
}

/// Serializes and sends one message. Returns false when the socket is gone.
async fn send_message(ws_sender: &WsSender, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {:?}", e);
            return true;
        }
    };
    ws_sender
        .lock()
        .await
        .send(Message::Text(json.into()))
        .await
        .is_ok()
}
