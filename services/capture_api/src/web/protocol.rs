//! services/capture_api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between a capturing client (such as a
//! browser extension forwarding intercepted responses) and the API server.

use course_capture_core::{domain::CaptureSnapshot, CaptureEvent, Route};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// One intercepted response: the URL it came from and its parsed JSON body.
    Ingest { origin: String, payload: Value },

    /// Asks for the full current store, e.g. after reconnecting.
    RequestSnapshot,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once, right after the upgrade.
    Connected { session_id: Uuid },

    /// Acknowledges an `ingest`; `route` is null when the payload was dropped.
    Ingested { route: Option<Route> },

    /// A capture event from the session, forwarded as it happens.
    Event { event: CaptureEvent },

    Snapshot { snapshot: CaptureSnapshot },

    /// Reports a malformed message. The connection stays open.
    Error { message: String },
}
