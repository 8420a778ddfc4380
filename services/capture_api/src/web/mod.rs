pub mod completion_task;
pub mod protocol;
pub mod rest;
pub mod sse;
pub mod state;
pub mod ws_handler;

// Re-export the handlers so the router can be assembled in one place.
pub use completion_task::spawn_completion_timer;
pub use rest::{entities_handler, ingest_handler, snapshot_handler, status_handler};
pub use sse::events_handler;
pub use ws_handler::ws_handler;
