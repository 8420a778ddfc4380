//! crates/course_capture_core/src/ports.rs
//!
//! Defines the service contracts (traits) at the edge of the capture engine.
//! The engine pushes events out through an `EventSink` and never touches storage
//! itself; a collaborator persists snapshots through a `SnapshotStore`.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::CaptureEvent;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, channels).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Receives per-kind updates and the one-shot completion report.
///
/// Publishing is synchronous: the engine never awaits, and a sink that needs to do
/// I/O should hand the event off (e.g. to a channel) and return.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: CaptureEvent);
}

/// A key-value store for persisted capture snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Writes `value` under `key`, replacing whatever was there.
    async fn put(&self, key: &str, value: Value) -> PortResult<()>;

    /// Reads the value under `key`, if any.
    async fn get(&self, key: &str) -> PortResult<Option<Value>>;
}
