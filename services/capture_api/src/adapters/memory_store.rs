//! services/capture_api/src/adapters/memory_store.rs
//!
//! An in-process `SnapshotStore`, used when no database is configured and in tests.

use async_trait::async_trait;
use course_capture_core::ports::{PortResult, SnapshotStore};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemorySnapshotStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn put(&self, key: &str, value: Value) -> PortResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> PortResult<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }
}
