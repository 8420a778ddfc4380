//! services/capture_api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `SnapshotStore` port from the `core` crate. It keeps one JSONB value per
//! key in PostgreSQL using `sqlx`.

use async_trait::async_trait;
use course_capture_core::ports::{PortError, PortResult, SnapshotStore};
use serde_json::Value;
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `SnapshotStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SnapshotRecord {
    value: Value,
}

//=========================================================================================
// `SnapshotStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SnapshotStore for DbAdapter {
    async fn put(&self, key: &str, value: Value) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO capture_snapshots (key, value, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> PortResult<Option<Value>> {
        let record = sqlx::query_as::<_, SnapshotRecord>(
            "SELECT value FROM capture_snapshots WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.map(|record| record.value))
    }
}
