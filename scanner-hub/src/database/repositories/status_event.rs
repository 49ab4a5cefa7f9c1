//! Connection status history repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::models::StatusEventDbModel;

/// Status history repository trait.
#[async_trait]
pub trait StatusEventRepository: Send + Sync {
    /// Append a status transition and return its row id.
    async fn append_status_event(&self, event: &StatusEventDbModel) -> Result<i64>;
    /// Status history of one device, newest first.
    async fn list_for_device(&self, device_id: &str, limit: i64) -> Result<Vec<StatusEventDbModel>>;
}

/// SQLx implementation of StatusEventRepository.
pub struct SqlxStatusEventRepository {
    pool: SqlitePool,
}

impl SqlxStatusEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusEventRepository for SqlxStatusEventRepository {
    async fn append_status_event(&self, event: &StatusEventDbModel) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO connection_status (
                device_id, status, host, port, error_message, reconnect_attempts, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.device_id)
        .bind(&event.status)
        .bind(&event.host)
        .bind(event.port)
        .bind(&event.error_message)
        .bind(event.reconnect_attempts)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_for_device(&self, device_id: &str, limit: i64) -> Result<Vec<StatusEventDbModel>> {
        let events = sqlx::query_as::<_, StatusEventDbModel>(
            "SELECT * FROM connection_status WHERE device_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(device_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}
