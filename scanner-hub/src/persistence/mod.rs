//! Write contract between supervisors and durable storage.
//!
//! Supervisors never wait on storage: writes go through a per-device
//! [`DeviceWriter`] queue and failures are reported, not retried.

pub mod writer;

pub use writer::{DeviceWriter, PersistenceStats, WriteJob};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::Result;
use crate::database::DbPool;
use crate::database::models::{ScannerRecordDbModel, StatusEventDbModel};
use crate::database::repositories::{
    RecordRepository, SqlxRecordRepository, SqlxStatusEventRepository, StatusEventRepository,
};
use crate::domain::{DecodedRecord, StatusTransitionEvent};

/// Durable destination for decoded records and status history.
#[async_trait]
pub trait PersistenceSink: Send + Sync + 'static {
    /// Whether records of this device can be stored.
    fn supports_device(&self, device_id: &str) -> bool {
        !device_id.trim().is_empty()
    }

    async fn append_record(
        &self,
        device_id: &str,
        record: &DecodedRecord,
        received_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn append_status_event(&self, event: &StatusTransitionEvent) -> Result<()>;
}

/// SQLite-backed sink built on the record and status repositories.
pub struct SqlitePersistenceSink {
    records: Arc<dyn RecordRepository>,
    status_events: Arc<dyn StatusEventRepository>,
}

impl SqlitePersistenceSink {
    pub fn new(pool: DbPool) -> Self {
        Self::with_repositories(
            Arc::new(SqlxRecordRepository::new(pool.clone())),
            Arc::new(SqlxStatusEventRepository::new(pool)),
        )
    }

    pub fn with_repositories(
        records: Arc<dyn RecordRepository>,
        status_events: Arc<dyn StatusEventRepository>,
    ) -> Self {
        Self {
            records,
            status_events,
        }
    }
}

#[async_trait]
impl PersistenceSink for SqlitePersistenceSink {
    async fn append_record(
        &self,
        device_id: &str,
        record: &DecodedRecord,
        received_at: DateTime<Utc>,
    ) -> Result<()> {
        let row = ScannerRecordDbModel::from_decoded(device_id, record, received_at);
        self.records.append_record(&row).await?;
        Ok(())
    }

    async fn append_status_event(&self, event: &StatusTransitionEvent) -> Result<()> {
        let row = StatusEventDbModel::from_event(event);
        self.status_events.append_status_event(&row).await?;
        Ok(())
    }
}
