//! Scanner record repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::models::{ScannerRecordDbModel, ValidityCounts};

/// Scanner record repository trait.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Insert a record and return its row id.
    async fn append_record(&self, record: &ScannerRecordDbModel) -> Result<i64>;
    /// Most recent records of one device, newest first.
    async fn list_recent(&self, device_id: &str, limit: i64) -> Result<Vec<ScannerRecordDbModel>>;
    async fn count_by_validity(&self, device_id: &str) -> Result<ValidityCounts>;
}

/// SQLx implementation of RecordRepository.
pub struct SqlxRecordRepository {
    pool: SqlitePool,
}

impl SqlxRecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordRepository for SqlxRecordRepository {
    async fn append_record(&self, record: &ScannerRecordDbModel) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO scanner_records (
                device_id, raw_data, is_valid, error_message, record_type,
                status, product_code, serial_number, counter, received_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.device_id)
        .bind(&record.raw_data)
        .bind(record.is_valid)
        .bind(&record.error_message)
        .bind(&record.record_type)
        .bind(&record.status)
        .bind(&record.product_code)
        .bind(&record.serial_number)
        .bind(record.counter)
        .bind(record.received_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_recent(&self, device_id: &str, limit: i64) -> Result<Vec<ScannerRecordDbModel>> {
        let records = sqlx::query_as::<_, ScannerRecordDbModel>(
            "SELECT * FROM scanner_records WHERE device_id = ? ORDER BY received_at DESC, id DESC LIMIT ?",
        )
        .bind(device_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn count_by_validity(&self, device_id: &str) -> Result<ValidityCounts> {
        let (valid, invalid): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN is_valid THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_valid THEN 0 ELSE 1 END), 0)
            FROM scanner_records
            WHERE device_id = ?
            "#,
        )
        .bind(device_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ValidityCounts { valid, invalid })
    }
}
