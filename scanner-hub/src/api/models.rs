//! API request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::ScannerRecordDbModel;
use crate::database::ValidityCounts;
use crate::domain::StatusTransitionEvent;

/// Default number of rows returned by history queries.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Largest accepted `limit`.
pub const MAX_HISTORY_LIMIT: i64 = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    pub scanners: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

impl LimitParams {
    /// Requested limit clamped to `1..=MAX_HISTORY_LIMIT`.
    pub fn effective(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconnectResponse {
    pub success: bool,
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusHistoryResponse {
    pub device_id: String,
    pub events: Vec<StatusTransitionEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordResponse {
    pub id: i64,
    pub raw_data: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter: Option<i64>,
    pub received_at: DateTime<Utc>,
}

impl From<ScannerRecordDbModel> for RecordResponse {
    fn from(row: ScannerRecordDbModel) -> Self {
        let received_at = row.received_at();
        Self {
            id: row.id,
            raw_data: row.raw_data,
            is_valid: row.is_valid,
            error_message: row.error_message,
            record_type: row.record_type,
            status: row.status,
            product_code: row.product_code,
            serial_number: row.serial_number,
            counter: row.counter,
            received_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordsResponse {
    pub device_id: String,
    pub counts: ValidityCounts,
    pub records: Vec<RecordResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFilterBody {
    pub filter: String,
}
