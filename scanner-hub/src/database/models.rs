//! Row models for the scanner tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::time::{datetime_to_ms, ms_to_datetime};
use crate::domain::{ConnectionPhase, DecodedRecord, StatusTransitionEvent};
use crate::{Error, Result};

/// One decoded line as stored in `scanner_records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ScannerRecordDbModel {
    pub id: i64,
    pub device_id: String,
    /// The line as received
    pub raw_data: String,
    pub is_valid: bool,
    /// Rejection reason of an invalid record
    pub error_message: Option<String>,
    pub record_type: Option<String>,
    pub status: Option<String>,
    pub product_code: Option<String>,
    pub serial_number: Option<String>,
    pub counter: Option<i64>,
    /// Unix epoch milliseconds (UTC)
    pub received_at: i64,
}

impl ScannerRecordDbModel {
    /// Build an unsaved row from a decoded record.
    pub fn from_decoded(
        device_id: impl Into<String>,
        record: &DecodedRecord,
        received_at: DateTime<Utc>,
    ) -> Self {
        let fields = record.fields();
        Self {
            id: 0,
            device_id: device_id.into(),
            raw_data: record.raw_payload().to_string(),
            is_valid: record.is_valid(),
            error_message: record.error_reason().map(str::to_string),
            record_type: fields.map(|f| f.record_type.clone()),
            status: fields.map(|f| f.status.clone()),
            product_code: fields.map(|f| f.product_code.clone()),
            serial_number: fields.map(|f| f.serial_number.clone()),
            counter: fields.map(|f| f.counter),
            received_at: datetime_to_ms(received_at),
        }
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        ms_to_datetime(self.received_at)
    }
}

/// One status transition as stored in `connection_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StatusEventDbModel {
    pub id: i64,
    pub device_id: String,
    pub status: String,
    pub host: Option<String>,
    pub port: i64,
    pub error_message: Option<String>,
    pub reconnect_attempts: i64,
    /// Unix epoch milliseconds (UTC)
    pub created_at: i64,
}

impl StatusEventDbModel {
    pub fn from_event(event: &StatusTransitionEvent) -> Self {
        Self {
            id: 0,
            device_id: event.device_id.clone(),
            status: event.status.as_str().to_string(),
            host: event.host.clone(),
            port: i64::from(event.port),
            error_message: event.error_message.clone(),
            reconnect_attempts: i64::from(event.reconnect_attempts),
            created_at: datetime_to_ms(event.timestamp),
        }
    }

    /// Convert a stored row back into a domain event.
    pub fn into_event(self) -> Result<StatusTransitionEvent> {
        let status = ConnectionPhase::parse(&self.status).ok_or_else(|| {
            Error::validation(format!("unknown connection status '{}'", self.status))
        })?;
        let port = u16::try_from(self.port)
            .map_err(|_| Error::validation(format!("port out of range: {}", self.port)))?;

        Ok(StatusTransitionEvent {
            device_id: self.device_id,
            status,
            host: self.host,
            port,
            error_message: self.error_message,
            reconnect_attempts: u32::try_from(self.reconnect_attempts).unwrap_or(u32::MAX),
            timestamp: ms_to_datetime(self.created_at),
        })
    }
}

/// Count of stored records per validity for one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityCounts {
    pub valid: i64,
    pub invalid: i64,
}

impl ValidityCounts {
    pub fn total(&self) -> i64 {
        self.valid + self.invalid
    }
}
