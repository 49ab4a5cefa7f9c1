//! Record decoding.
//!
//! A line is either fully valid or fully rejected; a rejected record keeps
//! its raw payload and the rejection reason but never carries fields.

use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};

/// Field delimiter of the scanner line format.
pub const FIELD_DELIMITER: char = ',';

/// Number of fields in a scanner record.
pub const FIELD_COUNT: usize = 5;

/// The parsed fields of a valid scanner record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    /// Record type as sent by the scanner
    #[serde(rename = "type")]
    pub record_type: String,
    /// Scan status
    pub status: String,
    /// Product code
    pub product_code: String,
    /// Serial number
    pub serial_number: String,
    /// Scanner counter
    pub counter: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Valid(RecordFields),
    Invalid(String),
}

/// Outcome of decoding one inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    raw_payload: String,
    outcome: Outcome,
}

impl DecodedRecord {
    fn valid(raw_payload: impl Into<String>, fields: RecordFields) -> Self {
        Self {
            raw_payload: raw_payload.into(),
            outcome: Outcome::Valid(fields),
        }
    }

    fn invalid(raw_payload: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            raw_payload: raw_payload.into(),
            outcome: Outcome::Invalid(reason.into()),
        }
    }

    /// The line as received, after trimming.
    pub fn raw_payload(&self) -> &str {
        &self.raw_payload
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.outcome, Outcome::Valid(_))
    }

    /// Parsed fields; `Some` exactly when the record is valid.
    pub fn fields(&self) -> Option<&RecordFields> {
        match &self.outcome {
            Outcome::Valid(fields) => Some(fields),
            Outcome::Invalid(_) => None,
        }
    }

    /// Rejection reason; `Some` exactly when the record is invalid.
    pub fn error_reason(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Valid(_) => None,
            Outcome::Invalid(reason) => Some(reason),
        }
    }

    /// Consume the record, returning the payload and the parsed fields or reason.
    pub fn into_parts(self) -> (String, std::result::Result<RecordFields, String>) {
        let outcome = match self.outcome {
            Outcome::Valid(fields) => Ok(fields),
            Outcome::Invalid(reason) => Err(reason),
        };
        (self.raw_payload, outcome)
    }
}

/// Parse the five fields of a trimmed line.
pub fn parse_fields(line: &str) -> Result<RecordFields> {
    let parts: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    let [record_type, status, product_code, serial_number, counter] = parts.as_slice() else {
        return Err(FrameError::FieldCount { found: parts.len() });
    };

    let counter = counter
        .trim()
        .parse::<i64>()
        .map_err(|_| FrameError::InvalidCounter {
            value: counter.to_string(),
        })?;

    Ok(RecordFields {
        record_type: record_type.to_string(),
        status: status.to_string(),
        product_code: product_code.to_string(),
        serial_number: serial_number.to_string(),
        counter,
    })
}

/// Decode one inbound line into a record.
///
/// Never fails: malformed input yields an invalid record carrying the reason.
pub fn decode_line(line: &str) -> DecodedRecord {
    let line = line.trim();
    match parse_fields(line) {
        Ok(fields) => DecodedRecord::valid(line, fields),
        Err(e) => DecodedRecord::invalid(line, e.to_string()),
    }
}
