//! Scan-frame: decoding of industrial scanner telemetry.
//!
//! Scanners stream newline-delimited ASCII records made of five
//! comma-separated fields:
//!
//! ```text
//! type,status,productCode,serialNumber,counter
//! ```
//!
//! ## Core Types
//!
//! - [`decode_line`] - Decode one line into a [`DecodedRecord`]
//! - [`DecodedRecord`] - A valid or rejected record, never partially populated
//! - [`RecordFields`] - The five parsed fields of a valid record
//! - [`LineFramer`] - `tokio_util` decoder splitting a byte stream into lines
//!
//! ## Example
//!
//! ```rust
//! use scan_frame::decode_line;
//!
//! let record = decode_line("A,OK,PC1,SN1,42");
//! assert!(record.is_valid());
//! assert_eq!(record.fields().map(|f| f.counter), Some(42));
//!
//! let rejected = decode_line("A,OK,PC1,SN1");
//! assert_eq!(rejected.error_reason(), Some("incorrect number of fields"));
//! ```

pub mod error;
pub mod framer;
pub mod record;

pub use error::{FrameError, Result};
pub use framer::{DEFAULT_MAX_LINE_LENGTH, LineFramer};
pub use record::{DecodedRecord, FIELD_COUNT, FIELD_DELIMITER, RecordFields, decode_line, parse_fields};
