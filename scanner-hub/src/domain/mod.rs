//! Domain layer for scanner-hub.
//!
//! Types describing scanner endpoints, their connection state machine and the
//! status history entries produced by transitions.

pub mod backoff;
pub mod connection;
pub mod endpoint;
pub mod status_event;

pub use backoff::BackoffPolicy;
pub use connection::{ConnectionPhase, ConnectionState, DeviceStatus};
pub use endpoint::{DEFAULT_SCANNER_PORT, DeviceEndpoint};
pub use status_event::StatusTransitionEvent;

pub use scan_frame::{DecodedRecord, RecordFields};
