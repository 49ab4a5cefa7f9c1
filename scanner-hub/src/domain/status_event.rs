//! Connection status history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ConnectionPhase, ConnectionState, DeviceEndpoint};

/// Reason recorded while a scanner has no address.
pub const ADDRESS_NOT_CONFIGURED: &str = "address not configured";

/// Reason recorded when an established link closes.
pub const CONNECTION_CLOSED: &str = "connection closed unexpectedly";

/// Reason recorded when the supervisor is stopped.
pub const APPLICATION_SHUTDOWN: &str = "application shutdown";

/// Immutable, append-only record of a connection status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTransitionEvent {
    pub device_id: String,
    pub status: ConnectionPhase,
    pub host: Option<String>,
    pub port: u16,
    pub error_message: Option<String>,
    /// Attempt counter at the time of the transition.
    pub reconnect_attempts: u32,
    pub timestamp: DateTime<Utc>,
}

impl StatusTransitionEvent {
    /// Capture the current state of a scanner as a history entry.
    pub fn capture(endpoint: &DeviceEndpoint, state: &ConnectionState) -> Self {
        Self {
            device_id: endpoint.id.clone(),
            status: state.phase,
            host: endpoint.host.clone(),
            port: endpoint.port,
            error_message: state.last_error.clone(),
            reconnect_attempts: state.reconnect_attempts,
            timestamp: state.last_change,
        }
    }
}
