//! Scanner connection state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::domain::DeviceEndpoint;

/// Connection phases of a scanner link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    /// No socket is open.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The socket is open and streaming records.
    Connected,
}

impl ConnectionPhase {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    /// Parse from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "disconnected" => Some(Self::Disconnected),
            "connecting" => Some(Self::Connecting),
            "connected" => Some(Self::Connected),
            _ => None,
        }
    }

    /// Validate a phase transition.
    ///
    /// `Disconnected -> Disconnected` is allowed so a closed link can record
    /// further reasons (close after error, unconfigured retries, shutdown).
    pub fn can_transition_to(&self, target: ConnectionPhase) -> bool {
        use ConnectionPhase::*;

        matches!(
            (self, target),
            (Disconnected, Connecting | Disconnected)
                | (Connecting, Connected | Disconnected)
                | (Connected, Disconnected)
        )
    }

    /// Attempt to transition to a new phase.
    pub fn transition_to(&self, target: ConnectionPhase) -> Result<ConnectionPhase, Error> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(Error::InvalidStateTransition {
                from: self.as_str().to_string(),
                to: target.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutable connection state of one scanner, owned by its supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub phase: ConnectionPhase,
    /// Unsuccessful attempts since the last successful connect.
    pub reconnect_attempts: u32,
    pub last_change: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            reconnect_attempts: 0,
            last_change: Utc::now(),
            last_error: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    fn enter(&mut self, target: ConnectionPhase, error: Option<String>) -> Result<(), Error> {
        self.phase = self.phase.transition_to(target)?;
        self.last_change = Utc::now();
        self.last_error = error;
        Ok(())
    }

    /// Start a connection attempt. The previous error stays visible.
    pub fn begin_connecting(&mut self) -> Result<(), Error> {
        let error = self.last_error.clone();
        self.enter(ConnectionPhase::Connecting, error)
    }

    /// A socket was established; the attempt counter starts over.
    pub fn mark_connected(&mut self) -> Result<(), Error> {
        self.enter(ConnectionPhase::Connected, None)?;
        self.reconnect_attempts = 0;
        Ok(())
    }

    /// Record a disconnected phase without counting an attempt.
    pub fn mark_disconnected(&mut self, error: Option<String>) -> Result<(), Error> {
        self.enter(ConnectionPhase::Disconnected, error)
    }

    /// Record an unsuccessful connection cycle and count it.
    pub fn record_failure(&mut self, error: impl Into<String>) -> Result<(), Error> {
        self.enter(ConnectionPhase::Disconnected, Some(error.into()))?;
        self.reconnect_attempts = self.reconnect_attempts.saturating_add(1);
        Ok(())
    }

    /// Drop back to a fresh disconnected state with no attempts counted.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.enter(ConnectionPhase::Disconnected, None)?;
        self.reconnect_attempts = 0;
        Ok(())
    }

    /// Final disconnect on shutdown; the attempt counter is cleared.
    pub fn mark_shutdown(&mut self, reason: impl Into<String>) -> Result<(), Error> {
        self.enter(ConnectionPhase::Disconnected, Some(reason.into()))?;
        self.reconnect_attempts = 0;
        Ok(())
    }
}

/// Point-in-time status of one scanner as exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub status: ConnectionPhase,
    pub last_status_change: DateTime<Utc>,
    pub host: Option<String>,
    pub port: u16,
    pub error_message: Option<String>,
    pub reconnect_attempts: u32,
}

impl DeviceStatus {
    pub fn from_state(endpoint: &DeviceEndpoint, state: &ConnectionState) -> Self {
        Self {
            status: state.phase,
            last_status_change: state.last_change,
            host: endpoint.host.clone(),
            port: endpoint.port,
            error_message: state.last_error.clone(),
            reconnect_attempts: state.reconnect_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_str() {
        assert_eq!(ConnectionPhase::parse("connected"), Some(ConnectionPhase::Connected));
        assert_eq!(ConnectionPhase::parse("disconnected"), Some(ConnectionPhase::Disconnected));
        assert_eq!(ConnectionPhase::parse("CONNECTED"), None);
    }

    #[test]
    fn test_valid_transitions() {
        use ConnectionPhase::*;
        assert!(Disconnected.can_transition_to(Connecting));
        assert!(Disconnected.can_transition_to(Disconnected));
        assert!(Connecting.can_transition_to(Connected));
        assert!(Connecting.can_transition_to(Disconnected));
        assert!(Connected.can_transition_to(Disconnected));
    }

    #[test]
    fn test_invalid_transitions() {
        use ConnectionPhase::*;
        assert!(!Connected.can_transition_to(Connected));
        assert!(!Disconnected.can_transition_to(Connected));
        assert!(!Connected.can_transition_to(Connecting));
        assert!(Connected.transition_to(Connected).is_err());
    }

    #[test]
    fn test_connect_resets_attempts() {
        let mut state = ConnectionState::new();
        for _ in 0..4 {
            state.begin_connecting().unwrap();
            state.record_failure("connection refused").unwrap();
        }
        assert_eq!(state.reconnect_attempts, 4);
        assert_eq!(state.last_error.as_deref(), Some("connection refused"));

        state.begin_connecting().unwrap();
        assert_eq!(state.last_error.as_deref(), Some("connection refused"));
        state.mark_connected().unwrap();
        assert_eq!(state.reconnect_attempts, 0);
        assert!(state.is_connected());
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_illegal_transition_leaves_state_untouched() {
        let mut state = ConnectionState::new();
        state.begin_connecting().unwrap();
        state.mark_connected().unwrap();
        let before = state.clone();

        assert!(state.mark_connected().is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn test_disconnect_keeps_attempts() {
        let mut state = ConnectionState::new();
        state.begin_connecting().unwrap();
        state.record_failure("reset").unwrap();
        state
            .mark_disconnected(Some("address not configured".to_string()))
            .unwrap();
        assert_eq!(state.reconnect_attempts, 1);

        state.reset().unwrap();
        assert_eq!(state.reconnect_attempts, 0);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_shutdown_clears_attempts() {
        let mut state = ConnectionState::new();
        for _ in 0..3 {
            state.begin_connecting().unwrap();
            state.record_failure("connection refused").unwrap();
        }
        assert_eq!(state.reconnect_attempts, 3);

        state.mark_shutdown("application shutdown").unwrap();
        assert_eq!(state.phase, ConnectionPhase::Disconnected);
        assert_eq!(state.reconnect_attempts, 0);
        assert_eq!(state.last_error.as_deref(), Some("application shutdown"));
    }

    #[test]
    fn test_status_serialization() {
        let endpoint = DeviceEndpoint::new("scanner1", Some("10.0.0.5".to_string()), 30000);
        let status = DeviceStatus::from_state(&endpoint, &ConnectionState::new());
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "disconnected");
        assert_eq!(json["host"], "10.0.0.5");
        assert_eq!(json["port"], 30000);
        assert_eq!(json["reconnect_attempts"], 0);
    }
}
