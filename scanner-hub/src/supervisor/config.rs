//! Supervisor timing configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::BackoffPolicy;

/// Timings and limits shared by every connection supervisor.
///
/// Defaults match the scanner firmware behaviour; every field can be
/// overridden from the `[supervisor]` table of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Backoff between reconnection attempts
    #[serde(default)]
    pub backoff: BackoffPolicy,
    /// Wait before re-checking a scanner without an address
    #[serde(default = "default_unconfigured_retry_ms")]
    pub unconfigured_retry_ms: u64,
    /// Pause between tearing down a link and a forced reconnection
    #[serde(default = "default_force_reconnect_delay_ms")]
    pub force_reconnect_delay_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Longest accepted line in bytes
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Upper bound for flushing pending writes on stop
    #[serde(default = "default_shutdown_flush_timeout_ms")]
    pub shutdown_flush_timeout_ms: u64,
    /// Capacity of the supervisor event bus
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_unconfigured_retry_ms() -> u64 {
    60_000
}

fn default_force_reconnect_delay_ms() -> u64 {
    1000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_max_line_length() -> usize {
    scan_frame::DEFAULT_MAX_LINE_LENGTH
}

fn default_shutdown_flush_timeout_ms() -> u64 {
    5000
}

fn default_event_capacity() -> usize {
    1024
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            unconfigured_retry_ms: default_unconfigured_retry_ms(),
            force_reconnect_delay_ms: default_force_reconnect_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_line_length: default_max_line_length(),
            shutdown_flush_timeout_ms: default_shutdown_flush_timeout_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl SupervisorConfig {
    pub fn unconfigured_retry(&self) -> Duration {
        Duration::from_millis(self.unconfigured_retry_ms)
    }

    pub fn force_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.force_reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn shutdown_flush_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_flush_timeout_ms)
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.backoff.validate()?;
        if self.unconfigured_retry_ms == 0 {
            return Err(crate::Error::config("unconfigured_retry_ms must be greater than 0"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(crate::Error::config("connect_timeout_ms must be greater than 0"));
        }
        if self.max_line_length == 0 {
            return Err(crate::Error::config("max_line_length must be greater than 0"));
        }
        if self.event_capacity == 0 {
            return Err(crate::Error::config("event_capacity must be greater than 0"));
        }
        Ok(())
    }
}
