//! Supervisor event bus types.

use std::time::Duration;

use crate::domain::StatusTransitionEvent;

/// What a failed write was carrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceKind {
    Record,
    StatusEvent,
}

impl PersistenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::StatusEvent => "status_event",
        }
    }
}

impl std::fmt::Display for PersistenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events published by connection supervisors.
#[derive(Debug, Clone)]
pub enum SupervisorEvent {
    /// A status transition was recorded.
    StatusChanged { event: StatusTransitionEvent },
    /// An inbound line was decoded.
    RecordDecoded { device_id: String, is_valid: bool },
    /// The next connection attempt was scheduled.
    ReconnectScheduled {
        device_id: String,
        attempt: u32,
        delay: Duration,
    },
    /// A write to the persistence sink failed and was dropped.
    PersistenceFailed {
        device_id: String,
        kind: PersistenceKind,
        error: String,
    },
    /// The supervisor stopped for good.
    Stopped { device_id: String },
}

impl SupervisorEvent {
    pub fn device_id(&self) -> &str {
        match self {
            Self::StatusChanged { event } => &event.device_id,
            Self::RecordDecoded { device_id, .. }
            | Self::ReconnectScheduled { device_id, .. }
            | Self::PersistenceFailed { device_id, .. }
            | Self::Stopped { device_id } => device_id,
        }
    }
}
