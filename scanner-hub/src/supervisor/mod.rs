//! Connection supervision.
//!
//! One [`ConnectionSupervisor`] per scanner keeps its TCP link alive, decodes
//! inbound lines and records status transitions; the
//! [`SupervisorOrchestrator`] owns them all.

pub mod config;
pub mod connector;
pub mod device;
pub mod events;
pub mod orchestrator;
pub mod registry;

pub use config::SupervisorConfig;
pub use connector::{Connector, DeviceStream, TcpConnector};
pub use device::{ConnectionSupervisor, SupervisorContext};
pub use events::{PersistenceKind, SupervisorEvent};
pub use orchestrator::SupervisorOrchestrator;
pub use registry::StatusRegistry;
