//! Scanner endpoint value object.

use serde::{Deserialize, Serialize};

/// Port every scanner listens on unless configured otherwise.
pub const DEFAULT_SCANNER_PORT: u16 = 30000;

/// Immutable network identity of one scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    /// Unique device identifier
    pub id: String,
    /// Network address; `None` while the scanner is not configured
    pub host: Option<String>,
    /// Shared scanner port
    pub port: u16,
}

impl DeviceEndpoint {
    pub fn new(id: impl Into<String>, host: Option<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            host,
            port,
        }
    }

    /// The address to dial, if one is configured.
    ///
    /// A blank host counts as unconfigured.
    pub fn address(&self) -> Option<&str> {
        self.host
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty())
    }

    pub fn is_configured(&self) -> bool {
        self.address().is_some()
    }
}

impl std::fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.address() {
            Some(host) => write!(f, "{} ({}:{})", self.id, host, self.port),
            None => write!(f, "{} (unconfigured)", self.id),
        }
    }
}
