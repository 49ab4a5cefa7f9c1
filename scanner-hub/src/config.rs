//! Application configuration.
//!
//! Loaded from a TOML file, then overridden by environment variables:
//! `DATABASE_URL`, `API_BIND_ADDRESS`, `API_PORT` and `LOG_DIR`.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::api::server::ApiServerConfig;
use crate::domain::{DEFAULT_SCANNER_PORT, DeviceEndpoint};
use crate::supervisor::SupervisorConfig;
use crate::{Error, Result};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "scanner-hub.toml";

/// One scanner entry of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScannerConfig {
    pub id: String,
    /// Network address; may be left out until the scanner is installed.
    #[serde(default)]
    pub host: Option<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Port shared by every scanner
    #[serde(default = "default_scanner_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default)]
    pub api: ApiServerConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    /// Scanners in configuration order
    #[serde(default)]
    pub scanners: Vec<ScannerConfig>,
}

fn default_scanner_port() -> u16 {
    DEFAULT_SCANNER_PORT
}

fn default_database_url() -> String {
    "sqlite:scanner-hub.db?mode=rwc".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_scanner_port(),
            database_url: default_database_url(),
            log_dir: default_log_dir(),
            api: ApiServerConfig::default(),
            supervisor: SupervisorConfig::default(),
            scanners: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = Self::parse(content)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Invalid configuration: {}", e)))
    }

    /// Load a configuration file and apply environment overrides.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::parse(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override settings from environment variables, ignoring blank or
    /// unparsable values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL")
            && !url.trim().is_empty()
        {
            self.database_url = url;
        }

        if let Ok(log_dir) = std::env::var("LOG_DIR")
            && !log_dir.trim().is_empty()
        {
            self.log_dir = log_dir;
        }

        self.api.apply_env_overrides();
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::config("scanner port must not be 0"));
        }

        let mut seen = HashSet::new();
        for scanner in &self.scanners {
            if scanner.id.trim().is_empty() {
                return Err(Error::config("scanner id must not be empty"));
            }
            if !seen.insert(scanner.id.as_str()) {
                return Err(Error::config(format!("duplicate scanner id '{}'", scanner.id)));
            }
        }

        self.supervisor.validate()
    }

    /// Endpoints of every configured scanner, in configuration order.
    pub fn endpoints(&self) -> Vec<DeviceEndpoint> {
        self.scanners
            .iter()
            .map(|s| DeviceEndpoint::new(s.id.clone(), s.host.clone(), self.port))
            .collect()
    }
}
