//! Configuration loading — TOML file with environment variable overrides.
//!
//! Reads `edgewire.toml` unless another path is given. Every section has a
//! default, so a missing file yields an agent with a single local connection
//! and no devices.

mod devices;

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use edgewire_adapter_mqtt::MqttConfig;

pub use devices::{
    DeviceConfig, GpioActuatorSection, GpioSensorSection, HeartbeatSection, LogicOrSection,
    PwmActuatorSection, ThresholdSection,
};

/// Default configuration file name.
pub const DEFAULT_PATH: &str = "edgewire.toml";

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub gpio: GpioConfig,
    pub connections: Vec<ConnectionConfig>,
    /// Raw device tables, parsed one by one at wiring time.
    pub devices: Vec<toml::Table>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            gpio: GpioConfig::default(),
            connections: vec![ConnectionConfig {
                id: "local".to_string(),
                kind: ConnectionKind::Local,
            }],
            devices: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "edgewired=info,edgewire=info".to_string(),
        }
    }
}

/// Pin backend selection.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    pub backend: GpioBackendKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioBackendKind {
    /// Simulated pins, no hardware access.
    #[default]
    Virtual,
}

/// One `[[connections]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Name destinations use to refer to this connection.
    pub id: String,
    #[serde(flatten)]
    pub kind: ConnectionKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ConnectionKind {
    Local,
    Mqtt(MqttConfig),
}

impl Config {
    /// Load configuration from `path` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the connection list is inconsistent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("EDGEWIRE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for connection in &self.connections {
            if connection.id.is_empty() || connection.id.contains('/') {
                return Err(ConfigError::Validation(format!(
                    "invalid connection id `{}`",
                    connection.id
                )));
            }
            if !seen.insert(connection.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "connection `{}` is defined twice",
                    connection.id
                )));
            }
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
