//! Layered configuration
//!
//! Defaults, then an optional TOML file, then `DRIVER_GUARD__*` environment
//! variables (e.g. `DRIVER_GUARD__ALERTS__COOLDOWN_SECONDS=60`).

use alerting::{AlertConfig, EmergencyContact, GeoPoint};
use config::{Config, Environment, File, FileFormat};
use dms::DmsConfig;
use event_fusion::FusionConfig;
use motion::MotionConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration file (optional)
pub const DEFAULT_CONFIG_FILE: &str = "driver-guard";

/// Settings error types
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub dms: DmsConfig,
    pub motion: MotionConfig,
    pub alerts: AlertConfig,
    pub fusion: FusionConfig,
    /// Fixed position reported to dispatch (no live location source)
    pub location: Option<GeoPoint>,
    /// Emergency contact to seed the contact store with
    pub contact: Option<EmergencyContact>,
}

impl Settings {
    /// Load from the optional file (`path` or `driver-guard.{toml,json,...}`) and the environment
    pub fn load(path: Option<&str>) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(path.is_some()))
            .add_source(
                Environment::with_prefix("DRIVER_GUARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from TOML text
    pub fn from_toml(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.dms
            .validate()
            .map_err(|e| SettingsError::Invalid(e.to_string()))?;
        self.motion
            .validate()
            .map_err(|e| SettingsError::Invalid(e.to_string()))?;
        self.alerts
            .validate()
            .map_err(|e| SettingsError::Invalid(e.to_string()))?;
        if let Some(contact) = &self.contact {
            contact
                .clone()
                .validated()
                .map_err(|e| SettingsError::Invalid(format!("contact: {}", e)))?;
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(SettingsError::Invalid(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }
        Ok(())
    }
}
