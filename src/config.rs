//! Configuration loader and validator
//!
//! Loads settings from TOML files in the configs/ directory.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::alpha::constants::{
    ACTIVATION_THRESHOLD, DEFAULT_CHARACTERISTIC_DESCRIPTION, DEFAULT_DEVICE_NAME,
    DEFAULT_SCAN_TIMEOUT_MS, DEFAULT_SERVICE_DESCRIPTION, DEFAULT_TICK_RATE_HZ,
};
use crate::alpha::types::SessionTargets;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "configs/default.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bluetooth: BluetoothSettings,

    #[serde(default)]
    pub activation: ActivationSettings,

    #[serde(default)]
    pub control_loop: ControlLoopSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Which device, service and characteristic to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BluetoothSettings {
    /// Substring of the advertised device name
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Substring of the service description
    #[serde(default = "default_service")]
    pub service: String,

    /// Substring of the characteristic description
    #[serde(default = "default_characteristic")]
    pub characteristic: String,

    /// How long to scan for devices (milliseconds)
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,
}

impl Default for BluetoothSettings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            service: default_service(),
            characteristic: default_characteristic(),
            scan_timeout_ms: default_scan_timeout_ms(),
        }
    }
}

/// Activation rule settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationSettings {
    /// Raw readings strictly above this count as activated
    #[serde(default = "default_threshold")]
    pub threshold: u16,
}

impl Default for ActivationSettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

/// Reference control loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlLoopSettings {
    /// Ticks per second
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,
}

impl Default for ControlLoopSettings {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate_hz(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_device_name() -> String { DEFAULT_DEVICE_NAME.to_string() }
fn default_service() -> String { DEFAULT_SERVICE_DESCRIPTION.to_string() }
fn default_characteristic() -> String { DEFAULT_CHARACTERISTIC_DESCRIPTION.to_string() }
fn default_scan_timeout_ms() -> u64 { DEFAULT_SCAN_TIMEOUT_MS }
fn default_threshold() -> u16 { ACTIVATION_THRESHOLD }
fn default_tick_rate_hz() -> u32 { DEFAULT_TICK_RATE_HZ }
fn default_log_level() -> String { "info".to_string() }

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        info!("Loading configuration from: {}", path_ref.display());

        let content = std::fs::read_to_string(path_ref)?;
        let config = Self::from_toml(&content)?;

        info!("✓ Config loaded");
        Ok(config)
    }

    /// Load default configuration from configs/default.toml
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(DEFAULT_CONFIG_PATH)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;

        debug!("  - Device: '{}'", config.bluetooth.device_name);
        debug!("  - Service: '{}'", config.bluetooth.service);
        debug!("  - Characteristic: '{}'", config.bluetooth.characteristic);
        debug!("  - Threshold: {}", config.activation.threshold);

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bluetooth = &self.bluetooth;

        for (name, value) in [
            ("device_name", &bluetooth.device_name),
            ("service", &bluetooth.service),
            ("characteristic", &bluetooth.characteristic),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("bluetooth.{} must not be empty", name)));
            }
        }

        if bluetooth.scan_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "bluetooth.scan_timeout_ms must be positive".into()
            ));
        }

        if !(1..=1000).contains(&self.control_loop.tick_rate_hz) {
            return Err(ConfigError::Invalid(
                "control_loop.tick_rate_hz must be between 1 and 1000".into()
            ));
        }

        Ok(())
    }

    /// Discovery targets for a session
    pub fn targets(&self) -> SessionTargets {
        SessionTargets::new(
            self.bluetooth.device_name.clone(),
            self.bluetooth.service.clone(),
            self.bluetooth.characteristic.clone(),
        )
    }

    /// Scan duration
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.bluetooth.scan_timeout_ms)
    }

    /// Time between control loop ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.control_loop.tick_rate_hz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let config = Config::default();
        assert_eq!(config.bluetooth.device_name, "FANTMalpha");
        assert_eq!(config.bluetooth.service, "Nordic UART Service");
        assert_eq!(config.bluetooth.characteristic, "Nordic UART TX");
        assert_eq!(config.bluetooth.scan_timeout_ms, 5000);
        assert_eq!(config.activation.threshold, 100);
        assert_eq!(config.control_loop.tick_rate_hz, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_toml(
            r#"
            [bluetooth]
            device_name = "FANTMbeta"

            [activation]
            threshold = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.bluetooth.device_name, "FANTMbeta");
        assert_eq!(config.bluetooth.service, "Nordic UART Service");
        assert_eq!(config.activation.threshold, 250);
        assert_eq!(config.targets().device_name, "FANTMbeta");
    }

    #[test]
    fn test_invalid_empty_target() {
        let mut config = Config::default();
        config.bluetooth.service = "  ".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("bluetooth.service"));
    }

    #[test]
    fn test_invalid_scan_timeout() {
        let result = Config::from_toml("[bluetooth]\nscan_timeout_ms = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_tick_rate() {
        let mut config = Config::default();
        config.control_loop.tick_rate_hz = 0;
        assert!(config.validate().is_err());

        config.control_loop.tick_rate_hz = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error() {
        let result = Config::from_toml("[bluetooth\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_tick_interval() {
        let mut config = Config::default();
        config.control_loop.tick_rate_hz = 100;
        assert_eq!(config.tick_interval(), Duration::from_millis(10));
    }
}
