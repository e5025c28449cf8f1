//! Configuration management for Vesta
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files.

use crate::error::{Result, VestaError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hard floor for the poll interval; the EVC04 firmware expects at least
/// 250 ms between request bursts.
pub const MIN_POLL_INTERVAL_MS: u64 = 250;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Modbus TCP connection configuration
    pub modbus: ModbusConfig,

    /// Device instance for D-Bus service naming
    pub device_instance: u32,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

/// Modbus TCP connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModbusConfig {
    /// Hostname or IP address of the EV charger
    pub host: String,

    /// TCP port (typically 502)
    pub port: u16,

    /// Modbus unit identifier (the EVC04 answers on 255)
    pub unit_id: u8,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file (or directory for rotated files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            port: 502,
            unit_id: 255,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/vesta.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modbus: ModbusConfig::default(),
            device_instance: 0,
            logging: LoggingConfig::default(),
            poll_interval_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os("VESTA_CONFIG") {
            return Self::from_file(path);
        }

        let default_paths = [
            "vesta_config.yaml",
            "/data/vesta_config.yaml",
            "/etc/vesta/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Poll interval with the protocol floor applied
    pub fn effective_poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.modbus.host.is_empty() {
            return Err(VestaError::validation(
                "modbus.host",
                "Host cannot be empty",
            ));
        }

        if self.modbus.port == 0 {
            return Err(VestaError::validation(
                "modbus.port",
                "Port must be greater than 0",
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(VestaError::validation(
                "poll_interval_ms",
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}
