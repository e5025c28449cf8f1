//! Error types and handling for Vesta
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Vesta operations
pub type Result<T> = std::result::Result<T, VestaError>;

/// Main error type for Vesta
#[derive(Debug, Error)]
pub enum VestaError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Modbus communication errors
    #[error("Modbus error: {message}")]
    Modbus { message: String },

    /// Device protocol violations (decoded value outside its domain)
    #[error("Protocol violation: {field} - {message}")]
    Protocol { field: String, message: String },

    /// D-Bus communication errors
    #[error("D-Bus error: {message}")]
    DBus { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl VestaError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        VestaError::Config {
            message: message.into(),
        }
    }

    /// Create a new Modbus error
    pub fn modbus<S: Into<String>>(message: S) -> Self {
        VestaError::Modbus {
            message: message.into(),
        }
    }

    /// Create a new protocol violation error
    pub fn protocol<S: Into<String>>(field: S, message: S) -> Self {
        VestaError::Protocol {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new D-Bus error
    pub fn dbus<S: Into<String>>(message: S) -> Self {
        VestaError::DBus {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        VestaError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        VestaError::Io {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        VestaError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        VestaError::Generic {
            message: message.into(),
        }
    }

    /// Whether this error means the register link is unusable and must be
    /// re-established before the next cycle.
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            VestaError::Modbus { .. } | VestaError::Timeout { .. }
        )
    }
}

impl From<std::io::Error> for VestaError {
    fn from(err: std::io::Error) -> Self {
        VestaError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for VestaError {
    fn from(err: serde_yaml::Error) -> Self {
        VestaError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for VestaError {
    fn from(err: serde_json::Error) -> Self {
        VestaError::Serialization {
            message: err.to_string(),
        }
    }
}
