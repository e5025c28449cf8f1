//! # Vesta - Vestel EVC04 EV Charger Driver for Victron Venus OS
//!
//! A Rust driver for Vestel EVC04 wallboxes, polling the charger over
//! Modbus TCP and publishing its telemetry to Venus OS through D-Bus.
//!
//! ## Features
//!
//! - **Modbus TCP**: Direct communication with the EVC04 register map
//! - **D-Bus Integration**: Full Venus OS `com.victronenergy.evcharger`
//!   compatibility
//! - **Resilient Polling**: All-or-nothing read cycles with automatic
//!   reconnect; a failed cycle never publishes partial data
//! - **Watchdog Heartbeat**: Keeps the charger out of failsafe mode while
//!   the driver is in control
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `registers`: EVC04 register map constants
//! - `modbus`: Modbus TCP client for charger communication
//! - `charger`: Decoders, reading assemblers, status mapping and the
//!   poll/commit session
//! - `driver`: Main loop tying the session to D-Bus
//! - `dbus`: D-Bus integration for Venus OS

pub mod charger;
pub mod config;
pub mod dbus;
pub mod driver;
pub mod error;
pub mod logging;
pub mod modbus;
pub mod registers;

// Re-export commonly used types
pub use charger::ChargerSession;
pub use config::Config;
pub use driver::Evc04Driver;
pub use error::{Result, VestaError};
