//! Modbus TCP client for Vestel EVC04 charger communication
//!
//! This module provides async Modbus TCP communication with the EVC04,
//! covering the input-register telemetry blocks and the holding-register
//! control surface, with proper error handling and connection management.

use crate::config::ModbusConfig;
use crate::error::{Result, VestaError};
use crate::logging::get_logger;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use tokio::time::timeout;
use tokio_modbus::client::tcp;
use tokio_modbus::prelude::*;

/// Modbus TCP client for EVC04 communication
pub struct ModbusClient {
    /// Modbus TCP client connection
    client: Option<tokio_modbus::client::Context>,

    /// Configuration
    config: ModbusConfig,

    /// Connection timeout
    connection_timeout: Duration,

    /// Operation timeout
    operation_timeout: Duration,

    /// Logger
    logger: crate::logging::StructuredLogger,
}

impl ModbusClient {
    /// Create a new Modbus client
    pub fn new(config: &ModbusConfig) -> Self {
        let logger = get_logger("modbus");
        Self {
            client: None,
            config: config.clone(),
            connection_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(2),
            logger,
        }
    }

    /// Connect to the charger
    pub async fn connect(&mut self) -> Result<()> {
        let address = format!("{}:{}", self.config.host, self.config.port);

        self.logger
            .info(&format!("Connecting to Modbus server at {}", address));

        let socket_addr: SocketAddr = address
            .to_socket_addrs()
            .map_err(|e| VestaError::modbus(format!("Invalid socket address: {}", e)))?
            .next()
            .ok_or_else(|| {
                VestaError::modbus(format!("Address resolved to nothing: {}", address))
            })?;

        let slave = Slave(self.config.unit_id);
        match timeout(self.connection_timeout, tcp::connect_slave(socket_addr, slave)).await {
            Ok(Ok(client)) => {
                self.client = Some(client);
                self.logger.info("Successfully connected to Modbus server");
                Ok(())
            }
            Ok(Err(e)) => {
                let error_msg = format!("Failed to connect to Modbus server: {}", e);
                self.logger.error(&error_msg);
                Err(VestaError::modbus(error_msg))
            }
            Err(_) => {
                let error_msg = "Connection timeout".to_string();
                self.logger.error(&error_msg);
                Err(VestaError::timeout(error_msg))
            }
        }
    }

    /// Disconnect from the charger
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(_client) = self.client.take() {
            self.logger.info("Disconnecting from Modbus server");
            // The client will be dropped automatically
            Ok(())
        } else {
            Ok(())
        }
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Read input registers
    pub async fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        let timeout_duration = self.operation_timeout;

        // Log before borrowing client
        self.logger.debug(&format!(
            "Reading {} input registers from address {}",
            count, address
        ));

        let client = self.get_client()?;
        let request = client.read_input_registers(address, count);

        match timeout(timeout_duration, request).await {
            Ok(Ok(Ok(response))) => {
                self.logger.trace(&format!(
                    "Read {} registers: {:?}",
                    response.len(),
                    response
                ));
                Ok(response)
            }
            Ok(Ok(Err(e))) => {
                let error_msg = format!("Failed to read input registers: {}", e);
                self.logger.error(&error_msg);
                Err(VestaError::modbus(error_msg))
            }
            Ok(Err(e)) => {
                let error_msg = format!("Failed to read input registers: {}", e);
                self.logger.error(&error_msg);
                Err(VestaError::modbus(error_msg))
            }
            Err(_) => {
                let error_msg = "Read operation timeout".to_string();
                self.logger.error(&error_msg);
                Err(VestaError::timeout(error_msg))
            }
        }
    }

    /// Read holding registers
    pub async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        let timeout_duration = self.operation_timeout;

        // Log before borrowing client
        self.logger.debug(&format!(
            "Reading {} holding registers from address {}",
            count, address
        ));

        let client = self.get_client()?;
        let request = client.read_holding_registers(address, count);

        match timeout(timeout_duration, request).await {
            Ok(Ok(Ok(response))) => {
                self.logger.trace(&format!(
                    "Read {} registers: {:?}",
                    response.len(),
                    response
                ));
                Ok(response)
            }
            Ok(Ok(Err(e))) => {
                let error_msg = format!("Failed to read holding registers: {}", e);
                self.logger.error(&error_msg);
                Err(VestaError::modbus(error_msg))
            }
            Ok(Err(e)) => {
                let error_msg = format!("Failed to read holding registers: {}", e);
                self.logger.error(&error_msg);
                Err(VestaError::modbus(error_msg))
            }
            Err(_) => {
                let error_msg = "Read operation timeout".to_string();
                self.logger.error(&error_msg);
                Err(VestaError::timeout(error_msg))
            }
        }
    }

    /// Write single register
    pub async fn write_single_register(&mut self, address: u16, value: u16) -> Result<()> {
        let timeout_duration = self.operation_timeout;

        // Log before borrowing client
        self.logger.debug(&format!(
            "Writing value {} to register {}",
            value, address
        ));

        let client = self.get_client()?;
        let request = client.write_single_register(address, value);

        match timeout(timeout_duration, request).await {
            Ok(Ok(_)) => {
                self.logger.debug("Successfully wrote single register");
                Ok(())
            }
            Ok(Err(e)) => {
                let error_msg = format!("Failed to write single register: {}", e);
                self.logger.error(&error_msg);
                Err(VestaError::modbus(error_msg))
            }
            Err(_) => {
                let error_msg = "Write operation timeout".to_string();
                self.logger.error(&error_msg);
                Err(VestaError::timeout(error_msg))
            }
        }
    }

    /// Get client reference or error if not connected
    fn get_client(&mut self) -> Result<&mut tokio_modbus::client::Context> {
        self.client
            .as_mut()
            .ok_or_else(|| VestaError::modbus("Not connected to Modbus server"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModbusConfig;

    #[test]
    fn test_modbus_config() {
        let config = ModbusConfig::default();
        assert_eq!(config.port, 502);
        assert_eq!(config.unit_id, 255);
    }

    #[test]
    fn test_modbus_client_creation() {
        let config = ModbusConfig::default();
        let client = ModbusClient::new(&config);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn read_write_without_connect_returns_not_connected() {
        let config = ModbusConfig::default();
        let mut client = ModbusClient::new(&config);

        let err_r = client.read_input_registers(1000, 7).await.unwrap_err();
        assert!(err_r.to_string().contains("Not connected"));

        let err_h = client.read_holding_registers(5004, 1).await.unwrap_err();
        assert!(err_h.to_string().contains("Not connected"));

        let err_w = client.write_single_register(6000, 1).await.unwrap_err();
        assert!(err_w.to_string().contains("Not connected"));
    }
}
