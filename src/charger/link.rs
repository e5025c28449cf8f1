//! Abstract register link the charger session talks to
//!
//! Keeps the session independent of the concrete transport so tests can
//! substitute canned register responses.

use crate::error::Result;
use crate::modbus::ModbusClient;

#[async_trait::async_trait]
pub trait RegisterLink: Send {
    /// Establish the connection; must be a no-op when already connected
    async fn connect(&mut self) -> Result<()>;

    /// Release the connection; always safe
    async fn disconnect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    async fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>>;

    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>>;

    async fn write_single_register(&mut self, address: u16, value: u16) -> Result<()>;
}

#[async_trait::async_trait]
impl RegisterLink for ModbusClient {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        ModbusClient::connect(self).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        ModbusClient::disconnect(self).await
    }

    fn is_connected(&self) -> bool {
        ModbusClient::is_connected(self)
    }

    async fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        ModbusClient::read_input_registers(self, address, count).await
    }

    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        ModbusClient::read_holding_registers(self, address, count).await
    }

    async fn write_single_register(&mut self, address: u16, value: u16) -> Result<()> {
        ModbusClient::write_single_register(self, address, value).await
    }
}
