//! tokio-modbus implementation of [`RegisterTransport`].

use std::net::SocketAddr;
use std::time::Duration;

use sungrow_modbus::{RegisterTransport, TransportError};
use tokio_modbus::client::{Context, Reader};
use tokio_modbus::prelude::*;

use crate::config::{ConnectionConfig, DeviceConfig};

/// A connected Modbus client with a per-request timeout.
pub struct ModbusTransport {
    ctx: Context,
    timeout: Duration,
}

impl std::fmt::Debug for ModbusTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModbusTransport")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ModbusTransport {
    /// Connect to the device described by `device`.
    pub async fn connect(device: &DeviceConfig) -> Result<Self, TransportError> {
        let timeout = Duration::from_millis(device.timeout_ms);
        let slave = Slave(device.unit_id);

        let ctx = match &device.connection {
            ConnectionConfig::Tcp { host, port } => {
                let addr = resolve(host, *port).await?;

                tokio::time::timeout(timeout, tcp::connect_slave(addr, slave))
                    .await
                    .map_err(|_| TransportError::Timeout)?
                    .map_err(|e| TransportError::Connection(e.to_string()))?
            }
            ConnectionConfig::Rtu {
                port,
                baud_rate,
                data_bits,
                parity,
                stop_bits,
            } => {
                let parity = match parity.to_lowercase().as_str() {
                    "even" => tokio_serial::Parity::Even,
                    "odd" => tokio_serial::Parity::Odd,
                    _ => tokio_serial::Parity::None,
                };

                let stop_bits = match stop_bits {
                    2 => tokio_serial::StopBits::Two,
                    _ => tokio_serial::StopBits::One,
                };

                let data_bits = match data_bits {
                    5 => tokio_serial::DataBits::Five,
                    6 => tokio_serial::DataBits::Six,
                    7 => tokio_serial::DataBits::Seven,
                    _ => tokio_serial::DataBits::Eight,
                };

                let builder = tokio_serial::new(port, *baud_rate)
                    .parity(parity)
                    .stop_bits(stop_bits)
                    .data_bits(data_bits);

                let serial = tokio_serial::SerialStream::open(&builder).map_err(|e| {
                    TransportError::Connection(format!("Serial open failed: {}", e))
                })?;

                rtu::attach_slave(serial, slave)
            }
        };

        Ok(Self { ctx, timeout })
    }
}

/// Resolve `host:port`, accepting hostnames as well as literal addresses.
async fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| TransportError::Connection(format!("Invalid address: {}", e)))?
        .next()
        .ok_or_else(|| TransportError::Connection(format!("No address found for {}", host)))
}

/// Flatten tokio-modbus' nested result into a [`TransportError`].
fn map_response<T>(
    response: Result<tokio_modbus::Result<T>, tokio::time::error::Elapsed>,
) -> Result<T, TransportError> {
    response
        .map_err(|_| TransportError::Timeout)?
        .map_err(|e| TransportError::Connection(e.to_string()))?
        .map_err(|e| TransportError::Exception(format!("{:?}", e)))
}

impl RegisterTransport for ModbusTransport {
    async fn read_input_registers(
        &mut self,
        start: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, TransportError> {
        self.ctx.set_slave(Slave(unit_id));
        let response =
            tokio::time::timeout(self.timeout, self.ctx.read_input_registers(start, count)).await;
        map_response(response)
    }

    async fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, TransportError> {
        self.ctx.set_slave(Slave(unit_id));
        let response =
            tokio::time::timeout(self.timeout, self.ctx.read_holding_registers(start, count))
                .await;
        map_response(response)
    }
}
