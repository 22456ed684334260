//! The register read capability consumed by poll cycles.
//!
//! Implementations own the wire connection. A single transport serves one
//! outstanding request at a time, so poll cycles take it by `&mut`.

use std::future::Future;

use crate::error::TransportError;
use crate::register::RegisterSpace;

/// Reads contiguous runs of 16-bit registers from a device.
///
/// On success both operations return exactly `count` words in ascending
/// address order.
pub trait RegisterTransport: Send {
    fn read_input_registers(
        &mut self,
        start: u16,
        count: u16,
        unit_id: u8,
    ) -> impl Future<Output = Result<Vec<u16>, TransportError>> + Send;

    fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
        unit_id: u8,
    ) -> impl Future<Output = Result<Vec<u16>, TransportError>> + Send;

    /// Read from whichever space `space` names.
    fn read_registers(
        &mut self,
        space: RegisterSpace,
        start: u16,
        count: u16,
        unit_id: u8,
    ) -> impl Future<Output = Result<Vec<u16>, TransportError>> + Send {
        async move {
            match space {
                RegisterSpace::Input => self.read_input_registers(start, count, unit_id).await,
                RegisterSpace::Holding => self.read_holding_registers(start, count, unit_id).await,
            }
        }
    }
}
