//! Testing utilities.
//!
//! Provides an in-memory [`RegisterTransport`] that serves register maps per
//! space, records every request and can be told to fail specific reads.

use std::collections::HashMap;

use crate::error::TransportError;
use crate::models::IDENTITY_ADDRESS;
use crate::register::RegisterSpace;
use crate::transport::RegisterTransport;

/// A request observed by the mock transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub space: RegisterSpace,
    pub start: u16,
    pub count: u16,
    pub unit_id: u8,
}

/// In-memory device.
///
/// Unset registers read as zero.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    input_registers: HashMap<u16, u16>,
    holding_registers: HashMap<u16, u16>,
    failures: HashMap<(RegisterSpace, u16), TransportError>,
    short_reads: HashMap<(RegisterSpace, u16), u16>,
    requests: Vec<ReadRequest>,
}

impl MockTransport {
    /// Create an empty device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device reporting `code` at the identity register.
    pub fn with_identity(code: u16) -> Self {
        let mut transport = Self::new();
        transport.set_holding(IDENTITY_ADDRESS, &[code]);
        transport
    }

    /// Write `words` to the input space starting at `start`.
    pub fn set_input(&mut self, start: u16, words: &[u16]) -> &mut Self {
        store(&mut self.input_registers, start, words);
        self
    }

    /// Write `words` to the holding space starting at `start`.
    pub fn set_holding(&mut self, start: u16, words: &[u16]) -> &mut Self {
        store(&mut self.holding_registers, start, words);
        self
    }

    /// Fail every read that starts at `start` in `space`.
    pub fn fail_read(&mut self, space: RegisterSpace, start: u16, error: TransportError) -> &mut Self {
        self.failures.insert((space, start), error);
        self
    }

    /// Answer reads starting at `start` in `space` with only `count` words.
    pub fn truncate_read(&mut self, space: RegisterSpace, start: u16, count: u16) -> &mut Self {
        self.short_reads.insert((space, start), count);
        self
    }

    /// Requests received so far, in issue order.
    pub fn requests(&self) -> &[ReadRequest] {
        &self.requests
    }

    fn read(
        &mut self,
        space: RegisterSpace,
        start: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, TransportError> {
        self.requests.push(ReadRequest {
            space,
            start,
            count,
            unit_id,
        });

        if let Some(error) = self.failures.get(&(space, start)) {
            return Err(error.clone());
        }

        let registers = match space {
            RegisterSpace::Input => &self.input_registers,
            RegisterSpace::Holding => &self.holding_registers,
        };
        let count = self
            .short_reads
            .get(&(space, start))
            .copied()
            .unwrap_or(count);

        Ok((0..count)
            .map(|i| {
                let address = start.wrapping_add(i);
                registers.get(&address).copied().unwrap_or(0)
            })
            .collect())
    }
}

fn store(registers: &mut HashMap<u16, u16>, start: u16, words: &[u16]) {
    for (i, word) in words.iter().enumerate() {
        registers.insert(start.wrapping_add(i as u16), *word);
    }
}

impl RegisterTransport for MockTransport {
    async fn read_input_registers(
        &mut self,
        start: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, TransportError> {
        self.read(RegisterSpace::Input, start, count, unit_id)
    }

    async fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
        unit_id: u8,
    ) -> Result<Vec<u16>, TransportError> {
        self.read(RegisterSpace::Holding, start, count, unit_id)
    }
}

/// Encode `text` as big-endian byte pairs, NUL padded to `word_count` words.
pub fn encode_string(text: &str, word_count: u16) -> Vec<u16> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(usize::from(word_count) * 2, 0);
    bytes
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_reads_and_records() {
        let mut transport = MockTransport::new();
        transport.set_input(10, &[1, 2, 3]);

        let words = transport.read_input_registers(10, 4, 1).await.unwrap();

        assert_eq!(words, vec![1, 2, 3, 0]);
        assert_eq!(
            transport.requests(),
            &[ReadRequest {
                space: RegisterSpace::Input,
                start: 10,
                count: 4,
                unit_id: 1,
            }]
        );
    }

    #[tokio::test]
    async fn test_mock_failure_and_short_read() {
        let mut transport = MockTransport::new();
        transport
            .fail_read(RegisterSpace::Holding, 0, TransportError::Timeout)
            .truncate_read(RegisterSpace::Input, 0, 1);

        assert_eq!(
            transport.read_holding_registers(0, 1, 1).await,
            Err(TransportError::Timeout)
        );
        assert_eq!(transport.read_input_registers(0, 2, 1).await.unwrap().len(), 1);
    }

    #[test]
    fn test_encode_string() {
        assert_eq!(encode_string("AB", 2), vec![0x4142, 0x0000]);
        assert_eq!(encode_string("ABC", 2), vec![0x4142, 0x4300]);
    }
}
