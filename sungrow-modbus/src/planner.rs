//! Coalescing of register lists into contiguous block reads.
//!
//! Registers are sorted by `(space, address)` and partitioned greedily into
//! maximal gap-free runs. No padding words are ever read: two registers end
//! up in the same block only when one starts exactly where the other ends.

use crate::error::PlanError;
use crate::register::{Register, RegisterSpace};

/// Largest number of words a single Modbus read request may carry.
pub const MAX_READ_WORDS: u16 = 125;

/// A run of back-to-back registers read with a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterBlock {
    space: RegisterSpace,
    start_address: u16,
    total_word_count: u16,
    registers: Vec<Register>,
}

impl RegisterBlock {
    fn new(first: Register) -> Self {
        Self {
            space: first.space,
            start_address: first.address,
            total_word_count: first.word_count,
            registers: vec![first],
        }
    }

    fn push(&mut self, register: Register) {
        self.total_word_count += register.word_count;
        self.registers.push(register);
    }

    /// Address space the block is read from.
    pub fn space(&self) -> RegisterSpace {
        self.space
    }

    pub fn start_address(&self) -> u16 {
        self.start_address
    }

    /// Sum of the member registers' word counts.
    pub fn total_word_count(&self) -> u16 {
        self.total_word_count
    }

    /// One past the last word address covered by the block.
    pub fn end_address(&self) -> u32 {
        u32::from(self.start_address) + u32::from(self.total_word_count)
    }

    /// Members in address order.
    pub fn registers(&self) -> &[Register] {
        &self.registers
    }
}

/// Builds read plans from register lists.
#[derive(Debug, Clone, Copy)]
pub struct RegisterPlanner {
    max_block_words: u16,
}

impl Default for RegisterPlanner {
    fn default() -> Self {
        Self {
            max_block_words: MAX_READ_WORDS,
        }
    }
}

impl RegisterPlanner {
    /// Create a planner with the protocol's request size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a planner that never emits a block larger than `max_block_words`.
    ///
    /// Runs longer than the limit are split at register boundaries. A single
    /// register wider than the limit still gets a block of its own.
    pub fn with_max_block_words(max_block_words: u16) -> Result<Self, PlanError> {
        if max_block_words == 0 {
            return Err(PlanError::ZeroBlockLimit);
        }
        Ok(Self { max_block_words })
    }

    pub fn max_block_words(&self) -> u16 {
        self.max_block_words
    }

    /// Partition `registers` into the minimal list of contiguous blocks.
    ///
    /// Fails if any register is malformed or if two registers in the same
    /// space claim overlapping word ranges.
    pub fn plan(&self, registers: &[Register]) -> Result<Vec<RegisterBlock>, PlanError> {
        for register in registers {
            register.validate()?;
        }

        let mut sorted = registers.to_vec();
        sorted.sort_by_key(|r| (r.space, r.address));

        let mut blocks: Vec<RegisterBlock> = Vec::new();
        let mut current: Option<RegisterBlock> = None;

        for register in sorted {
            let Some(block) = current.as_mut() else {
                current = Some(RegisterBlock::new(register));
                continue;
            };

            if block.space == register.space {
                if u32::from(register.address) < block.end_address() {
                    let previous = block
                        .registers
                        .last()
                        .map(|r| r.address)
                        .unwrap_or(block.start_address);
                    return Err(PlanError::Overlap {
                        space: register.space,
                        address: register.address,
                        previous,
                    });
                }

                let fits = u32::from(block.total_word_count) + u32::from(register.word_count)
                    <= u32::from(self.max_block_words);
                if u32::from(register.address) == block.end_address() && fits {
                    block.push(register);
                    continue;
                }
            }

            if let Some(done) = current.replace(RegisterBlock::new(register)) {
                blocks.push(done);
            }
        }

        blocks.extend(current);

        tracing::trace!(
            registers = registers.len(),
            blocks = blocks.len(),
            "Planned register reads"
        );

        Ok(blocks)
    }
}

/// Plan `registers` with the default request size limit.
pub fn plan(registers: &[Register]) -> Result<Vec<RegisterBlock>, PlanError> {
    RegisterPlanner::default().plan(registers)
}
