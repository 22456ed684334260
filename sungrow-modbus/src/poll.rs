//! One complete poll of a device.
//!
//! A cycle reads the identity code, resolves the register map, plans block
//! reads, issues them one at a time and decodes whatever came back into a
//! [`PollSnapshot`]. Block failures are absorbed; identity and model failures
//! end the cycle in [`PollState::Failed`].

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use tracing::{debug, error, warn};

use crate::decoder::{Value, decode};
use crate::error::{BlockError, PollError, Result};
use crate::models::{IDENTITY_ADDRESS, Model, ModelRegistry};
use crate::planner::{RegisterBlock, RegisterPlanner};
use crate::register::RegisterSpace;
use crate::transport::RegisterTransport;

/// Progress of a poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    Idle,
    ReadingIdentity,
    ResolvingModel,
    Planning,
    ReadingBlocks,
    Decoding,
    Published,
    Failed,
}

/// A block whose read or decode failed during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockFailure {
    pub space: RegisterSpace,
    pub start: u16,
    pub count: u16,
    #[serde(serialize_with = "serialize_display")]
    pub error: BlockError,
}

impl BlockFailure {
    /// Whether this failure leaves the connection unusable for later cycles.
    pub fn requires_reconnect(&self) -> bool {
        self.error.requires_reconnect()
    }
}

fn serialize_display<S: Serializer>(
    error: &BlockError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Decoded values from one completed poll cycle.
///
/// Immutable once returned; the next cycle produces a new snapshot rather
/// than updating this one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollSnapshot {
    identity_code: u16,
    model: Model,
    timestamp: i64,
    values: BTreeMap<u16, Value>,
    failed_blocks: Vec<BlockFailure>,
}

impl PollSnapshot {
    /// Build a snapshot taken now with no failed blocks.
    pub fn new(identity_code: u16, model: Model, values: BTreeMap<u16, Value>) -> Self {
        Self {
            identity_code,
            model,
            timestamp: chrono::Utc::now().timestamp_millis(),
            values,
            failed_blocks: Vec::new(),
        }
    }

    /// Device type code read at the start of the cycle.
    pub fn identity_code(&self) -> u16 {
        self.identity_code
    }

    pub fn model(&self) -> Model {
        self.model
    }

    /// Unix epoch milliseconds when the cycle completed.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Value decoded for `address`, `None` if its block failed.
    pub fn get(&self, address: u16) -> Option<&Value> {
        self.values.get(&address)
    }

    pub fn values(&self) -> &BTreeMap<u16, Value> {
        &self.values
    }

    pub fn failed_blocks(&self) -> &[BlockFailure] {
        &self.failed_blocks
    }

    /// Whether every planned block was read and decoded.
    pub fn is_complete(&self) -> bool {
        self.failed_blocks.is_empty()
    }

    /// Whether any failed block calls for a fresh connection.
    pub fn requires_reconnect(&self) -> bool {
        self.failed_blocks.iter().any(BlockFailure::requires_reconnect)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A single poll of one device.
///
/// Cycles are sequential: the transport is borrowed mutably for the whole
/// run, so only one cycle can be in flight per connection.
#[derive(Debug)]
pub struct PollCycle<'a> {
    registry: &'a ModelRegistry,
    planner: RegisterPlanner,
    unit_id: u8,
    state: PollState,
}

impl<'a> PollCycle<'a> {
    pub fn new(registry: &'a ModelRegistry, unit_id: u8) -> Self {
        Self {
            registry,
            planner: RegisterPlanner::default(),
            unit_id,
            state: PollState::Idle,
        }
    }

    /// Use a custom planner, e.g. with a smaller request size limit.
    pub fn with_planner(mut self, planner: RegisterPlanner) -> Self {
        self.planner = planner;
        self
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    fn transition(&mut self, next: PollState) {
        debug!(unit_id = self.unit_id, from = ?self.state, to = ?next, "Poll state");
        self.state = next;
    }

    fn fail(&mut self, err: PollError) -> PollError {
        self.transition(PollState::Failed);
        err
    }

    /// Run the cycle to completion against `transport`.
    pub async fn run<T: RegisterTransport>(&mut self, transport: &mut T) -> Result<PollSnapshot> {
        self.transition(PollState::ReadingIdentity);
        let words = match transport
            .read_holding_registers(IDENTITY_ADDRESS, 1, self.unit_id)
            .await
        {
            Ok(words) => words,
            Err(e) => {
                warn!(unit_id = self.unit_id, error = %e, "Identity read failed");
                return Err(self.fail(PollError::Identity(e)));
            }
        };
        let [identity_code] = words[..] else {
            return Err(self.fail(PollError::IdentityWordCount(words.len())));
        };

        self.transition(PollState::ResolvingModel);
        let registry = self.registry;
        let Some(definition) = registry.get(identity_code) else {
            error!(
                unit_id = self.unit_id,
                code = identity_code,
                "Unsupported model: {:#06x}",
                identity_code
            );
            return Err(self.fail(PollError::UnsupportedModel(identity_code)));
        };
        let model = definition.model();

        self.transition(PollState::Planning);
        let blocks = match self.planner.plan(definition.registers()) {
            Ok(blocks) => blocks,
            Err(e) => return Err(self.fail(e.into())),
        };

        self.transition(PollState::ReadingBlocks);
        let mut responses = Vec::with_capacity(blocks.len());
        for block in &blocks {
            let result = transport
                .read_registers(
                    block.space(),
                    block.start_address(),
                    block.total_word_count(),
                    self.unit_id,
                )
                .await;
            responses.push(result);
        }

        self.transition(PollState::Decoding);
        let mut values = BTreeMap::new();
        let mut failed_blocks = Vec::new();
        for (block, response) in blocks.iter().zip(responses) {
            let decoded = match response {
                Ok(words) => decode(block, &words).map_err(BlockError::from),
                Err(e) => Err(BlockError::from(e)),
            };

            match decoded {
                Ok(block_values) => values.extend(block_values),
                Err(error) => {
                    warn!(
                        unit_id = self.unit_id,
                        space = %block.space(),
                        start = block.start_address(),
                        count = block.total_word_count(),
                        error = %error,
                        "Dropping register block"
                    );
                    failed_blocks.push(failure(block, error));
                }
            }
        }

        self.transition(PollState::Published);
        Ok(PollSnapshot {
            failed_blocks,
            ..PollSnapshot::new(identity_code, model, values)
        })
    }
}

fn failure(block: &RegisterBlock, error: BlockError) -> BlockFailure {
    BlockFailure {
        space: block.space(),
        start: block.start_address(),
        count: block.total_word_count(),
        error,
    }
}
