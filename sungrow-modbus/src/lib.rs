//! Sungrow inverter polling over Modbus.
//!
//! This crate turns a device identity code into a register map, plans the
//! fewest contiguous block reads for it and decodes the returned words into
//! typed, scaled values:
//!
//! - [`models`] - identity code to register map (`ModelRegistry`)
//! - [`planner`] - coalescing registers into block reads (`RegisterPlanner`)
//! - [`decoder`] - word buffers to values
//! - [`poll`] - one complete poll cycle (`PollCycle`, `PollSnapshot`)
//! - [`transport`] - the register read capability a poll cycle consumes
//! - [`sensor`] - per-register presentation metadata
//! - [`store`] - latest-snapshot publication
//!
//! # Example
//!
//! ```ignore
//! use sungrow_modbus::{ModelRegistry, PollCycle};
//!
//! let registry = ModelRegistry::builtin()?;
//! let snapshot = PollCycle::new(&registry, 1).run(&mut transport).await?;
//! println!("{:?}", snapshot.get(5007));
//! ```

pub mod decoder;
pub mod error;
pub mod models;
pub mod planner;
pub mod poll;
pub mod register;
pub mod sensor;
pub mod store;
pub mod testing;
pub mod transport;

pub use decoder::{Value, decode};
pub use error::{BlockError, DecodeError, PlanError, PollError, RegistryError, TransportError};
pub use models::{IDENTITY_ADDRESS, Model, ModelDefinition, ModelRegistry};
pub use planner::{MAX_READ_WORDS, RegisterBlock, RegisterPlanner, plan};
pub use poll::{BlockFailure, PollCycle, PollSnapshot, PollState};
pub use register::{DataType, Register, RegisterSpace};
pub use sensor::{DeviceInfo, Sensor, sensors_for};
pub use store::SnapshotStore;
pub use transport::RegisterTransport;
