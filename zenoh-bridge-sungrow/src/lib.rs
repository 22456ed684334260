//! Zenoh bridge for Sungrow inverters.
//!
//! This bridge polls Sungrow inverters over Modbus (TCP or RTU/serial),
//! resolves each device's model from its identity register and publishes
//! decoded readings to Zenoh as telemetry.
//!
//! # Key Expressions
//!
//! ```text
//! <prefix>/<device>/<address>     one reading per sensor
//! <prefix>/<device>/@/status      device status after each cycle
//! <prefix>/@/status               bridge status
//! ```
//!
//! Where:
//! - `<prefix>` - `sungrow.key_prefix` from configuration (default `sungrow`)
//! - `<device>` - Device name from configuration
//! - `<address>` - Register address

pub mod config;
pub mod logging;
pub mod poller;
pub mod session;
pub mod telemetry;
pub mod transport;
