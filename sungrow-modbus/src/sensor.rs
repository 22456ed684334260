//! Per-register presentation metadata and value accessors.

use serde::Serialize;

use crate::decoder::Value;
use crate::models::ModelDefinition;
use crate::poll::PollSnapshot;
use crate::register::Register;

/// Manufacturer reported for every device.
pub const MANUFACTURER: &str = "Sungrow";

/// Identifier prefix for sensors and devices.
pub const DOMAIN: &str = "sungrow_modbus";

/// One published measurement of a device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sensor {
    device_name: String,
    unit_id: u8,
    register: Register,
}

impl Sensor {
    pub fn new(device_name: impl Into<String>, unit_id: u8, register: Register) -> Self {
        Self {
            device_name: device_name.into(),
            unit_id,
            register,
        }
    }

    /// Stable identifier derived from the unit id and register address.
    pub fn unique_id(&self) -> String {
        format!("sungrow_{}_{}", self.unit_id, self.register.address)
    }

    /// Display name, prefixed with the device name.
    pub fn name(&self) -> String {
        format!("{} {}", self.device_name, self.register.name)
    }

    pub fn register(&self) -> &Register {
        &self.register
    }

    pub fn address(&self) -> u16 {
        self.register.address
    }

    pub fn unit(&self) -> Option<&str> {
        self.register.unit.as_deref()
    }

    pub fn device_class(&self) -> Option<&str> {
        self.register.device_class.as_deref()
    }

    pub fn state_class(&self) -> Option<&str> {
        self.register.state_class.as_deref()
    }

    /// Current value, `None` when unknown.
    ///
    /// Unknown covers both "never polled" and "block failed in the latest
    /// snapshot"; values from older snapshots are never carried forward.
    pub fn value<'s>(&self, snapshot: Option<&'s PollSnapshot>) -> Option<&'s Value> {
        snapshot?.get(self.register.address)
    }
}

/// Build one sensor per register of `definition`.
pub fn sensors_for(definition: &ModelDefinition, device_name: &str, unit_id: u8) -> Vec<Sensor> {
    definition
        .registers()
        .iter()
        .map(|register| Sensor::new(device_name, unit_id, register.clone()))
        .collect()
}

/// Static description of a polled device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<(String, String)>,
    pub name: String,
    pub manufacturer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl DeviceInfo {
    pub fn new(device_name: impl Into<String>) -> Self {
        let name = device_name.into();
        Self {
            identifiers: vec![(DOMAIN.to_string(), name.clone())],
            name,
            manufacturer: MANUFACTURER.to_string(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}
