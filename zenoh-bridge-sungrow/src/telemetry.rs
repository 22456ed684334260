//! Payloads published to Zenoh.

use serde::{Deserialize, Serialize};
use sungrow_modbus::{PollError, PollSnapshot, RegisterSpace, Sensor, Value};

/// Serialization format for published payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON (human-readable, good for debugging).
    #[default]
    Json,
    /// CBOR (compact binary).
    Cbor,
}

/// Encoding failure.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CBOR serialization error: {0}")]
    Cbor(#[from] ciborium::ser::Error<std::io::Error>),
}

/// Encode a payload in the given format.
pub fn encode<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>, EncodeError> {
    match format {
        Format::Json => Ok(serde_json::to_vec(value)?),
        Format::Cbor => {
            let mut buf = Vec::new();
            ciborium::into_writer(value, &mut buf)?;
            Ok(buf)
        }
    }
}

/// Latest state of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Unix epoch milliseconds of the snapshot the value came from.
    pub timestamp: i64,
    pub device: String,
    pub unique_id: String,
    pub name: String,
    pub address: u16,
    pub space: RegisterSpace,
    /// `None` when the value is unknown.
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
}

impl SensorReading {
    /// Build the reading for `sensor` from `snapshot`.
    pub fn from_snapshot(device: &str, sensor: &Sensor, snapshot: &PollSnapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp(),
            device: device.to_string(),
            unique_id: sensor.unique_id(),
            name: sensor.name(),
            address: sensor.address(),
            space: sensor.register().space,
            value: sensor.value(Some(snapshot)).cloned(),
            unit: sensor.unit().map(str::to_string),
            device_class: sensor.device_class().map(str::to_string),
            state_class: sensor.state_class().map(str::to_string),
        }
    }
}

/// Device availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Every block was read.
    Online,
    /// Some blocks failed.
    Degraded,
    /// The identity read failed.
    Offline,
    /// The device reported a model with no register map.
    Unsupported,
}

/// Status document published per device after each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatusReport {
    pub device: String,
    pub status: DeviceStatus,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_code: Option<u16>,
    #[serde(default)]
    pub failed_blocks: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeviceStatusReport {
    /// Report for a cycle that produced a snapshot.
    pub fn from_snapshot(device: &str, snapshot: &PollSnapshot) -> Self {
        let status = if snapshot.is_complete() {
            DeviceStatus::Online
        } else {
            DeviceStatus::Degraded
        };

        Self {
            device: device.to_string(),
            status,
            timestamp: snapshot.timestamp(),
            model: Some(snapshot.model().name().to_string()),
            identity_code: Some(snapshot.identity_code()),
            failed_blocks: snapshot.failed_blocks().len(),
            error: None,
        }
    }

    /// Report for a cycle that ended in failure.
    pub fn from_error(device: &str, error: &PollError) -> Self {
        let (status, identity_code) = match error {
            PollError::UnsupportedModel(code) => (DeviceStatus::Unsupported, Some(*code)),
            _ => (DeviceStatus::Offline, None),
        };

        Self {
            device: device.to_string(),
            status,
            timestamp: chrono::Utc::now().timestamp_millis(),
            model: None,
            identity_code,
            failed_blocks: 0,
            error: Some(error.to_string()),
        }
    }
}
