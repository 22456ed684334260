//! Register descriptors.
//!
//! A [`Register`] is a plain immutable record: where a value lives on the
//! device, how wide it is, how to interpret its words and how to present it.

use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Address space a register is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegisterSpace {
    /// Input registers (function code 0x04).
    Input,
    /// Holding registers (function code 0x03).
    Holding,
}

impl RegisterSpace {
    /// Return the string name for this space.
    pub fn as_str(&self) -> &'static str {
        match self {
            RegisterSpace::Input => "input",
            RegisterSpace::Holding => "holding",
        }
    }
}

impl std::fmt::Display for RegisterSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the words of a register are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Two ASCII bytes per word, high byte first.
    String,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 32-bit integer, high word first.
    UInt32,
    /// Signed 32-bit integer, high word first.
    Int32,
}

impl DataType {
    /// Fixed width in words, or `None` for variable-width strings.
    pub fn fixed_word_count(&self) -> Option<u16> {
        match self {
            DataType::String => None,
            DataType::UInt16 | DataType::Int16 => Some(1),
            DataType::UInt32 | DataType::Int32 => Some(2),
        }
    }
}

/// A named, typed, word-addressed value exposed by the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Register {
    /// Word offset in the register space.
    pub address: u16,
    /// Display label.
    pub name: String,
    /// How the words are interpreted.
    pub data_type: DataType,
    /// Number of 16-bit words occupied.
    pub word_count: u16,
    /// Multiplier applied to decoded numeric values.
    pub scale: f64,
    /// Unit of measurement (e.g., "V", "°C")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Kind of quantity (e.g., "voltage", "temperature")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    /// How the value evolves (e.g., "measurement", "total_increasing")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
    /// Register space the value is read from (default: input)
    pub space: RegisterSpace,
}

impl Register {
    fn numeric(address: u16, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            address,
            name: name.into(),
            data_type,
            word_count: data_type.fixed_word_count().unwrap_or(1),
            scale: 1.0,
            unit: None,
            device_class: None,
            state_class: None,
            space: RegisterSpace::Input,
        }
    }

    /// Unsigned 16-bit input register.
    pub fn uint16(address: u16, name: impl Into<String>) -> Self {
        Self::numeric(address, name, DataType::UInt16)
    }

    /// Signed 16-bit input register.
    pub fn int16(address: u16, name: impl Into<String>) -> Self {
        Self::numeric(address, name, DataType::Int16)
    }

    /// Unsigned 32-bit input register.
    pub fn uint32(address: u16, name: impl Into<String>) -> Self {
        Self::numeric(address, name, DataType::UInt32)
    }

    /// Signed 32-bit input register.
    pub fn int32(address: u16, name: impl Into<String>) -> Self {
        Self::numeric(address, name, DataType::Int32)
    }

    /// String input register spanning `word_count` words.
    pub fn string(address: u16, name: impl Into<String>, word_count: u16) -> Self {
        Self {
            word_count,
            ..Self::numeric(address, name, DataType::String)
        }
    }

    /// Set the scale factor.
    pub fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the display unit.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set the device class tag.
    pub fn with_device_class(mut self, class: impl Into<String>) -> Self {
        self.device_class = Some(class.into());
        self
    }

    /// Set the state class tag.
    pub fn with_state_class(mut self, class: impl Into<String>) -> Self {
        self.state_class = Some(class.into());
        self
    }

    /// Read this register from the holding space instead of the input space.
    pub fn holding(mut self) -> Self {
        self.space = RegisterSpace::Holding;
        self
    }

    /// One past the last word address covered by this register.
    ///
    /// Widened to `u32` so a register ending at 0xFFFF does not overflow.
    pub fn end_address(&self) -> u32 {
        u32::from(self.address) + u32::from(self.word_count)
    }

    /// Check the width invariants for this register.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.word_count == 0 {
            return Err(PlanError::InvalidRegister {
                address: self.address,
                reason: "word count must be at least 1".to_string(),
            });
        }

        if let Some(expected) = self.data_type.fixed_word_count() {
            if self.word_count != expected {
                return Err(PlanError::InvalidRegister {
                    address: self.address,
                    reason: format!(
                        "{:?} occupies {} word(s), got {}",
                        self.data_type, expected, self.word_count
                    ),
                });
            }
        }

        if self.end_address() > 0x1_0000 {
            return Err(PlanError::InvalidRegister {
                address: self.address,
                reason: "register extends past the end of the address space".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_defaults() {
        let reg = Register::uint16(5010, "MPPT1 Voltage");
        assert_eq!(reg.word_count, 1);
        assert_eq!(reg.scale, 1.0);
        assert_eq!(reg.space, RegisterSpace::Input);
        assert!(reg.unit.is_none());

        let reg = Register::int32(100, "Power");
        assert_eq!(reg.word_count, 2);
        assert_eq!(reg.end_address(), 102);
    }

    #[test]
    fn test_builder_chain() {
        let reg = Register::int16(5007, "Inverter Temperature")
            .scaled(0.1)
            .with_unit("°C")
            .with_device_class("temperature")
            .holding();

        assert_eq!(reg.scale, 0.1);
        assert_eq!(reg.unit.as_deref(), Some("°C"));
        assert_eq!(reg.device_class.as_deref(), Some("temperature"));
        assert_eq!(reg.space, RegisterSpace::Holding);
    }

    #[test]
    fn test_validate_widths() {
        assert!(Register::string(4989, "Serial Number", 10).validate().is_ok());
        assert!(Register::string(0, "Empty", 0).validate().is_err());

        let mut reg = Register::uint32(10, "Counter");
        reg.word_count = 1;
        assert!(matches!(
            reg.validate(),
            Err(PlanError::InvalidRegister { address: 10, .. })
        ));
    }

    #[test]
    fn test_validate_address_space_end() {
        assert!(Register::uint16(0xFFFF, "Last").validate().is_ok());
        assert!(Register::uint32(0xFFFF, "Past end").validate().is_err());
    }

    #[test]
    fn test_space_serialization() {
        let json = serde_json::to_string(&RegisterSpace::Holding).unwrap();
        assert_eq!(json, "\"holding\"");
        assert_eq!(RegisterSpace::Input.to_string(), "input");
    }
}
