//! Register maps for supported inverter models.
//!
//! Each model's map is the shared common registers followed by its own
//! registers. Supporting a new model means adding a [`Model`] variant and its
//! register list below; nothing else changes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::planner::RegisterPlanner;
use crate::register::Register;

/// Holding register carrying the device type code.
pub const IDENTITY_ADDRESS: u16 = 4999;

/// Supported hardware variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    /// SH10RT-V112 hybrid inverter.
    Sh10Rt,
    /// SH25T-V11 hybrid inverter, three MPPT trackers.
    Sh25T,
}

impl Model {
    /// All built-in models.
    pub const ALL: [Model; 2] = [Model::Sh10Rt, Model::Sh25T];

    /// Device type code reported at [`IDENTITY_ADDRESS`].
    pub fn code(&self) -> u16 {
        match self {
            Model::Sh10Rt => 0x0E03,
            Model::Sh25T => 0x0E26,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Model::Sh10Rt => "SH10RT",
            Model::Sh25T => "SH25T",
        }
    }

    /// Register list for this model, common registers first.
    pub fn registers(&self) -> Vec<Register> {
        let mut registers = common_registers();
        match self {
            Model::Sh10Rt => registers.extend(mppt_registers(2)),
            Model::Sh25T => {
                registers.extend(mppt_registers(3));
                registers.push(
                    Register::uint32(5016, "Total DC Power")
                        .with_unit("W")
                        .with_device_class("power"),
                );
            }
        }
        registers
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn common_registers() -> Vec<Register> {
    vec![
        Register::string(4989, "Serial Number", 10),
        Register::uint16(IDENTITY_ADDRESS, "Device Type Code"),
        Register::int16(5007, "Inverter Temperature")
            .scaled(0.1)
            .with_unit("°C")
            .with_device_class("temperature"),
    ]
}

/// Voltage/current pairs starting at 5010, one pair per tracker.
fn mppt_registers(trackers: u16) -> Vec<Register> {
    (0..trackers)
        .flat_map(|i| {
            let address = 5010 + i * 2;
            let n = i + 1;
            [
                Register::uint16(address, format!("MPPT{} Voltage", n))
                    .scaled(0.1)
                    .with_unit("V")
                    .with_device_class("voltage"),
                Register::uint16(address + 1, format!("MPPT{} Current", n))
                    .scaled(0.1)
                    .with_unit("A")
                    .with_device_class("current"),
            ]
        })
        .collect()
}

/// A model together with its validated register map.
#[derive(Debug, Clone)]
pub struct ModelDefinition {
    model: Model,
    registers: Vec<Register>,
}

impl ModelDefinition {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            registers: model.registers(),
        }
    }

    /// Build a definition with a custom register map.
    pub fn with_registers(model: Model, registers: Vec<Register>) -> Self {
        Self { model, registers }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn registers(&self) -> &[Register] {
        &self.registers
    }
}

/// Maps identity codes to register maps.
///
/// Built once and then only read, so it can be shared freely between pollers.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<u16, ModelDefinition>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in model.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for model in Model::ALL {
            registry.register(ModelDefinition::new(model))?;
        }
        Ok(registry)
    }

    /// Add a model, rejecting duplicate codes, register maps that cannot be
    /// planned and maps that reuse an address across register spaces.
    ///
    /// Snapshots and sensor ids are keyed by address alone, so an address may
    /// only appear once per model.
    pub fn register(&mut self, definition: ModelDefinition) -> Result<(), RegistryError> {
        let code = definition.model.code();
        if self.models.contains_key(&code) {
            return Err(RegistryError::DuplicateCode(code));
        }

        RegisterPlanner::default()
            .plan(&definition.registers)
            .map_err(|source| RegistryError::InvalidModel {
                model: definition.model.name().to_string(),
                source,
            })?;

        let mut spaces = HashMap::new();
        for register in &definition.registers {
            if let Some(space) = spaces.insert(register.address, register.space) {
                if space != register.space {
                    return Err(RegistryError::AddressCollision {
                        model: definition.model.name().to_string(),
                        address: register.address,
                    });
                }
            }
        }

        tracing::debug!(
            model = %definition.model,
            code,
            registers = definition.registers.len(),
            "Registered model"
        );

        self.models.insert(code, definition);
        Ok(())
    }

    /// Look up the definition for an identity code.
    ///
    /// `None` means the hardware is not supported, which is an expected outcome.
    pub fn get(&self, code: u16) -> Option<&ModelDefinition> {
        self.models.get(&code)
    }

    /// Register list for an identity code.
    pub fn lookup(&self, code: u16) -> Option<&[Register]> {
        self.get(code).map(ModelDefinition::registers)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
