use std::collections::HashSet;

use thiserror::Error;
use tracing::{trace, warn};
use types::{Reading, SensorReadings, Unit};

use crate::schema::{parse_response, SchemaError, ValidatedResponse, WireSchema};

/// How a raw register becomes a sensor value.
#[derive(Debug, Clone, Copy)]
pub enum Transform {
    Identity,
    Scale(fn(f64) -> f64),
    /// Combines the register with a resets counter held at `resets`.
    WithResets {
        resets: usize,
        combine: fn(f64, f64) -> f64,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct SensorDescriptor {
    pub name: &'static str,
    pub index: usize,
    pub unit: Unit,
    pub transform: Transform,
}

impl SensorDescriptor {
    pub const fn raw(name: &'static str, index: usize, unit: Unit) -> Self {
        Self {
            name,
            index,
            unit,
            transform: Transform::Identity,
        }
    }

    pub const fn scaled(name: &'static str, index: usize, unit: Unit, scale: fn(f64) -> f64) -> Self {
        Self {
            name,
            index,
            unit,
            transform: Transform::Scale(scale),
        }
    }

    pub const fn with_resets(
        name: &'static str,
        index: usize,
        resets: usize,
        unit: Unit,
        combine: fn(f64, f64) -> f64,
    ) -> Self {
        Self {
            name,
            index,
            unit,
            transform: Transform::WithResets { resets, combine },
        }
    }

    /// `None` only for a definition that fails [`VariantDefinition::check`].
    fn decode(&self, data: &[f64]) -> Option<f64> {
        let raw = *data.get(self.index)?;
        let value = match self.transform {
            Transform::Identity => raw,
            Transform::Scale(scale) => scale(raw),
            Transform::WithResets { resets, combine } => combine(raw, *data.get(resets)?),
        };
        Some(value)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("{variant}: sensor `{sensor}` reads register {index} outside Data[0..{len}]")]
    IndexOutOfRange {
        variant: &'static str,
        sensor: &'static str,
        index: usize,
        len: usize,
    },
    #[error("{variant}: duplicate sensor name `{sensor}`")]
    DuplicateSensor {
        variant: &'static str,
        sensor: &'static str,
    },
}

/// One protocol revision: its wire schema and register layout.
#[derive(Debug)]
pub struct VariantDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: WireSchema,
    pub sensors: &'static [SensorDescriptor],
}

impl VariantDefinition {
    pub fn check(&self) -> Result<(), DefinitionError> {
        let len = self.schema.data_len;
        let mut names = HashSet::with_capacity(self.sensors.len());
        for sensor in self.sensors {
            let mut indices = vec![sensor.index];
            if let Transform::WithResets { resets, .. } = sensor.transform {
                indices.push(resets);
            }
            if let Some(&index) = indices.iter().find(|&&index| index >= len) {
                return Err(DefinitionError::IndexOutOfRange {
                    variant: self.name,
                    sensor: sensor.name,
                    index,
                    len,
                });
            }
            if !names.insert(sensor.name) {
                return Err(DefinitionError::DuplicateSensor {
                    variant: self.name,
                    sensor: sensor.name,
                });
            }
        }
        Ok(())
    }

    pub fn validate(&self, response: &serde_json::Value) -> Result<ValidatedResponse, SchemaError> {
        self.schema.validate(response)
    }

    pub fn decode(&self, response: &ValidatedResponse) -> SensorReadings {
        let mut readings = SensorReadings::with_capacity(self.sensors.len());
        for sensor in self.sensors {
            match sensor.decode(&response.data) {
                Some(value) => readings.push(Reading {
                    name: sensor.name.to_string(),
                    value,
                    unit: sensor.unit,
                }),
                None => warn!(
                    variant = self.name,
                    sensor = sensor.name,
                    index = sensor.index,
                    "sensor register outside response data"
                ),
            }
        }
        trace!(variant = self.name, count = readings.len(), "decoded readings");
        readings
    }

    /// Parse, validate and decode a raw response body.
    pub fn handle_response(&self, raw: &[u8]) -> Result<(ValidatedResponse, SensorReadings), SchemaError> {
        let parsed = parse_response(raw)?;
        let validated = self.validate(&parsed)?;
        let readings = self.decode(&validated);
        Ok((validated, readings))
    }

    pub fn sensor_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sensors.iter().map(|sensor| sensor.name)
    }
}
