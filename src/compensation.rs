//! Ambient temperature compensation
//!
//! The ambient sensor sits next to the CPU, so part of the CPU heat bleeds
//! into every reading. The model treats the raw reading as a weighted mix of
//! true ambient and CPU temperature and solves for the ambient part.

use crate::config::{ConfigError, validate_coefficient};

/// Remove the CPU heat contribution from a raw ambient reading.
///
/// Correction only applies while the CPU is warmer than the last compensated
/// value; otherwise `last_compensated` is returned unchanged.
pub fn compensate(raw: f32, cpu_temp: f32, last_compensated: f32, coefficient: f32) -> f32 {
    if cpu_temp > last_compensated {
        (raw - coefficient * cpu_temp) / (1.0 - coefficient)
    } else {
        last_compensated
    }
}

/// Holds the heating coefficient and the last known good compensated value.
#[derive(Debug, Clone, Copy)]
pub struct TemperatureCompensator {
    coefficient: f32,
    last: f32,
}

impl TemperatureCompensator {
    pub fn new(coefficient: f32) -> Result<Self, ConfigError> {
        validate_coefficient(coefficient)?;
        Ok(Self {
            coefficient,
            last: 0.0,
        })
    }

    /// Compensate a new ambient reading against a CPU temperature snapshot and
    /// retain the result.
    pub fn apply(&mut self, raw: f32, cpu_temp: f32) -> f32 {
        self.last = compensate(raw, cpu_temp, self.last, self.coefficient);
        self.last
    }

    pub fn last(&self) -> f32 {
        self.last
    }
}
