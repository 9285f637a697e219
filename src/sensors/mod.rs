//! Sensor-side inputs of the station
//!
//! The environmental sensor and the button are owned by their drivers; the
//! station only ever sees the events they publish. The CPU heat source is
//! read directly by the poller through [`HeatSourceReader`].

pub mod cpu_temperature;

pub use cpu_temperature::{CpuTemperature, CpuTemperaturePoller, PollerControl};

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: failed to {operation} ({details})")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: malformed reading")]
    Malformed { sensor: &'static str },
}

/// Edge reported by the mode button driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Pressed,
    Released,
}

/// Everything the station reacts to on its main context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StationEvent {
    /// Raw ambient temperature in °C, not yet compensated
    Ambient(f32),
    /// Raw barometric pressure in hPa
    Pressure(f32),
    Button(ButtonEdge),
}

/// Source of the heat-source (CPU) temperature, already scaled to °C.
///
/// A read may block (e.g. a file read on a host). It is only ever awaited
/// from the poller, so run the poller on its own thread or executor, never
/// joined with the station's event loop.
pub trait HeatSourceReader {
    fn read(&mut self) -> impl Future<Output = Result<f32, SensorError>>;
}

/// Convert a thermal-zone style reading (integer millidegrees Celsius, as
/// found in `/sys/class/thermal/thermal_zone*/temp`) into °C.
pub fn parse_millidegrees(raw: &str) -> Result<f32, SensorError> {
    let millidegrees: f32 = raw.trim().parse().map_err(|_| SensorError::Malformed {
        sensor: "thermal zone",
    })?;
    if !millidegrees.is_finite() {
        return Err(SensorError::Malformed {
            sensor: "thermal zone",
        });
    }
    Ok(millidegrees / 1000.0)
}
