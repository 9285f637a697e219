//! Station configuration
//!
//! All tunables of the controller live in [`StationConfig`]. The defaults are
//! the reference values for the BMP280 + APA102 + HT16K33 board; a provisioned
//! configuration can be shipped as a postcard blob and loaded with
//! [`StationConfig::from_bytes`].

use embassy_time::Duration;
use log::error;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Number of segments on the barometer LED strip.
pub const LED_COUNT: usize = 7;

/// Fraction of the CPU temperature that bleeds into the ambient sensor.
pub const HEATING_COEFFICIENT: f32 = 0.55;

/// Period of the CPU temperature poller.
pub const CPU_POLL_PERIOD_MS: u32 = 50;

/// Minimum interval between two barometer icon refreshes.
pub const BAROMETER_REFRESH_MS: u32 = 100;

/// Pressure mapped to zero lit segments (hPa).
pub const BAROMETER_RANGE_LOW: f32 = 965.0;

/// Pressure mapped to a fully lit strip (hPa).
pub const BAROMETER_RANGE_HIGH: f32 = 1035.0;

/// Above this the barometer shows "sunny" (hPa).
pub const BAROMETER_RANGE_SUNNY: f32 = 1010.0;

/// Below this the barometer shows "rainy" (hPa).
pub const BAROMETER_RANGE_RAINY: f32 = 990.0;

pub const LED_STRIP_BRIGHTNESS: u8 = 1;

/// Delay between startup and the first note of the startup chime.
pub const CHIME_DELAY_MS: u32 = 300;

/// Configuration rejected at construction time.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("Heating coefficient {0} must lie strictly between 0 and 1")]
    InvalidCoefficient(f32),
    #[error("Pressure range {low}..{high} hPa is empty")]
    InvalidPressureRange { low: f32, high: f32 },
    #[error("Rainy threshold {rainy} hPa is above sunny threshold {sunny} hPa")]
    InvalidIconThresholds { rainy: f32, sunny: f32 },
    #[error("Period '{0}' must be non-zero")]
    InvalidPeriod(&'static str),
    #[error("Configuration blob could not be decoded")]
    Malformed,
}

/// Runtime configuration of the weather station.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct StationConfig {
    pub heating_coefficient: f32,
    pub cpu_poll_period_ms: u32,
    pub barometer_refresh_ms: u32,
    pub pressure_low_hpa: f32,
    pub pressure_high_hpa: f32,
    pub sunny_above_hpa: f32,
    pub rainy_below_hpa: f32,
    pub led_brightness: u8,
    pub chime_enabled: bool,
    pub chime_delay_ms: u32,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            heating_coefficient: HEATING_COEFFICIENT,
            cpu_poll_period_ms: CPU_POLL_PERIOD_MS,
            barometer_refresh_ms: BAROMETER_REFRESH_MS,
            pressure_low_hpa: BAROMETER_RANGE_LOW,
            pressure_high_hpa: BAROMETER_RANGE_HIGH,
            sunny_above_hpa: BAROMETER_RANGE_SUNNY,
            rainy_below_hpa: BAROMETER_RANGE_RAINY,
            led_brightness: LED_STRIP_BRIGHTNESS,
            chime_enabled: true,
            chime_delay_ms: CHIME_DELAY_MS,
        }
    }
}

impl StationConfig {
    /// Decode a postcard-encoded configuration and validate it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|e| {
            error!("Failed to decode station config: {:?}", e);
            ConfigError::Malformed
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every invariant the controller relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_coefficient(self.heating_coefficient)?;

        // Negated comparisons so that NaN bounds are rejected as well
        if !(self.pressure_low_hpa < self.pressure_high_hpa) {
            return Err(ConfigError::InvalidPressureRange {
                low: self.pressure_low_hpa,
                high: self.pressure_high_hpa,
            });
        }
        if !(self.rainy_below_hpa <= self.sunny_above_hpa) {
            return Err(ConfigError::InvalidIconThresholds {
                rainy: self.rainy_below_hpa,
                sunny: self.sunny_above_hpa,
            });
        }
        if self.cpu_poll_period_ms == 0 {
            return Err(ConfigError::InvalidPeriod("cpu_poll_period_ms"));
        }
        if self.barometer_refresh_ms == 0 {
            return Err(ConfigError::InvalidPeriod("barometer_refresh_ms"));
        }
        Ok(())
    }

    pub fn cpu_poll_period(&self) -> Duration {
        Duration::from_millis(self.cpu_poll_period_ms as u64)
    }

    pub fn barometer_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.barometer_refresh_ms as u64)
    }

    pub fn chime_delay(&self) -> Duration {
        Duration::from_millis(self.chime_delay_ms as u64)
    }
}

/// The heat-bleed model divides by `1 - coefficient`, so only the open
/// interval (0, 1) is usable.
pub fn validate_coefficient(coefficient: f32) -> Result<(), ConfigError> {
    if coefficient > 0.0 && coefficient < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidCoefficient(coefficient))
    }
}
