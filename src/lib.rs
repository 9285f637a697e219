//! Hardware-independent controller core for a barometric weather station
//!
//! The station turns readings from an ambient temperature/pressure sensor and
//! a mode button into output on a numeric display, a seven LED pressure gauge,
//! a weather icon and a small speaker. Ambient temperature is corrected for
//! the heat the CPU bleeds into the sensor.
//!
//! It is `#![no_std]` so it compiles on embedded targets and on desktop hosts
//! (for the simulator and tests). Boards plug in their drivers through the
//! traits in [`peripherals`] and [`sensors`].

#![no_std]

pub mod app_state;
pub mod barometer;
pub mod chime;
pub mod compensation;
pub mod config;
pub mod display_mode;
pub mod events;
pub mod peripherals;
pub mod sensors;
pub mod station;

pub use app_state::{Diagnostics, RunState, StationError};
pub use config::{ConfigError, StationConfig};
pub use events::{StationChannel, StationEvent};
pub use peripherals::{Absent, Peripherals};
pub use station::WeatherStation;
