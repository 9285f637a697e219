//! Station-wide state and error types

use core::fmt::{Debug, Write};

use log::error;
use thiserror_no_std::Error;

use crate::compensation::TemperatureCompensator;
use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Constructed, peripherals initialised, not yet listening for events
    Idle,
    Running,
    ShutDown,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StationError {
    #[error("Invalid configuration: {0}")]
    Configuration(ConfigError),
    #[error("No free subscriber slot on the event channel")]
    Subscription,
    #[error("Station has already been shut down")]
    ShutDown,
    #[error("{peripheral}: failed to {operation}: {details}")]
    WriteFailed {
        peripheral: &'static str,
        operation: &'static str,
        details: heapless::String<64>,
    },
}

impl From<ConfigError> for StationError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value)
    }
}

impl StationError {
    /// Capture a driver error as a write failure. Details longer than the
    /// buffer are truncated.
    pub fn write_failed<E: Debug>(
        peripheral: &'static str,
        operation: &'static str,
        cause: &E,
    ) -> Self {
        let mut details = heapless::String::new();
        let _ = write!(details, "{:?}", cause);
        Self::WriteFailed {
            peripheral,
            operation,
            details,
        }
    }
}

/// Record of failures that were handled locally instead of propagated.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub write_failures: u32,
    pub last_error: Option<StationError>,
}

impl Diagnostics {
    pub fn record(&mut self, err: StationError) {
        error!("{}", err);
        self.write_failures = self.write_failures.wrapping_add(1);
        self.last_error = Some(err);
    }

    /// Log and count a failed peripheral write; successful results pass
    /// through untouched.
    pub fn check<E: Debug>(
        &mut self,
        peripheral: &'static str,
        operation: &'static str,
        result: Result<(), E>,
    ) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                self.record(StationError::write_failed(peripheral, operation, &e));
                false
            }
        }
    }
}

/// Values owned by the station's main context. Each field has exactly one
/// writer: the event handler.
pub struct StationState {
    pub run_state: RunState,
    pub compensator: TemperatureCompensator,
    pub last_pressure: f32,
    pub diagnostics: Diagnostics,
}

impl StationState {
    pub fn new(compensator: TemperatureCompensator) -> Self {
        Self {
            run_state: RunState::Idle,
            compensator,
            last_pressure: 0.0,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn compensated_temperature(&self) -> f32 {
        self.compensator.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_failure_captures_driver_error() {
        #[derive(Debug)]
        struct BusNak;

        let err = StationError::write_failed("display", "show value", &BusNak);
        match err {
            StationError::WriteFailed {
                peripheral,
                operation,
                details,
            } => {
                assert_eq!(peripheral, "display");
                assert_eq!(operation, "show value");
                assert_eq!(details.as_str(), "BusNak");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_long_details_are_truncated() {
        let cause = [0u8; 64];
        let err = StationError::write_failed("led strip", "write frame", &cause);
        let StationError::WriteFailed { details, .. } = err else {
            panic!("expected a write failure");
        };
        assert!(details.starts_with("[0, 0, 0"));
        assert!(details.len() <= 64);
    }

    #[test]
    fn test_diagnostics_count_failures() {
        let mut diagnostics = Diagnostics::default();
        assert!(diagnostics.check::<()>("icon", "show icon", Ok(())));
        assert!(!diagnostics.check("icon", "show icon", Err("offline")));
        assert_eq!(diagnostics.write_failures, 1);
        assert!(matches!(
            diagnostics.last_error,
            Some(StationError::WriteFailed { peripheral: "icon", .. })
        ));
    }
}
