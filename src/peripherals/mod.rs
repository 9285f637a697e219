//! Output peripherals driven by the station
//!
//! Every sink is optional. A peripheral that was never acquired is simply
//! `None` in [`Peripherals`]; writes to it are skipped. The indicator line is
//! any `embedded_hal` output pin.

#[cfg(test)]
pub(crate) mod mock;

use core::convert::Infallible;
use core::fmt::Debug;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::barometer::BarometerIcon;

/// Numeric display (e.g. a 4 digit alphanumeric segment display).
pub trait NumericDisplay {
    type Error: Debug;

    fn set_enabled(&mut self, enabled: bool) -> Result<(), Self::Error>;
    fn clear(&mut self) -> Result<(), Self::Error>;
    fn display(&mut self, value: f32) -> Result<(), Self::Error>;
}

/// Addressable RGB LED strip used as the barometer gauge.
pub trait LedStrip {
    type Error: Debug;

    fn set_brightness(&mut self, brightness: u8) -> Result<(), Self::Error>;
    /// Write one full frame, index 0 first.
    fn write(&mut self, colors: &[Rgb888]) -> Result<(), Self::Error>;
}

/// Screen element showing the weather icon picked from the pressure.
pub trait IconSink {
    type Error: Debug;

    fn show(&mut self, icon: BarometerIcon) -> Result<(), Self::Error>;
}

/// PWM speaker used for the startup chime.
pub trait Speaker {
    type Error: Debug;

    fn play(&mut self, frequency_hz: f32) -> Result<(), Self::Error>;
    fn stop(&mut self) -> Result<(), Self::Error>;
}

/// The set of peripherals handed to the station.
pub struct Peripherals<D, L, P, I, S> {
    pub display: Option<D>,
    pub led_strip: Option<L>,
    pub indicator: Option<P>,
    pub icon: Option<I>,
    pub speaker: Option<S>,
}

impl<D, L, P, I, S> Default for Peripherals<D, L, P, I, S> {
    fn default() -> Self {
        Self {
            display: None,
            led_strip: None,
            indicator: None,
            icon: None,
            speaker: None,
        }
    }
}

/// Placeholder type for a peripheral slot the board does not have.
///
/// It cannot be constructed, so the matching slot is always `None`.
#[derive(Debug)]
pub enum Absent {}

impl NumericDisplay for Absent {
    type Error = Infallible;

    fn set_enabled(&mut self, _enabled: bool) -> Result<(), Infallible> {
        match *self {}
    }

    fn clear(&mut self) -> Result<(), Infallible> {
        match *self {}
    }

    fn display(&mut self, _value: f32) -> Result<(), Infallible> {
        match *self {}
    }
}

impl LedStrip for Absent {
    type Error = Infallible;

    fn set_brightness(&mut self, _brightness: u8) -> Result<(), Infallible> {
        match *self {}
    }

    fn write(&mut self, _colors: &[Rgb888]) -> Result<(), Infallible> {
        match *self {}
    }
}

impl IconSink for Absent {
    type Error = Infallible;

    fn show(&mut self, _icon: BarometerIcon) -> Result<(), Infallible> {
        match *self {}
    }
}

impl Speaker for Absent {
    type Error = Infallible;

    fn play(&mut self, _frequency_hz: f32) -> Result<(), Infallible> {
        match *self {}
    }

    fn stop(&mut self) -> Result<(), Infallible> {
        match *self {}
    }
}

impl ErrorType for Absent {
    type Error = Infallible;
}

impl OutputPin for Absent {
    fn set_low(&mut self) -> Result<(), Infallible> {
        match *self {}
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        match *self {}
    }
}
