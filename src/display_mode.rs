//! Display mode state machine
//!
//! Holding the mode button shows pressure, releasing it goes back to the
//! compensated temperature. The indicator LED mirrors the button: it is
//! driven in the same call that changes the mode.

use embedded_hal::digital::OutputPin;
use log::debug;

use crate::sensors::ButtonEdge;

/// What the numeric display shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Temperature,
    Pressure,
}

pub struct DisplayModeController<P> {
    mode: DisplayMode,
    indicator: Option<P>,
}

impl<P: OutputPin> DisplayModeController<P> {
    pub fn new(indicator: Option<P>) -> Self {
        Self {
            mode: DisplayMode::Temperature,
            indicator,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn has_indicator(&self) -> bool {
        self.indicator.is_some()
    }

    /// Apply a button edge. The mode always changes; the returned error only
    /// reports a failure to drive the indicator line.
    pub fn on_button(&mut self, edge: ButtonEdge) -> Result<DisplayMode, P::Error> {
        self.mode = match edge {
            ButtonEdge::Pressed => DisplayMode::Pressure,
            ButtonEdge::Released => DisplayMode::Temperature,
        };
        debug!("Display mode -> {:?}", self.mode);

        self.drive_indicator()?;
        Ok(self.mode)
    }

    /// Force the indicator line to match the current mode.
    pub fn drive_indicator(&mut self) -> Result<(), P::Error> {
        match (self.indicator.as_mut(), self.mode) {
            (Some(pin), DisplayMode::Pressure) => pin.set_high(),
            (Some(pin), DisplayMode::Temperature) => pin.set_low(),
            (None, _) => Ok(()),
        }
    }

    /// Deassert and give up the indicator line. Safe to call repeatedly.
    pub fn release(&mut self) -> Result<(), P::Error> {
        match self.indicator.take() {
            Some(mut pin) => pin.set_low(),
            None => Ok(()),
        }
    }
}
