//! Recording peripherals for unit tests.

use core::cell::RefCell;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};

use super::{IconSink, LedStrip, NumericDisplay, Peripherals, Speaker};
use crate::barometer::BarometerIcon;
use crate::config::LED_COUNT;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Call {
    DisplayEnabled(bool),
    DisplayClear,
    Display(f32),
    Brightness(u8),
    Leds([Rgb888; LED_COUNT]),
    Indicator(bool),
    Icon(BarometerIcon),
    Play(f32),
    SpeakerStop,
}

pub(crate) type CallLog = RefCell<heapless::Vec<Call, 256>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MockFault;

impl digital::Error for MockFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Implements every peripheral trait and appends each successful call to a
/// shared log. Once its call allowance is spent the mock records nothing and
/// returns [`MockFault`].
pub(crate) struct MockPeripheral<'a> {
    log: &'a CallLog,
    allowance: Option<usize>,
}

impl<'a> MockPeripheral<'a> {
    pub(crate) fn new(log: &'a CallLog) -> Self {
        Self { log, allowance: None }
    }

    pub(crate) fn failing(log: &'a CallLog) -> Self {
        Self::fail_after(log, 0)
    }

    /// Accept `calls` calls, then fail every call after that.
    pub(crate) fn fail_after(log: &'a CallLog, calls: usize) -> Self {
        Self {
            log,
            allowance: Some(calls),
        }
    }

    fn record(&mut self, call: Call) -> Result<(), MockFault> {
        match self.allowance.as_mut() {
            Some(0) => return Err(MockFault),
            Some(remaining) => *remaining -= 1,
            None => {}
        }
        let _ = self.log.borrow_mut().push(call);
        Ok(())
    }
}

pub(crate) type MockPeripherals<'a> = Peripherals<
    MockPeripheral<'a>,
    MockPeripheral<'a>,
    MockPeripheral<'a>,
    MockPeripheral<'a>,
    MockPeripheral<'a>,
>;

/// Every peripheral present and healthy.
pub(crate) fn all_present(log: &CallLog) -> MockPeripherals<'_> {
    Peripherals {
        display: Some(MockPeripheral::new(log)),
        led_strip: Some(MockPeripheral::new(log)),
        indicator: Some(MockPeripheral::new(log)),
        icon: Some(MockPeripheral::new(log)),
        speaker: Some(MockPeripheral::new(log)),
    }
}

/// Calls recorded so far, oldest first.
pub(crate) fn calls(log: &CallLog) -> heapless::Vec<Call, 256> {
    log.borrow().clone()
}

pub(crate) fn clear(log: &CallLog) {
    log.borrow_mut().clear();
}

impl NumericDisplay for MockPeripheral<'_> {
    type Error = MockFault;

    fn set_enabled(&mut self, enabled: bool) -> Result<(), MockFault> {
        self.record(Call::DisplayEnabled(enabled))
    }

    fn clear(&mut self) -> Result<(), MockFault> {
        self.record(Call::DisplayClear)
    }

    fn display(&mut self, value: f32) -> Result<(), MockFault> {
        self.record(Call::Display(value))
    }
}

impl LedStrip for MockPeripheral<'_> {
    type Error = MockFault;

    fn set_brightness(&mut self, brightness: u8) -> Result<(), MockFault> {
        self.record(Call::Brightness(brightness))
    }

    fn write(&mut self, colors: &[Rgb888]) -> Result<(), MockFault> {
        let mut frame = [Rgb888::BLACK; LED_COUNT];
        frame.copy_from_slice(colors);
        self.record(Call::Leds(frame))
    }
}

impl IconSink for MockPeripheral<'_> {
    type Error = MockFault;

    fn show(&mut self, icon: BarometerIcon) -> Result<(), MockFault> {
        self.record(Call::Icon(icon))
    }
}

impl Speaker for MockPeripheral<'_> {
    type Error = MockFault;

    fn play(&mut self, frequency_hz: f32) -> Result<(), MockFault> {
        self.record(Call::Play(frequency_hz))
    }

    fn stop(&mut self) -> Result<(), MockFault> {
        self.record(Call::SpeakerStop)
    }
}

impl ErrorType for MockPeripheral<'_> {
    type Error = MockFault;
}

impl OutputPin for MockPeripheral<'_> {
    fn set_low(&mut self) -> Result<(), MockFault> {
        self.record(Call::Indicator(false))
    }

    fn set_high(&mut self) -> Result<(), MockFault> {
        self.record(Call::Indicator(true))
    }
}
