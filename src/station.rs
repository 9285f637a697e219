//! Weather station controller
//!
//! [`WeatherStation`] owns the output peripherals and reacts to the events
//! published by the sensor and button drivers:
//! - ambient readings are compensated against the latest CPU temperature
//! - pressure readings redraw the LED gauge and schedule an icon refresh
//! - button edges switch what the numeric display shows
//!
//! All of this runs on one context, the [`run`](WeatherStation::run) loop.
//! The CPU temperature poller is the only other task; it shares nothing with
//! the loop except the [`CpuTemperature`] cell and the [`PollerControl`].

use embassy_futures::select::{Either3, select3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::WaitResult;
use embassy_sync::signal::Signal;
use embassy_time::{Instant, Timer};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_hal::digital::OutputPin;
use log::{debug, error, info, warn};

use crate::app_state::{Diagnostics, RunState, StationError, StationState};
use crate::barometer::BarometricRenderer;
use crate::chime::{ChimeStep, StartupChime};
use crate::compensation::TemperatureCompensator;
use crate::config::{LED_COUNT, StationConfig};
use crate::display_mode::{DisplayMode, DisplayModeController};
use crate::events::{StationChannel, StationEvent, StationSubscription};
use crate::peripherals::{IconSink, LedStrip, NumericDisplay, Peripherals, Speaker};
use crate::sensors::{
    ButtonEdge, CpuTemperature, CpuTemperaturePoller, HeatSourceReader, PollerControl,
};

pub struct WeatherStation<'a, D, L, P, I, S>
where
    D: NumericDisplay,
    L: LedStrip,
    P: OutputPin,
    I: IconSink,
    S: Speaker,
{
    config: StationConfig,
    display: Option<D>,
    led_strip: Option<L>,
    icon: Option<I>,
    speaker: Option<S>,
    mode: DisplayModeController<P>,
    renderer: BarometricRenderer<LED_COUNT>,
    chime: Option<StartupChime>,
    state: StationState,
    cpu_temperature: &'a CpuTemperature,
    poller: &'a PollerControl,
    subscription: Option<StationSubscription<'a>>,
}

impl<'a, D, L, P, I, S> WeatherStation<'a, D, L, P, I, S>
where
    D: NumericDisplay,
    L: LedStrip,
    P: OutputPin,
    I: IconSink,
    S: Speaker,
{
    /// Validate `config` and bring up the peripherals.
    ///
    /// On a configuration error nothing is touched and the poller is told to
    /// stop. A display or LED strip that fails to initialise is logged and
    /// treated as absent from then on.
    pub fn new(
        config: StationConfig,
        peripherals: Peripherals<D, L, P, I, S>,
        cpu_temperature: &'a CpuTemperature,
        poller: &'a PollerControl,
    ) -> Result<Self, StationError> {
        let compensator = match config
            .validate()
            .and_then(|()| TemperatureCompensator::new(config.heating_coefficient))
        {
            Ok(compensator) => compensator,
            Err(e) => {
                error!("Refusing to start weather station: {}", e);
                poller.stop();
                return Err(e.into());
            }
        };

        let Peripherals {
            display,
            led_strip,
            indicator,
            icon,
            speaker,
        } = peripherals;

        let mut station = Self {
            config,
            display,
            led_strip,
            icon,
            speaker,
            mode: DisplayModeController::new(indicator),
            renderer: BarometricRenderer::new(&config),
            chime: None,
            state: StationState::new(compensator),
            cpu_temperature,
            poller,
            subscription: None,
        };
        station.init_peripherals();

        info!(
            "Weather station ready (display: {}, leds: {}, indicator: {}, icon: {}, speaker: {})",
            station.display.is_some(),
            station.led_strip.is_some(),
            station.mode.has_indicator(),
            station.icon.is_some(),
            station.speaker.is_some(),
        );
        Ok(station)
    }

    fn init_peripherals(&mut self) {
        let diagnostics = &mut self.state.diagnostics;

        if let Some(display) = self.display.as_mut() {
            let ready = diagnostics.check("display", "enable", display.set_enabled(true))
                && diagnostics.check("display", "clear", display.clear());
            if !ready {
                warn!("Numeric display unavailable, continuing without it");
                self.display = None;
            }
        }

        if let Some(strip) = self.led_strip.as_mut() {
            let result = strip.set_brightness(self.config.led_brightness);
            if !diagnostics.check("led strip", "set brightness", result) {
                warn!("LED strip unavailable, continuing without it");
                self.led_strip = None;
            }
        }

        diagnostics.check("indicator", "drive line", self.mode.drive_indicator());
    }

    /// Subscribe to `channel` and begin accepting events.
    ///
    /// Calling this on a running station is a no-op. If no subscriber slot is
    /// free the station shuts down and stays down.
    pub fn start(&mut self, channel: &'a StationChannel) -> Result<(), StationError> {
        match self.state.run_state {
            RunState::Running => {
                debug!("Weather station already running");
                return Ok(());
            }
            RunState::ShutDown => return Err(StationError::ShutDown),
            RunState::Idle => {}
        }

        match channel.subscriber() {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(e) => {
                error!("Failed to subscribe to station events: {:?}", e);
                self.shutdown();
                return Err(StationError::Subscription);
            }
        }
        self.state.run_state = RunState::Running;

        if self.config.chime_enabled && self.speaker.is_some() {
            self.chime = Some(StartupChime::new(Instant::now() + self.config.chime_delay()));
        }

        info!("Weather station started");
        Ok(())
    }

    /// Build the CPU temperature poller that feeds this station.
    ///
    /// Run it as its own task; it ends when the station shuts down.
    pub fn poller<R: HeatSourceReader>(&self, reader: R) -> CpuTemperaturePoller<'a, R> {
        CpuTemperaturePoller::new(
            reader,
            self.cpu_temperature,
            self.poller,
            self.config.cpu_poll_period(),
        )
    }

    /// React to one event received at `now`. Ignored after shutdown.
    pub fn handle_event(&mut self, event: StationEvent, now: Instant) {
        if self.state.run_state == RunState::ShutDown {
            debug!("Ignoring {:?} after shutdown", event);
            return;
        }

        match event {
            StationEvent::Ambient(raw) => self.on_ambient(raw),
            StationEvent::Pressure(pressure) => self.on_pressure(pressure, now),
            StationEvent::Button(edge) => self.on_button(edge),
        }
    }

    fn on_ambient(&mut self, raw: f32) {
        // A non-finite value would become the last compensated value and
        // block every later correction
        if !raw.is_finite() {
            warn!("Dropping non-finite ambient reading {}", raw);
            return;
        }

        let cpu = self.cpu_temperature.snapshot();
        let compensated = self.state.compensator.apply(raw, cpu);
        debug!("Ambient {} °C, CPU {} °C -> {} °C", raw, cpu, compensated);

        if self.mode.mode() == DisplayMode::Temperature {
            self.show(compensated);
        }
    }

    fn on_pressure(&mut self, pressure: f32, now: Instant) {
        self.state.last_pressure = pressure;
        debug!("Pressure {} hPa", pressure);

        if self.mode.mode() == DisplayMode::Pressure {
            self.show(pressure);
        }

        let frame = self.renderer.on_pressure(pressure, now);
        if let Some(strip) = self.led_strip.as_mut() {
            self.state
                .diagnostics
                .check("led strip", "write frame", strip.write(&frame));
        }
    }

    fn on_button(&mut self, edge: ButtonEdge) {
        let result = self.mode.on_button(edge).map(|_| ());
        self.state
            .diagnostics
            .check("indicator", "drive line", result);

        // Show the value for the new mode right away instead of waiting for
        // the next reading
        self.show(self.current_value());
    }

    fn current_value(&self) -> f32 {
        match self.mode.mode() {
            DisplayMode::Temperature => self.state.compensated_temperature(),
            DisplayMode::Pressure => self.state.last_pressure,
        }
    }

    fn show(&mut self, value: f32) {
        if let Some(display) = self.display.as_mut() {
            self.state
                .diagnostics
                .check("display", "show value", display.display(value));
        }
    }

    /// Run whatever timed work is due at `now`: the pending icon refresh and
    /// the startup chime.
    pub fn on_timer(&mut self, now: Instant) {
        if let Some(icon) = self.renderer.take_refresh(now, self.state.last_pressure) {
            let shown = match self.icon.as_mut() {
                Some(sink) => self
                    .state
                    .diagnostics
                    .check("icon", "show icon", sink.show(icon)),
                None => true,
            };
            if shown {
                debug!("Barometer icon -> {}", icon.label());
                self.renderer.mark_rendered(icon);
            }
        }

        self.advance_chime(now);
    }

    fn advance_chime(&mut self, now: Instant) {
        let mut done = false;

        if let Some(chime) = self.chime.as_mut() {
            while let Some(step) = chime.advance(now) {
                let Some(speaker) = self.speaker.as_mut() else {
                    done = true;
                    break;
                };
                let result = match step {
                    ChimeStep::Play(hz) => speaker.play(hz),
                    ChimeStep::Stop => speaker.stop(),
                };
                if !self
                    .state
                    .diagnostics
                    .check("speaker", "play startup chime", result)
                {
                    warn!("Abandoning startup chime");
                    done = true;
                    break;
                }
            }
            done |= chime.is_finished();
        }

        if done {
            self.chime = None;
        }
    }

    /// Earliest instant at which [`on_timer`](Self::on_timer) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let chime = self.chime.as_ref().and_then(StartupChime::deadline);
        match (self.renderer.refresh_deadline(), chime) {
            (Some(refresh), Some(chime)) => Some(refresh.min(chime)),
            (refresh, chime) => refresh.or(chime),
        }
    }

    /// Process events and timers until `stop` is signalled, then shut down.
    ///
    /// [`start`](Self::start) must have been called first.
    pub async fn run(&mut self, stop: &Signal<CriticalSectionRawMutex, ()>) {
        info!("Weather station event loop running");

        loop {
            let deadline = self.next_deadline();
            let Some(subscription) = self.subscription.as_mut() else {
                warn!("Event loop has no subscription, was the station started?");
                break;
            };

            let timer = async move {
                match deadline {
                    Some(at) => Timer::at(at).await,
                    None => core::future::pending::<()>().await,
                }
            };

            let woken = select3(subscription.next_message(), timer, stop.wait()).await;
            match woken {
                Either3::First(WaitResult::Message(event)) => {
                    let now = Instant::now();
                    self.handle_event(event, now);
                    // Keep timed work going under a steady stream of events
                    self.on_timer(now);
                }
                Either3::First(WaitResult::Lagged(missed)) => {
                    warn!("Event loop fell behind, {} events dropped", missed);
                }
                Either3::Second(()) => self.on_timer(Instant::now()),
                Either3::Third(()) => {
                    info!("Stop requested");
                    break;
                }
            }
        }

        self.shutdown();
    }

    /// Stop the poller, release the subscription and leave every peripheral
    /// dark. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if self.state.run_state == RunState::ShutDown {
            debug!("Weather station already shut down");
            return;
        }
        info!("Shutting down weather station");

        self.poller.stop();
        if self.subscription.take().is_some() {
            debug!("Released event subscription");
        }
        self.chime = None;

        let diagnostics = &mut self.state.diagnostics;

        if let Some(mut display) = self.display.take() {
            diagnostics.check("display", "clear", display.clear());
            diagnostics.check("display", "disable", display.set_enabled(false));
        }

        if let Some(mut strip) = self.led_strip.take() {
            diagnostics.check("led strip", "set brightness", strip.set_brightness(0));
            diagnostics.check(
                "led strip",
                "write frame",
                strip.write(&[Rgb888::BLACK; LED_COUNT]),
            );
        }

        diagnostics.check("indicator", "release line", self.mode.release());

        if let Some(mut speaker) = self.speaker.take() {
            diagnostics.check("speaker", "stop", speaker.stop());
        }
        self.icon = None;

        self.state.run_state = RunState::ShutDown;
        info!(
            "Weather station shut down ({} write failures)",
            self.state.diagnostics.write_failures
        );
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode.mode()
    }

    pub fn run_state(&self) -> RunState {
        self.state.run_state
    }

    /// Last compensated ambient temperature in °C.
    pub fn compensated_temperature(&self) -> f32 {
        self.state.compensated_temperature()
    }

    /// Last raw pressure in hPa, 0 until the first reading.
    pub fn last_pressure(&self) -> f32 {
        self.state.last_pressure
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.state.diagnostics
    }

    pub fn renderer(&self) -> &BarometricRenderer<LED_COUNT> {
        &self.renderer
    }
}

impl<D, L, P, I, S> Drop for WeatherStation<'_, D, L, P, I, S>
where
    D: NumericDisplay,
    L: LedStrip,
    P: OutputPin,
    I: IconSink,
    S: Speaker,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}
