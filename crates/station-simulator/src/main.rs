//! Desktop simulator for the weather station controller.
//!
//! Runs the real [`WeatherStation`] event loop against an SDL2 window via
//! `embedded-graphics-simulator`, with the CPU temperature poller on a worker
//! thread of its own. Ambient and pressure readings are synthetic; the CPU
//! temperature comes from the host's first thermal zone when there is one.
//!
//! # Key bindings
//!
//! | Key         | Action                          |
//! |-------------|---------------------------------|
//! | Space (hold)| Mode button: show pressure      |
//! | Q / Esc     | Quit                            |
//!
//! Set `STATION_CONFIG` to the path of a postcard-encoded `StationConfig` to
//! override the defaults.

use std::cell::RefCell;
use std::convert::Infallible;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::rc::Rc;

use embassy_futures::block_on;
use embassy_futures::join::join;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, PrimitiveStyle};
use embedded_graphics::text::Text;
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
};
use log::{debug, error, info, warn};

use weather_station::barometer::BarometerIcon;
use weather_station::config::LED_COUNT;
use weather_station::events::ButtonEdge;
use weather_station::peripherals::{IconSink, LedStrip, NumericDisplay, Speaker};
use weather_station::sensors::{
    CpuTemperature, HeatSourceReader, PollerControl, SensorError, parse_millidegrees,
};
use weather_station::{Peripherals, StationChannel, StationConfig, StationEvent, WeatherStation};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const PANEL_WIDTH_PX: u32 = 240;
const PANEL_HEIGHT_PX: u32 = 160;

/// Pixel scale factor for the simulator window.
const WINDOW_SCALE: u32 = 3;

/// Target frame duration (~30 FPS).
const FRAME_DURATION: Duration = Duration::from_millis(33);

/// Interval between synthetic ambient/pressure samples.
const MOCK_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

// ---------------------------------------------------------------------------
// Simulated panel
// ---------------------------------------------------------------------------

/// Everything the station has written to its outputs so far.
struct PanelState {
    display_enabled: bool,
    value: Option<f32>,
    brightness: u8,
    leds: [Rgb888; LED_COUNT],
    indicator: bool,
    icon: Option<BarometerIcon>,
    tone_hz: Option<f32>,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            display_enabled: false,
            value: None,
            brightness: 0,
            leds: [Rgb888::BLACK; LED_COUNT],
            indicator: false,
            icon: None,
            tone_hz: None,
        }
    }
}

type Panel = Rc<RefCell<PanelState>>;

struct SimDisplay(Panel);
struct SimLedStrip(Panel);
struct SimIndicator(Panel);
struct SimIcon(Panel);
struct SimSpeaker(Panel);

impl NumericDisplay for SimDisplay {
    type Error = Infallible;

    fn set_enabled(&mut self, enabled: bool) -> Result<(), Infallible> {
        self.0.borrow_mut().display_enabled = enabled;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().value = None;
        Ok(())
    }

    fn display(&mut self, value: f32) -> Result<(), Infallible> {
        self.0.borrow_mut().value = Some(value);
        Ok(())
    }
}

impl LedStrip for SimLedStrip {
    type Error = Infallible;

    fn set_brightness(&mut self, brightness: u8) -> Result<(), Infallible> {
        self.0.borrow_mut().brightness = brightness;
        Ok(())
    }

    fn write(&mut self, colors: &[Rgb888]) -> Result<(), Infallible> {
        let mut panel = self.0.borrow_mut();
        for (led, color) in panel.leds.iter_mut().zip(colors) {
            *led = *color;
        }
        Ok(())
    }
}

impl embedded_hal::digital::ErrorType for SimIndicator {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for SimIndicator {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().indicator = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().indicator = true;
        Ok(())
    }
}

impl IconSink for SimIcon {
    type Error = Infallible;

    fn show(&mut self, icon: BarometerIcon) -> Result<(), Infallible> {
        info!("Weather icon: {}", icon.label());
        self.0.borrow_mut().icon = Some(icon);
        Ok(())
    }
}

impl Speaker for SimSpeaker {
    type Error = Infallible;

    fn play(&mut self, frequency_hz: f32) -> Result<(), Infallible> {
        debug!("Speaker: {:.0} Hz", frequency_hz);
        self.0.borrow_mut().tone_hz = Some(frequency_hz);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Infallible> {
        debug!("Speaker: off");
        self.0.borrow_mut().tone_hz = None;
        Ok(())
    }
}

fn draw_panel(panel: &PanelState, display: &mut SimulatorDisplay<Rgb888>) {
    let _ = display.clear(Rgb888::BLACK);

    let large = MonoTextStyle::new(&FONT_10X20, Rgb888::new(255, 64, 32));
    let small = MonoTextStyle::new(&FONT_6X10, Rgb888::WHITE);

    if panel.display_enabled {
        if let Some(value) = panel.value {
            let text = format!("{:7.2}", value);
            let _ = Text::new(&text, Point::new(20, 30), large).draw(display);
        }
    }

    for (i, color) in panel.leds.iter().enumerate() {
        let fill = if panel.brightness == 0 {
            Rgb888::BLACK
        } else {
            *color
        };
        let _ = Circle::new(Point::new(12 + i as i32 * 32, 56), 24)
            .into_styled(PrimitiveStyle::with_fill(fill))
            .draw(display);
        let _ = Circle::new(Point::new(12 + i as i32 * 32, 56), 24)
            .into_styled(PrimitiveStyle::with_stroke(Rgb888::new(64, 64, 64), 1))
            .draw(display);
    }

    let icon = panel.icon.map_or("-", BarometerIcon::label);
    let _ = Text::new(&format!("Weather: {}", icon), Point::new(20, 108), small).draw(display);

    let indicator = if panel.indicator {
        Rgb888::new(0, 200, 0)
    } else {
        Rgb888::new(40, 40, 40)
    };
    let _ = Circle::new(Point::new(20, 124), 10)
        .into_styled(PrimitiveStyle::with_fill(indicator))
        .draw(display);
    let _ = Text::new("pressure mode", Point::new(36, 132), small).draw(display);

    if let Some(hz) = panel.tone_hz {
        let _ = Text::new(&format!("~ {:.0} Hz", hz), Point::new(20, 150), small).draw(display);
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// CPU temperature from the host thermal zone, or a synthetic curve when the
/// host does not expose one.
enum HostHeatSource {
    ThermalZone(PathBuf),
    Synthetic { elapsed_secs: f32 },
}

impl HostHeatSource {
    fn detect() -> Self {
        let path = PathBuf::from(THERMAL_ZONE);
        if path.exists() {
            info!("Reading CPU temperature from {}", path.display());
            Self::ThermalZone(path)
        } else {
            warn!("{} not found, using a synthetic CPU temperature", THERMAL_ZONE);
            Self::Synthetic { elapsed_secs: 0.0 }
        }
    }
}

impl HeatSourceReader for HostHeatSource {
    async fn read(&mut self) -> Result<f32, SensorError> {
        match self {
            Self::ThermalZone(path) => {
                let raw = std::fs::read_to_string(&*path).map_err(|e| SensorError::ReadFailed {
                    sensor: "CPU",
                    operation: "read thermal zone",
                    details: io_error_details(e.kind()),
                })?;
                parse_millidegrees(&raw)
            }
            Self::Synthetic { elapsed_secs } => {
                *elapsed_secs += 0.05;
                Ok(48.0 + 6.0 * (*elapsed_secs / 20.0).sin())
            }
        }
    }
}

fn io_error_details(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound => "thermal zone disappeared",
        ErrorKind::PermissionDenied => "permission denied",
        ErrorKind::Interrupted => "read interrupted",
        _ => "I/O error",
    }
}

/// Generates ambient and pressure readings that drift through every icon.
struct MockWeather {
    elapsed_secs: f32,
}

impl MockWeather {
    fn new() -> Self {
        Self { elapsed_secs: 0.0 }
    }

    /// Advance the internal clock and return `(raw ambient °C, pressure hPa)`.
    fn next_sample(&mut self, dt_secs: f32) -> (f32, f32) {
        self.elapsed_secs += dt_secs;
        let t = self.elapsed_secs;

        // Raw reading includes CPU heat bleed, hence well above room temperature
        let ambient = 33.0 + 1.5 * (t / 90.0).sin() + 0.2 * (t / 7.0).cos();

        // 970–1030 hPa over a two minute cycle
        let pressure = 1000.0 + 30.0 * (t / 19.0).sin();

        (ambient, pressure)
    }
}

fn load_config() -> StationConfig {
    let Some(path) = std::env::var_os("STATION_CONFIG") else {
        return StationConfig::default();
    };

    match std::fs::read(&path) {
        Ok(bytes) => match StationConfig::from_bytes(&bytes) {
            Ok(config) => {
                info!("Loaded station config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("Ignoring station config {:?}: {}", path, e);
                StationConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read station config {:?}: {}", path, e);
            StationConfig::default()
        }
    }
}

// ---------------------------------------------------------------------------
// UI loop
// ---------------------------------------------------------------------------

/// Pump SDL events into the station channel and redraw the panel until the
/// window is closed, then signal `stop`.
async fn ui_loop(
    panel: &Panel,
    channel: &StationChannel,
    stop: &Signal<CriticalSectionRawMutex, ()>,
) {
    let publisher = channel.immediate_publisher();

    let mut display =
        SimulatorDisplay::<Rgb888>::new(Size::new(PANEL_WIDTH_PX, PANEL_HEIGHT_PX));
    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    let mut window = Window::new("Weather Station Simulator", &output_settings);

    // The SDL window is lazily initialized on the first `update()` call.
    // We must call `update()` once before `events()` or it will panic.
    draw_panel(&panel.borrow(), &mut display);
    window.update(&display);

    let mut weather = MockWeather::new();
    let mut last_sample = Instant::now();

    'running: loop {
        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'running,

                SimulatorEvent::KeyDown {
                    keycode, repeat, ..
                } => {
                    if keycode == Keycode::Q || keycode == Keycode::Escape {
                        break 'running;
                    }
                    if keycode == Keycode::Space && !repeat {
                        publisher.publish_immediate(StationEvent::Button(ButtonEdge::Pressed));
                    }
                }

                SimulatorEvent::KeyUp { keycode, .. } if keycode == Keycode::Space => {
                    publisher.publish_immediate(StationEvent::Button(ButtonEdge::Released));
                }

                _ => {}
            }
        }

        if last_sample.elapsed() >= MOCK_SAMPLE_INTERVAL {
            let dt_secs = MOCK_SAMPLE_INTERVAL.as_millis() as f32 / 1000.0;
            let (ambient, pressure) = weather.next_sample(dt_secs);
            publisher.publish_immediate(StationEvent::Ambient(ambient));
            publisher.publish_immediate(StationEvent::Pressure(pressure));
            last_sample = Instant::now();
        }

        draw_panel(&panel.borrow(), &mut display);
        window.update(&display);

        Timer::after(FRAME_DURATION).await;
    }

    stop.signal(());
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting weather station simulator");
    info!("Keys: Space=show pressure (hold)  Q=Quit");

    let config = load_config();
    let cpu_temperature = CpuTemperature::new();
    let poller_control = PollerControl::new();
    let channel = StationChannel::new();
    let stop = Signal::<CriticalSectionRawMutex, ()>::new();

    let panel: Panel = Rc::default();
    let peripherals = Peripherals {
        display: Some(SimDisplay(panel.clone())),
        led_strip: Some(SimLedStrip(panel.clone())),
        indicator: Some(SimIndicator(panel.clone())),
        icon: Some(SimIcon(panel.clone())),
        speaker: Some(SimSpeaker(panel.clone())),
    };

    let mut station =
        match WeatherStation::new(config, peripherals, &cpu_temperature, &poller_control) {
            Ok(station) => station,
            Err(e) => {
                error!("Failed to create weather station: {}", e);
                return;
            }
        };
    let mut poller = station.poller(HostHeatSource::detect());

    if let Err(e) = station.start(&channel) {
        error!("Failed to start weather station: {}", e);
        return;
    }
    debug!("Station config: {:?}", station.config());

    // The thermal zone read blocks, so the poller gets its own thread and
    // the event loop keeps running while a read is in flight
    std::thread::scope(|scope| {
        scope.spawn(move || block_on(poller.run()));
        block_on(join(station.run(&stop), ui_loop(&panel, &channel, &stop)));
    });

    let diagnostics = station.diagnostics();
    info!(
        "Simulator exiting ({} write failures)",
        diagnostics.write_failures
    );
}
