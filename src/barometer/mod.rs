//! Barometer rendering
//!
//! Each pressure reading produces two outputs:
//! - a full LED gauge frame, recomputed on every call
//! - a request for a weather icon refresh, coalesced so the icon sink sees at
//!   most one update per refresh interval and only when the icon changes

pub mod debounce;
pub mod gradient;

pub use debounce::RefreshDebouncer;

use embassy_time::Instant;
use embedded_graphics::pixelcolor::Rgb888;
use log::debug;

use crate::config::StationConfig;

/// Weather icon chosen from the barometric pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarometerIcon {
    Sunny,
    Cloudy,
    Rainy,
}

impl BarometerIcon {
    /// Pick the icon for `pressure` hPa. Both thresholds are exclusive:
    /// exactly `sunny_above` or `rainy_below` is still cloudy.
    pub fn select(pressure: f32, sunny_above: f32, rainy_below: f32) -> Self {
        if pressure > sunny_above {
            Self::Sunny
        } else if pressure < rainy_below {
            Self::Rainy
        } else {
            Self::Cloudy
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::Cloudy => "cloudy",
            Self::Rainy => "rainy",
        }
    }
}

pub struct BarometricRenderer<const N: usize> {
    rainbow: [Rgb888; N],
    low: f32,
    high: f32,
    sunny_above: f32,
    rainy_below: f32,
    refresh: RefreshDebouncer,
    rendered_icon: Option<BarometerIcon>,
}

impl<const N: usize> BarometricRenderer<N> {
    /// `config` is expected to be validated already.
    pub fn new(config: &StationConfig) -> Self {
        Self {
            rainbow: gradient::rainbow(),
            low: config.pressure_low_hpa,
            high: config.pressure_high_hpa,
            sunny_above: config.sunny_above_hpa,
            rainy_below: config.rainy_below_hpa,
            refresh: RefreshDebouncer::new(config.barometer_refresh_interval()),
            rendered_icon: None,
        }
    }

    pub fn rainbow(&self) -> &[Rgb888; N] {
        &self.rainbow
    }

    /// Handle a new pressure reading: schedule an icon refresh unless one is
    /// already pending, and return the LED frame for this pressure.
    pub fn on_pressure(&mut self, pressure: f32, now: Instant) -> [Rgb888; N] {
        if self.refresh.request(now) {
            debug!("Barometer refresh scheduled");
        }
        self.frame(pressure)
    }

    pub fn lit_segments(&self, pressure: f32) -> usize {
        gradient::lit_segments::<N>(pressure, self.low, self.high)
    }

    pub fn frame(&self, pressure: f32) -> [Rgb888; N] {
        gradient::gauge_frame(&self.rainbow, self.lit_segments(pressure))
    }

    pub fn icon_for(&self, pressure: f32) -> BarometerIcon {
        BarometerIcon::select(pressure, self.sunny_above, self.rainy_below)
    }

    pub fn refresh_deadline(&self) -> Option<Instant> {
        self.refresh.deadline()
    }

    /// Fire the pending refresh if it is due.
    ///
    /// Returns the icon to push to the sink, or `None` when nothing is due or
    /// the icon for `pressure` is already on screen. Call
    /// [`mark_rendered`](Self::mark_rendered) once the sink accepted it.
    pub fn take_refresh(&mut self, now: Instant, pressure: f32) -> Option<BarometerIcon> {
        if !self.refresh.fire(now) {
            return None;
        }
        let icon = self.icon_for(pressure);
        if self.rendered_icon == Some(icon) {
            None
        } else {
            Some(icon)
        }
    }

    pub fn mark_rendered(&mut self, icon: BarometerIcon) {
        self.rendered_icon = Some(icon);
    }

    pub fn rendered_icon(&self) -> Option<BarometerIcon> {
        self.rendered_icon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::*;

    fn renderer() -> BarometricRenderer<7> {
        BarometricRenderer::new(&StationConfig::default())
    }

    #[test]
    fn test_icon_thresholds() {
        assert_eq!(BarometerIcon::select(1020.0, 1010.0, 990.0), BarometerIcon::Sunny);
        assert_eq!(BarometerIcon::select(980.0, 1010.0, 990.0), BarometerIcon::Rainy);
        assert_eq!(BarometerIcon::select(1000.0, 1010.0, 990.0), BarometerIcon::Cloudy);
        assert_eq!(BarometerIcon::select(1010.0, 1010.0, 990.0), BarometerIcon::Cloudy);
        assert_eq!(BarometerIcon::select(990.0, 1010.0, 990.0), BarometerIcon::Cloudy);
    }

    #[test]
    fn test_burst_of_readings_refreshes_once_with_latest_pressure() {
        let mut renderer = renderer();

        // 10 readings within 10 ms, drifting from sunny into rainy
        for i in 0..10u64 {
            renderer.on_pressure(1020.0 - 5.0 * i as f32, Instant::from_millis(i));
        }
        let latest = 975.0;
        assert_eq!(renderer.refresh_deadline(), Some(Instant::from_millis(100)));

        assert_eq!(renderer.take_refresh(Instant::from_millis(50), latest), None);
        assert_eq!(
            renderer.take_refresh(Instant::from_millis(100), latest),
            Some(BarometerIcon::Rainy)
        );
        assert_eq!(renderer.refresh_deadline(), None);
        assert_eq!(renderer.take_refresh(Instant::from_millis(200), latest), None);
    }

    #[test]
    fn test_same_icon_is_not_rendered_twice() {
        let mut renderer = renderer();

        renderer.on_pressure(1020.0, Instant::from_millis(0));
        let icon = renderer.take_refresh(Instant::from_millis(100), 1020.0);
        assert_eq!(icon, Some(BarometerIcon::Sunny));
        renderer.mark_rendered(BarometerIcon::Sunny);

        renderer.on_pressure(1025.0, Instant::from_millis(150));
        assert_eq!(renderer.take_refresh(Instant::from_millis(250), 1025.0), None);

        renderer.on_pressure(1000.0, Instant::from_millis(300));
        assert_eq!(
            renderer.take_refresh(Instant::from_millis(400), 1000.0),
            Some(BarometerIcon::Cloudy)
        );
    }

    #[test]
    fn test_unconfirmed_icon_is_offered_again() {
        let mut renderer = renderer();

        renderer.on_pressure(980.0, Instant::from_millis(0));
        assert_eq!(
            renderer.take_refresh(Instant::from_millis(100), 980.0),
            Some(BarometerIcon::Rainy)
        );

        // Sink failed, so nothing was marked rendered
        renderer.on_pressure(980.0, Instant::from_millis(120));
        assert_eq!(
            renderer.take_refresh(Instant::from_millis(220), 980.0),
            Some(BarometerIcon::Rainy)
        );
    }

    #[test]
    fn test_frame_is_rewritten_in_full() {
        let mut renderer = renderer();

        let full = renderer.on_pressure(1035.0, Instant::from_millis(0));
        assert_eq!(&full, renderer.rainbow());

        let half = renderer.on_pressure(1000.0, Instant::from_millis(1));
        assert_eq!(renderer.lit_segments(1000.0), 4);
        assert_eq!(&half[..3], &[Rgb888::BLACK; 3]);
        assert_eq!(&half[3..], &renderer.rainbow()[3..]);

        let dark = renderer.on_pressure(965.0, Instant::from_millis(2));
        assert_eq!(dark, [Rgb888::BLACK; 7]);
    }
}
