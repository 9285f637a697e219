//! Pressure to LED gauge mapping
//!
//! Every segment owns a fixed hue from a rainbow spread over the strip. A
//! pressure reading lights the top `n` segments, counted down from the last
//! index, and leaves the rest dark.

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use micromath::F32;

/// Full saturation, full value rainbow with hue `i * 360 / N`.
pub fn rainbow<const N: usize>() -> [Rgb888; N] {
    core::array::from_fn(|i| hsv_to_rgb(i as f32 * 360.0 / N as f32, 1.0, 1.0))
}

/// Convert HSV (hue in degrees, saturation and value in 0..=1) to RGB.
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Rgb888 {
    let mut h = hue % 360.0;
    if h < 0.0 {
        h += 360.0;
    }
    let h = h / 60.0;
    let sector = h as u32;
    let f = h - sector as f32;

    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));

    let (r, g, b) = match sector {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };

    Rgb888::new(channel(r), channel(g), channel(b))
}

fn channel(x: f32) -> u8 {
    // `as` saturates, so out of range inputs clamp to 0..=255
    (x * 255.0 + 0.5) as u8
}

/// Number of lit segments for `pressure` on an `N` segment strip spanning
/// `low..high` hPa.
pub fn lit_segments<const N: usize>(pressure: f32, low: f32, high: f32) -> usize {
    let t = (pressure - low) / (high - low);
    let n = F32(N as f32 * t).ceil().0;

    // NaN falls into the first branch
    if !(n > 0.0) {
        0
    } else if n >= N as f32 {
        N
    } else {
        n as usize
    }
}

/// Build a full frame with the top `lit` segments showing their rainbow hue.
pub fn gauge_frame<const N: usize>(rainbow: &[Rgb888; N], lit: usize) -> [Rgb888; N] {
    let lit = lit.min(N);
    let mut colors = [Rgb888::BLACK; N];
    colors[N - lit..].copy_from_slice(&rainbow[N - lit..]);
    colors
}
