//! Startup chime
//!
//! A short rising slide on the speaker to signal the station is up. The chime
//! is a timed sequence of steps; the station's event loop wakes at each
//! [`StartupChime::deadline`] and forwards the due step to the speaker, so
//! playing it never holds up sensor events.

use embassy_time::{Duration, Instant};

pub const CHIME_START_HZ: f32 = 440.0;
pub const CHIME_END_HZ: f32 = 440.0 * 4.0;

/// Length of one slide from start to end frequency.
const SWEEP_MS: u64 = 50;
/// One initial slide plus five repeats.
const SWEEPS: u32 = 6;
const STEPS_PER_SWEEP: u32 = 10;
const TOTAL_STEPS: u32 = SWEEPS * STEPS_PER_SWEEP;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChimeStep {
    Play(f32),
    Stop,
}

#[derive(Debug, Clone, Copy)]
pub struct StartupChime {
    start: Instant,
    step: u32,
}

impl StartupChime {
    /// Schedule the first note at `start`.
    pub fn new(start: Instant) -> Self {
        Self { start, step: 0 }
    }

    fn step_duration() -> Duration {
        Duration::from_millis(SWEEP_MS / STEPS_PER_SWEEP as u64)
    }

    /// When the next step is due, or `None` once the speaker was stopped.
    pub fn deadline(&self) -> Option<Instant> {
        if self.is_finished() {
            None
        } else {
            Some(self.start + Self::step_duration() * self.step)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.step > TOTAL_STEPS
    }

    /// Take the next step if it is due at `now`.
    pub fn advance(&mut self, now: Instant) -> Option<ChimeStep> {
        let due = self.deadline()?;
        if now < due {
            return None;
        }

        let step = self.step;
        self.step += 1;

        if step == TOTAL_STEPS {
            Some(ChimeStep::Stop)
        } else {
            let progress = (step % STEPS_PER_SWEEP) as f32 / STEPS_PER_SWEEP as f32;
            Some(ChimeStep::Play(
                CHIME_START_HZ + (CHIME_END_HZ - CHIME_START_HZ) * progress,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_plays_before_start() {
        let mut chime = StartupChime::new(Instant::from_millis(300));
        assert_eq!(chime.advance(Instant::from_millis(299)), None);
        assert_eq!(chime.deadline(), Some(Instant::from_millis(300)));
    }

    #[test]
    fn test_slide_rises_and_repeats() {
        let mut chime = StartupChime::new(Instant::from_millis(0));

        assert_eq!(
            chime.advance(Instant::from_millis(0)),
            Some(ChimeStep::Play(440.0))
        );
        assert_eq!(chime.deadline(), Some(Instant::from_millis(5)));

        let mut previous = 440.0;
        for step in 1..10u64 {
            match chime.advance(Instant::from_millis(step * 5)) {
                Some(ChimeStep::Play(hz)) => {
                    assert!(hz > previous);
                    assert!(hz < CHIME_END_HZ);
                    previous = hz;
                }
                other => panic!("unexpected step {:?}", other),
            }
        }

        // Second sweep starts over at the base frequency
        assert_eq!(
            chime.advance(Instant::from_millis(50)),
            Some(ChimeStep::Play(440.0))
        );
    }

    #[test]
    fn test_ends_with_stop() {
        let mut chime = StartupChime::new(Instant::from_millis(0));
        let end = Instant::from_millis(10_000);

        let mut plays = 0;
        let mut last = None;
        while let Some(step) = chime.advance(end) {
            if let ChimeStep::Play(_) = step {
                plays += 1;
            }
            last = Some(step);
        }

        assert_eq!(plays, 60);
        assert_eq!(last, Some(ChimeStep::Stop));
        assert!(chime.is_finished());
        assert_eq!(chime.deadline(), None);
    }
}
