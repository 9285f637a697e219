//! CPU temperature sampling
//!
//! The poller runs as its own task so a slow thermal read never stalls the
//! station's event loop. Only the final value is shared: it is published into
//! a [`CpuTemperature`] cell with a single atomic store, last sample wins.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use log::{debug, info, warn};

use super::{HeatSourceReader, SensorError};

/// Latest CPU temperature in °C, stored as raw `f32` bits.
///
/// Readers always get a complete value and never wait on the writer.
pub struct CpuTemperature {
    bits: AtomicU32,
}

impl CpuTemperature {
    /// Starts at 0 °C until the first successful read.
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
        }
    }

    pub fn publish(&self, celsius: f32) {
        self.bits.store(celsius.to_bits(), Ordering::Release);
    }

    pub fn snapshot(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }
}

impl Default for CpuTemperature {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation shared between the station and its poller task.
pub struct PollerControl {
    stopped: AtomicBool,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl PollerControl {
    pub const fn new() -> Self {
        Self {
            stopped: AtomicBool::new(false),
            wake: Signal::new(),
        }
    }

    /// Stop the poller. No further tick fires after this returns; a read that
    /// is already in flight completes but its value is dropped.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.wake.signal(());
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    async fn wait_for_stop(&self) {
        if self.is_stopped() {
            return;
        }
        self.wake.wait().await;
    }
}

impl Default for PollerControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodically reads the heat source and publishes into [`CpuTemperature`].
///
/// Every tick is an independent attempt: a failed read is logged, the
/// previous value stays published and the next tick is scheduled as usual.
pub struct CpuTemperaturePoller<'a, R> {
    reader: R,
    temperature: &'a CpuTemperature,
    control: &'a PollerControl,
    period: Duration,
    read_failures: u32,
}

impl<'a, R: HeatSourceReader> CpuTemperaturePoller<'a, R> {
    pub fn new(
        reader: R,
        temperature: &'a CpuTemperature,
        control: &'a PollerControl,
        period: Duration,
    ) -> Self {
        Self {
            reader,
            temperature,
            control,
            period,
            read_failures: 0,
        }
    }

    /// Number of failed reads since the poller was created.
    pub fn read_failures(&self) -> u32 {
        self.read_failures
    }

    /// Perform a single read. Returns `true` if a new value was published.
    pub async fn poll_once(&mut self) -> bool {
        let result = self.reader.read().await.and_then(|celsius| {
            if celsius.is_finite() {
                Ok(celsius)
            } else {
                Err(SensorError::Malformed { sensor: "CPU" })
            }
        });

        match result {
            Ok(_) if self.control.is_stopped() => {
                debug!("Discarding CPU temperature read completed after shutdown");
                false
            }
            Ok(celsius) => {
                self.temperature.publish(celsius);
                debug!("CPU temperature: {}", celsius);
                true
            }
            Err(e) => {
                self.read_failures = self.read_failures.wrapping_add(1);
                warn!("CPU temperature read failed: {}", e);
                false
            }
        }
    }

    /// Poll until [`PollerControl::stop`] is called.
    pub async fn run(&mut self) {
        info!(
            "CPU temperature poller started ({} ms period)",
            self.period.as_millis()
        );

        while !self.control.is_stopped() {
            self.poll_once().await;

            if let Either::Second(()) =
                select(Timer::after(self.period), self.control.wait_for_stop()).await
            {
                break;
            }
        }

        info!(
            "CPU temperature poller stopped after {} failed reads",
            self.read_failures
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    /// Replays a fixed script of results; `None` is a failed read.
    struct ScriptedReader<'a> {
        script: &'static [Option<f32>],
        reads: usize,
        control: &'a PollerControl,
        stop_after: usize,
    }

    impl HeatSourceReader for ScriptedReader<'_> {
        async fn read(&mut self) -> Result<f32, SensorError> {
            let step = self.script[self.reads % self.script.len()];
            self.reads += 1;
            if self.reads == self.stop_after {
                // Shutdown lands while this read is in flight
                self.control.stop();
            }
            step.ok_or(SensorError::ReadFailed {
                sensor: "CPU",
                operation: "read thermal zone",
                details: "scripted failure",
            })
        }
    }

    #[test]
    fn test_snapshot_starts_at_zero_and_tracks_last_publish() {
        let temperature = CpuTemperature::new();
        assert_eq!(temperature.snapshot(), 0.0);
        temperature.publish(41.5);
        temperature.publish(43.25);
        assert_eq!(temperature.snapshot(), 43.25);
    }

    #[test]
    fn test_failed_read_keeps_previous_value_and_loop_continues() {
        static SCRIPT: [Option<f32>; 4] = [None, Some(48.5), None, Some(99.0)];
        let temperature = CpuTemperature::new();
        let control = PollerControl::new();
        let reader = ScriptedReader {
            script: &SCRIPT,
            reads: 0,
            control: &control,
            stop_after: 4,
        };
        let mut poller =
            CpuTemperaturePoller::new(reader, &temperature, &control, Duration::from_millis(1));

        block_on(poller.run());

        assert_eq!(poller.reader.reads, 4);
        assert_eq!(poller.read_failures(), 2);
        // The 4th read finished after stop() and was discarded
        assert_eq!(temperature.snapshot(), 48.5);
    }

    #[test]
    fn test_stopped_poller_never_reads() {
        static SCRIPT: [Option<f32>; 1] = [Some(50.0)];
        let temperature = CpuTemperature::new();
        let control = PollerControl::new();
        control.stop();
        let reader = ScriptedReader {
            script: &SCRIPT,
            reads: 0,
            control: &control,
            stop_after: usize::MAX,
        };
        let mut poller =
            CpuTemperaturePoller::new(reader, &temperature, &control, Duration::from_millis(1));

        block_on(poller.run());

        assert_eq!(poller.reader.reads, 0);
        assert_eq!(temperature.snapshot(), 0.0);
    }

    #[test]
    fn test_non_finite_read_counts_as_failure() {
        static SCRIPT: [Option<f32>; 1] = [Some(f32::NAN)];
        let temperature = CpuTemperature::new();
        temperature.publish(40.0);
        let control = PollerControl::new();
        let reader = ScriptedReader {
            script: &SCRIPT,
            reads: 0,
            control: &control,
            stop_after: usize::MAX,
        };
        let mut poller =
            CpuTemperaturePoller::new(reader, &temperature, &control, Duration::from_millis(1));

        assert!(!block_on(poller.poll_once()));
        assert_eq!(poller.read_failures(), 1);
        assert_eq!(temperature.snapshot(), 40.0);
    }
}
