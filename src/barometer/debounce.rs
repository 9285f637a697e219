//! Coalescing of barometer refresh requests
//!
//! At most one refresh is pending at a time. Requests made while a refresh is
//! pending are folded into it; the refresh itself reads whatever pressure is
//! current when it fires.

use embassy_time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct RefreshDebouncer {
    interval: Duration,
    due: Option<Instant>,
}

impl RefreshDebouncer {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            due: None,
        }
    }

    /// Ask for a refresh. Returns `true` if this call scheduled a new one,
    /// `false` if it was coalesced into the pending refresh.
    pub fn request(&mut self, now: Instant) -> bool {
        if self.due.is_some() {
            return false;
        }
        self.due = Some(now + self.interval);
        true
    }

    /// When the pending refresh should fire.
    pub fn deadline(&self) -> Option<Instant> {
        self.due
    }

    /// Fire the pending refresh if it is due, clearing the pending flag.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_schedules_single_refresh() {
        let mut debouncer = RefreshDebouncer::new(Duration::from_millis(100));

        let scheduled = (0..10)
            .filter(|ms| debouncer.request(Instant::from_millis(*ms)))
            .count();

        assert_eq!(scheduled, 1);
        assert_eq!(debouncer.deadline(), Some(Instant::from_millis(100)));
    }

    #[test]
    fn test_fires_once_at_deadline() {
        let mut debouncer = RefreshDebouncer::new(Duration::from_millis(100));
        debouncer.request(Instant::from_millis(0));

        assert!(!debouncer.fire(Instant::from_millis(99)));
        assert!(debouncer.fire(Instant::from_millis(100)));
        assert!(!debouncer.fire(Instant::from_millis(150)));
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn test_new_request_after_fire_schedules_again() {
        let mut debouncer = RefreshDebouncer::new(Duration::from_millis(100));
        debouncer.request(Instant::from_millis(0));
        debouncer.fire(Instant::from_millis(100));

        assert!(debouncer.request(Instant::from_millis(120)));
        assert_eq!(debouncer.deadline(), Some(Instant::from_millis(220)));
    }
}
