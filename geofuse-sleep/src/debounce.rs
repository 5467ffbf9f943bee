//! Suppression of repeated resume triggers.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Keeps a monotonically updated last-action timestamp and admits a new
/// action only once the window has elapsed since the previous one.
#[derive(Debug)]
pub(crate) struct Debouncer {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

impl Debouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    /// Whether an action at `now` should fire. Commits `now` as the new
    /// last-action timestamp when it does.
    pub(crate) fn should_fire(&self, now: Instant) -> bool {
        let mut last = self.last.lock();
        match *last {
            Some(previous) if now.duration_since(previous) < self.window => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_action_always_fires() {
        let debouncer = Debouncer::new(Duration::from_secs(2));
        assert!(debouncer.should_fire(Instant::now()));
    }

    #[test]
    fn duplicate_inside_window_is_suppressed() {
        let debouncer = Debouncer::new(Duration::from_secs(2));
        let start = Instant::now();

        assert!(debouncer.should_fire(start));
        assert!(!debouncer.should_fire(start + Duration::from_millis(500)));
    }

    #[test]
    fn action_after_window_fires_again() {
        let debouncer = Debouncer::new(Duration::from_secs(2));
        let start = Instant::now();

        assert!(debouncer.should_fire(start));
        assert!(debouncer.should_fire(start + Duration::from_secs(3)));
    }

    #[test]
    fn suppressed_action_does_not_extend_the_window() {
        let debouncer = Debouncer::new(Duration::from_secs(2));
        let start = Instant::now();

        assert!(debouncer.should_fire(start));
        // Ignored duplicate at +1s must not push the window forward.
        assert!(!debouncer.should_fire(start + Duration::from_secs(1)));
        assert!(debouncer.should_fire(start + Duration::from_millis(2500)));
    }
}
