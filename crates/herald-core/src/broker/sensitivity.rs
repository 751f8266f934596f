//! Sensitivity Filter — debounce policy for bursty signaling.
//!
//! A repeated signal on the same alert name within the configured window is
//! dropped at commit time instead of being fanned out. This is a coarse,
//! broker-wide debounce: it bounds load under signal storms on a hot name,
//! accepting that a burst collapses into one delivered signal.
//!
//! Not internally synchronized; lives inside the broker state mutex.

use std::time::{Duration, Instant};

use fxhash::FxHashMap;

/// Per-name debounce state with a process-wide threshold.
#[derive(Debug)]
pub struct SensitivityFilter {
    threshold: Duration,
    last_delivered: FxHashMap<String, Instant>,
}

impl SensitivityFilter {
    /// Creates a filter with the given suppression window.
    #[must_use]
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_delivered: FxHashMap::default(),
        }
    }

    /// Returns `true` if a signal on `name` at `now` falls inside the
    /// suppression window of the previous delivery.
    ///
    /// When the signal passes, `now` is recorded as the new last-delivery
    /// instant for `name`.
    pub fn should_suppress(&mut self, name: &str, now: Instant) -> bool {
        if let Some(&last) = self.last_delivered.get(name) {
            if now.saturating_duration_since(last) < self.threshold {
                return true;
            }
        }
        self.last_delivered.insert(name.to_owned(), now);
        false
    }

    /// Updates the suppression window. Applies to future evaluations only.
    pub fn set_threshold(&mut self, threshold: Duration) {
        self.threshold = threshold;
    }

    /// Current suppression window.
    #[must_use]
    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{Clock, ManualClock};

    #[test]
    fn test_first_signal_passes() {
        let clock = ManualClock::new();
        let mut filter = SensitivityFilter::new(Duration::from_millis(100));
        assert!(!filter.should_suppress("x", clock.now()));
    }

    #[test]
    fn test_repeat_inside_window_suppressed() {
        let clock = ManualClock::new();
        let mut filter = SensitivityFilter::new(Duration::from_millis(100));

        assert!(!filter.should_suppress("x", clock.now()));
        clock.advance(Duration::from_millis(50));
        assert!(filter.should_suppress("x", clock.now()));

        // Suppressed signals do not refresh the window
        clock.advance(Duration::from_millis(60));
        assert!(!filter.should_suppress("x", clock.now()));
    }

    #[test]
    fn test_repeat_outside_window_passes() {
        let clock = ManualClock::new();
        let mut filter = SensitivityFilter::new(Duration::from_millis(100));

        assert!(!filter.should_suppress("x", clock.now()));
        clock.advance(Duration::from_millis(100));
        assert!(!filter.should_suppress("x", clock.now()));
    }

    #[test]
    fn test_names_tracked_independently() {
        let clock = ManualClock::new();
        let mut filter = SensitivityFilter::new(Duration::from_millis(100));

        assert!(!filter.should_suppress("x", clock.now()));
        assert!(!filter.should_suppress("y", clock.now()));
        assert!(filter.should_suppress("x", clock.now()));
    }

    #[test]
    fn test_zero_threshold_never_suppresses() {
        let clock = ManualClock::new();
        let mut filter = SensitivityFilter::new(Duration::ZERO);

        assert!(!filter.should_suppress("x", clock.now()));
        assert!(!filter.should_suppress("x", clock.now()));
    }

    #[test]
    fn test_set_threshold_applies_forward() {
        let clock = ManualClock::new();
        let mut filter = SensitivityFilter::new(Duration::from_millis(100));

        assert!(!filter.should_suppress("x", clock.now()));
        clock.advance(Duration::from_millis(50));
        assert!(filter.should_suppress("x", clock.now()));

        filter.set_threshold(Duration::from_millis(10));
        assert_eq!(filter.threshold(), Duration::from_millis(10));
        assert!(!filter.should_suppress("x", clock.now()));
    }
}
