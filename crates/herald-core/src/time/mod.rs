//! # Time Module
//!
//! Monotonic clock abstraction for the broker.
//!
//! Sensitivity debouncing and wait deadlines both compare monotonic instants.
//! The broker takes its instants from a [`Clock`] so that debounce and
//! timeout logic can be unit-tested deterministically:
//!
//! - [`SystemClock`] — production clock backed by [`Instant::now`]
//! - [`ManualClock`] — test clock advanced explicitly, no sleeping
//!
//! ```rust
//! use herald_core::time::{Clock, ManualClock};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let t0 = clock.now();
//! clock.advance(Duration::from_millis(250));
//! assert_eq!(clock.now() - t0, Duration::from_millis(250));
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of monotonic instants for debounce and deadline evaluation.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current monotonic instant.
    fn now(&self) -> Instant;
}

/// Production clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Starts at an arbitrary base instant; [`advance`](Self::advance) moves it
/// forward. Never moves backwards.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Creates a clock pinned at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Advances the clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        *self.offset.lock() += delta;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        let t0 = clock.now();

        // Stands still until advanced
        assert_eq!(clock.now(), t0);

        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now() - t0, Duration::from_secs(5));

        clock.advance(Duration::from_millis(1));
        assert_eq!(clock.now() - t0, Duration::from_millis(5001));
    }
}
