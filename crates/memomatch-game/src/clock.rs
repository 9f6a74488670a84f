//! Time source for game sessions.
//!
//! Scoring depends on how long a round took. Reading `Instant::now()`
//! directly would make that untestable without sleeping, so sessions read
//! time through the [`Clock`] trait instead. Production code uses
//! [`SystemClock`]; tests use [`ManualClock`] and advance it by hand.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A source of monotonic instants.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle
/// and hand another to the session:
///
/// ```rust
/// use std::time::Duration;
/// use memomatch_game::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let handle = clock.clone();
/// let before = clock.now();
/// handle.advance(Duration::from_secs(3));
/// assert_eq!(clock.now() - before, Duration::from_secs(3));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut offset =
            self.offset.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset =
            self.offset.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.base + *offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_does_not_move_on_its_own() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn test_manual_clock_advance_is_shared_between_clones() {
        let clock = ManualClock::new();
        let start = clock.now();
        let other = clock.clone();

        other.advance(Duration::from_millis(1500));
        other.advance(Duration::from_millis(500));

        assert_eq!(clock.now() - start, Duration::from_secs(2));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
