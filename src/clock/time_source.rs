// Time Source - Monotonic clock abstraction
// Injected into timers and the clock operator instead of a process-wide "now"

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic time in milliseconds
pub trait TimeSource: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock backed by `Instant`, zero at creation
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock for deterministic tests
/// Clones share the same time value
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(start_ms.to_bits())),
        }
    }

    pub fn set(&self, ms: f64) {
        self.millis.store(ms.to_bits(), Ordering::Relaxed);
    }

    /// Move the clock forward and return the new time
    pub fn advance(&self, delta_ms: f64) -> f64 {
        let next = self.now() + delta_ms;
        self.set(next);
        next
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.millis.load(Ordering::Relaxed))
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(a >= 0.0);
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(100.0);
        let other = clock.clone();

        assert_eq!(other.now(), 100.0);
        clock.advance(25.0);
        assert_eq!(other.now(), 125.0);

        other.set(10.0);
        assert_eq!(clock.now(), 10.0);
    }
}
