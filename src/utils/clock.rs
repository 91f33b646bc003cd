//! clock.rs
//! Time source shared by every poll loop and delayed cue.
//! - `SystemClock`: monotonic, paced with SpinSleeper like the rest of the fixed-tick loops
//! - `ManualClock`: virtual seconds; `sleep` advances time instead of blocking

use parking_lot::Mutex;
use spin_sleep::{SpinSleeper, SpinStrategy};
use std::{
    thread,
    time::{Duration, Instant},
};

pub trait Clock: Send + Sync {
    /// Seconds since the clock was created.
    fn now(&self) -> f64;

    fn sleep(&self, d: Duration);

    fn sleep_secs(&self, secs: f64) {
        if secs > 0.0 {
            self.sleep(Duration::from_secs_f64(secs));
        }
    }
}

pub struct SystemClock {
    origin: Instant,
    sleeper: SpinSleeper,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            // Only the last 100µs are spun; the rest is an OS sleep.
            sleeper: SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn sleep(&self, d: Duration) {
        self.sleeper.sleep(d);
    }
}

/// Deterministic clock for tests and simulations.
///
/// Every `sleep` moves the shared time forward, so a loop polling every 50ms
/// through 30 virtual seconds finishes instantly.
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: Mutex::new(0.0) }
    }

    pub fn starting_at(secs: f64) -> Self {
        Self { now: Mutex::new(secs) }
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock() += secs;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d.as_secs_f64());
        thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::starting_at(10.0);
        clock.sleep(Duration::from_millis(500));
        clock.sleep_secs(1.5);
        assert!((clock.now() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn negative_sleep_is_ignored() {
        let clock = ManualClock::new();
        clock.sleep_secs(-3.0);
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        clock.sleep(Duration::from_millis(2));
        assert!(clock.now() > a);
    }
}
