//! rounds.rs
//! Shared plumbing for the minigames and every other seat-polling loop.
//! - `StartOnce`: the start-once guard each round controller owns
//! - `RoundContext`: seats, clock and the shutdown flag, cloned into worker threads

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::input::seat::SeatSensors;
use crate::utils::clock::Clock;

/// Longest single sleep inside `RoundContext::wait`, so shutdown is noticed promptly.
const WAIT_SLICE_SECS: f64 = 0.1;

/// Lock-protected "started" boolean. Only the first `try_begin` wins.
#[derive(Debug, Default)]
pub struct StartOnce {
    started: Mutex<bool>,
}

impl StartOnce {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> bool {
        let mut started = self.started.lock();
        if *started {
            return false;
        }
        *started = true;
        true
    }

    pub fn reset(&self) {
        *self.started.lock() = false;
    }

    pub fn is_started(&self) -> bool {
        *self.started.lock()
    }
}

#[derive(Clone)]
pub struct RoundContext {
    pub seats: Arc<SeatSensors>,
    pub clock: Arc<dyn Clock>,
    pub running: Arc<AtomicBool>,
}

impl RoundContext {
    pub fn new(seats: Arc<SeatSensors>, clock: Arc<dyn Clock>, running: Arc<AtomicBool>) -> Self {
        Self { seats, clock, running }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[inline]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Sleeps for `secs`. Returns false if the show was shut down meanwhile.
    pub fn wait(&self, secs: f64) -> bool {
        let deadline = self.clock.now() + secs;
        loop {
            if !self.is_running() {
                return false;
            }
            let left = deadline - self.clock.now();
            if left <= 0.0 {
                return true;
            }
            self.clock.sleep_secs(left.min(WAIT_SLICE_SECS));
        }
    }

    /// Polls `check` every `poll` seconds until it yields a value.
    /// `None` means the show was shut down first.
    pub fn poll_until<T>(&self, poll: f64, mut check: impl FnMut() -> Option<T>) -> Option<T> {
        while self.is_running() {
            if let Some(found) = check() {
                return Some(found);
            }
            self.clock.sleep_secs(poll);
        }
        None
    }
}
