// src/clock.rs
use std::time::Instant;

#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::time::Duration;

/// Monotonic time source for the engine's schedules.
///
/// Production uses `SystemClock`; engine tests inject a `ManualClock` and
/// advance virtual time instead of sleeping on real timers.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock. Clones share the same underlying instant, so a
/// test can hold one handle while the engine owns another.
#[cfg(test)]
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}
