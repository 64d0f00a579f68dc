//! Manually driven clock.

use std::cell::Cell;

use crate::clock::MonotonicClock;

/// Simulated time source.
///
/// Time only moves through `advance_*`, or by `auto_step_us` on every
/// `micros()` read so busy-waits terminate.
#[derive(Debug, Default)]
pub struct SimClock {
    now_us: Cell<u64>,
    auto_step_us: Cell<u32>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at_us(start: u64) -> Self {
        Self {
            now_us: Cell::new(start),
            auto_step_us: Cell::new(0),
        }
    }

    pub fn advance_us(&self, us: u64) {
        self.now_us.set(self.now_us.get() + us);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms * 1000);
    }

    /// Step added after every `micros()` read.
    pub fn set_auto_step_us(&self, step: u32) {
        self.auto_step_us.set(step);
    }

    /// Unwrapped simulated time [µs].
    pub fn now_us(&self) -> u64 {
        self.now_us.get()
    }
}

impl MonotonicClock for SimClock {
    fn micros(&self) -> u32 {
        let now = self.now_us.get();
        self.now_us.set(now + self.auto_step_us.get() as u64);
        now as u32
    }

    fn millis(&self) -> u32 {
        (self.now_us.get() / 1000) as u32
    }
}
