//! Monotonic time sources.
//!
//! The control loop reads time through [`MonotonicClock`] so the same code
//! runs against the host clock and against a simulated clock in tests.
//! Both counters wrap; every consumer compares with `wrapping_sub`.

use std::rc::Rc;
use std::time::Instant;

/// Free-running microsecond and millisecond counters.
pub trait MonotonicClock {
    /// Microseconds since an arbitrary epoch, wrapping at `u32::MAX`.
    fn micros(&self) -> u32;

    /// Milliseconds since the same epoch, wrapping at `u32::MAX`.
    fn millis(&self) -> u32;
}

impl<T: MonotonicClock + ?Sized> MonotonicClock for &T {
    #[inline]
    fn micros(&self) -> u32 {
        (**self).micros()
    }

    #[inline]
    fn millis(&self) -> u32 {
        (**self).millis()
    }
}

impl<T: MonotonicClock + ?Sized> MonotonicClock for Rc<T> {
    #[inline]
    fn micros(&self) -> u32 {
        (**self).micros()
    }

    #[inline]
    fn millis(&self) -> u32 {
        (**self).millis()
    }
}

/// Host clock backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    epoch: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for StdClock {
    #[inline]
    fn micros(&self) -> u32 {
        // Truncation is the wrap.
        self.epoch.elapsed().as_micros() as u32
    }

    #[inline]
    fn millis(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }
}
