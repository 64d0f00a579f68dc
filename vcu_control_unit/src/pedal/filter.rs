//! Moving-average filter for ADC channels.

/// Samples averaged per channel.
pub const FILTER_WINDOW: usize = 8;

/// Fixed-window moving average over `u16` samples.
///
/// Until the window has filled, the average covers only the samples seen
/// so far, so the first reading is not dragged toward zero.
#[derive(Debug, Clone, Copy)]
pub struct MovingAverage<const N: usize> {
    buf: [u16; N],
    next: usize,
    filled: usize,
    sum: u32,
}

impl<const N: usize> MovingAverage<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            next: 0,
            filled: 0,
            sum: 0,
        }
    }

    /// Push one sample, evicting the oldest once full.
    #[inline]
    pub fn add_sample(&mut self, sample: u16) {
        if N == 0 {
            return;
        }
        if self.filled == N {
            self.sum -= self.buf[self.next] as u32;
        } else {
            self.filled += 1;
        }
        self.buf[self.next] = sample;
        self.sum += sample as u32;
        self.next = (self.next + 1) % N;
    }

    /// Current average, 0 before the first sample.
    #[inline]
    pub fn filtered(&self) -> u16 {
        if self.filled == 0 {
            0
        } else {
            (self.sum / self.filled as u32) as u16
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl<const N: usize> Default for MovingAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}
