//! Sensor range checks and the APPS cross-check debounce.
//!
//! ```text
//! range:  raw sample outside [min, max]     → sticky *_LOW / *_HIGH bit
//! cross:  |apps_5v − scale(apps_3v3)| > range/10
//!           first detection                 → FAULT_ACTIVE, window starts
//!           persists > window_ms            → FAULT_EXCEEDED (sticky)
//!           clears inside window            → FAULT_ACTIVE cleared only
//! ```
//!
//! The cross-check is skipped while APPS 5V sits below its gate so a pedal
//! at rest never raises a divergence fault.

use vcu_common::car::config::{SensorRange, VcuConfig};
use vcu_common::car::flags::PedalFaults;
use vcu_common::interp::InterpTable;

// ─── Range Checks ───────────────────────────────────────────────────

/// Valid raw windows of the three pedal channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeLimits {
    pub apps_5v: SensorRange,
    pub apps_3v3: SensorRange,
    pub brake: SensorRange,
}

impl RangeLimits {
    /// Fault bits for one set of raw samples. Callers OR the result into
    /// the fault byte; nothing here clears a bit.
    pub fn check(&self, apps_5v: u16, apps_3v3: u16, brake: u16) -> PedalFaults {
        let mut faults = PedalFaults::empty();
        faults.set(PedalFaults::APPS_5V_LOW, apps_5v < self.apps_5v.min);
        faults.set(PedalFaults::APPS_5V_HIGH, apps_5v > self.apps_5v.max);
        faults.set(PedalFaults::APPS_3V3_LOW, apps_3v3 < self.apps_3v3.min);
        faults.set(PedalFaults::APPS_3V3_HIGH, apps_3v3 > self.apps_3v3.max);
        faults.set(PedalFaults::BRAKE_LOW, brake < self.brake.min);
        faults.set(PedalFaults::BRAKE_HIGH, brake > self.brake.max);
        faults
    }
}

// ─── Cross-Check ────────────────────────────────────────────────────

/// Outcome of one cross-check evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossCheckSample {
    /// `apps_5v − scale(apps_3v3)`.
    pub delta: i16,
    /// `|delta|` above the limit while the gate is open.
    pub diverged: bool,
}

/// APPS plausibility check with time debounce.
#[derive(Debug, Clone)]
pub struct CrossCheck {
    scale: InterpTable,
    max_delta: i32,
    min_apps_5v: u16,
    window_ms: u32,
    fault_start_millis: u32,
}

impl CrossCheck {
    pub fn new(
        scale: InterpTable,
        max_delta: i32,
        min_apps_5v: u16,
        window_ms: u32,
    ) -> Self {
        Self {
            scale,
            max_delta,
            min_apps_5v,
            window_ms,
            fault_start_millis: 0,
        }
    }

    /// Limit is a tenth of the throttle curve span, rounded down.
    pub fn from_config(cfg: &VcuConfig) -> Self {
        Self::new(
            cfg.curves.apps_3v3_scale.clone(),
            cfg.curves.throttle.range() / 10,
            cfg.crosscheck_min_apps_5v(),
            cfg.pedal.fault_window_ms,
        )
    }

    #[inline]
    pub const fn max_delta(&self) -> i32 {
        self.max_delta
    }

    /// Compare filtered readings.
    pub fn evaluate(&self, apps_5v: u16, apps_3v3: u16) -> CrossCheckSample {
        let scaled = self.scale.interp(apps_3v3 as i32);
        let delta = (apps_5v as i32 - scaled).clamp(i16::MIN as i32, i16::MAX as i32);
        let gated = apps_5v < self.min_apps_5v;
        CrossCheckSample {
            delta: delta as i16,
            diverged: !gated && delta.abs() > self.max_delta,
        }
    }

    /// Advance the debounce. Returns `true` once divergence has outlasted
    /// the window (and keeps returning `true` while `FAULT_EXCEEDED` is set).
    pub fn debounce(&mut self, faults: &mut PedalFaults, diverged: bool, millis: u32) -> bool {
        if diverged {
            if faults.contains(PedalFaults::FAULT_ACTIVE) {
                if millis.wrapping_sub(self.fault_start_millis) > self.window_ms {
                    faults.insert(PedalFaults::FAULT_EXCEEDED);
                }
            } else {
                self.fault_start_millis = millis;
                faults.insert(PedalFaults::FAULT_ACTIVE);
            }
        } else {
            faults.remove(PedalFaults::FAULT_ACTIVE);
        }
        faults.contains(PedalFaults::FAULT_EXCEEDED)
    }

    /// Forget the debounce window.
    pub fn reset(&mut self) {
        self.fault_start_millis = 0;
    }
}
