//! Multi-bus periodic task scheduler.
//!
//! A fixed tick of `period_us` drives a per-bus table of tasks. Each task
//! fires every `interval` ticks. The tick grid never drifts: a normal tick
//! advances `last_fire` by exactly one period, and a late tick resyncs to
//! the latest grid point at or before `now` instead of bursting to catch up.
//!
//! Tasks are plain tags (`T: Copy + PartialEq`); the caller's dispatch
//! closure maps a tag to work. Tables are `heapless::Vec`, so nothing
//! allocates after construction.
//!
//! ```text
//! update():  elapsed < period - spin   → return false
//!            elapsed < period          → busy-wait, then fire
//!            elapsed ≥ period          → fire
//! fire:      bus 0..BUSES, slot order  → countdown -= 1, at 0 dispatch + reload
//! ```

use heapless::Vec;
use tracing::{debug, warn};
use vcu_common::car::config::BusRole;

use crate::clock::MonotonicClock;

// ─── Task Tags ──────────────────────────────────────────────────────

/// Periodic work the VCU schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcuTask {
    /// Torque send followed by one motor read.
    PedalCycle,
    /// One BMS handshake poll.
    BmsPoll,
    /// Pedal telemetry channels.
    TelemetryPedal,
    /// Motor telemetry channel.
    TelemetryMotor,
    /// BMS telemetry channel.
    TelemetryBms,
}

impl VcuTask {
    pub const ALL: [Self; 5] = [
        Self::PedalCycle,
        Self::BmsPoll,
        Self::TelemetryPedal,
        Self::TelemetryMotor,
        Self::TelemetryBms,
    ];

    /// Bus role the task talks on. The task is registered on that role's
    /// physical bus.
    pub const fn role(self) -> BusRole {
        match self {
            Self::PedalCycle => BusRole::Motor,
            Self::BmsPoll => BusRole::Bms,
            Self::TelemetryPedal | Self::TelemetryMotor | Self::TelemetryBms => {
                BusRole::Datalogger
            }
        }
    }
}

/// Dispatch result: keep the task or retire it after this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskControl {
    #[default]
    Keep,
    Remove,
}

#[derive(Debug, Clone, Copy)]
struct TaskSlot<T> {
    task: T,
    interval: u16,
    countdown: u16,
    retired: bool,
}

// ─── Statistics ─────────────────────────────────────────────────────

/// O(1) scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Dispatch passes fired.
    pub passes: u64,
    /// Whole ticks dropped by resyncs.
    pub skipped_ticks: u64,
    /// Passes preceded by a busy-wait.
    pub spins: u64,
    /// Task invocations.
    pub dispatched: u64,
}

// ─── Scheduler ──────────────────────────────────────────────────────

/// Smallest tick the grid arithmetic accepts.
pub const MIN_PERIOD_US: u32 = 1;

/// Fixed-capacity periodic scheduler over `BUSES` buses with at most
/// `TASKS` tasks each.
pub struct Scheduler<T, const TASKS: usize, const BUSES: usize, C> {
    buses: [Vec<TaskSlot<T>, TASKS>; BUSES],
    period_us: u32,
    spin_threshold_us: u32,
    last_fire_us: u32,
    clock: C,
    stats: SchedulerStats,
}

impl<T, const TASKS: usize, const BUSES: usize, C> Scheduler<T, TASKS, BUSES, C>
where
    T: Copy + PartialEq + core::fmt::Debug,
    C: MonotonicClock,
{
    /// Create a scheduler whose grid starts at the clock's current time.
    ///
    /// A zero period is clamped to [`MIN_PERIOD_US`].
    pub fn new(period_us: u32, spin_threshold_us: u32, clock: C) -> Self {
        let period_us = if period_us < MIN_PERIOD_US {
            warn!(period_us, "scheduler period below minimum, clamping");
            MIN_PERIOD_US
        } else {
            period_us
        };
        let last_fire_us = clock.micros();
        Self {
            buses: core::array::from_fn(|_| Vec::new()),
            period_us,
            spin_threshold_us,
            last_fire_us,
            clock,
            stats: SchedulerStats::default(),
        }
    }

    /// Register `task` on `bus` to fire every `interval` ticks.
    ///
    /// The first fire comes after one full interval. Re-adding a task that
    /// is already on the bus replaces its interval and restarts it.
    /// Returns `false` with no effect if the bus index is out of range, the
    /// interval is zero, or the bus table is full.
    pub fn add_task(&mut self, bus: usize, task: T, interval: u16) -> bool {
        if interval == 0 {
            return false;
        }
        let Some(slots) = self.buses.get_mut(bus) else {
            return false;
        };
        if let Some(slot) = slots.iter_mut().find(|s| s.task == task) {
            slot.interval = interval;
            slot.countdown = interval;
            slot.retired = false;
            return true;
        }
        slots
            .push(TaskSlot {
                task,
                interval,
                countdown: interval,
                retired: false,
            })
            .is_ok()
    }

    /// Remove the first occurrence of `task` on `bus`.
    pub fn remove_task(&mut self, bus: usize, task: T) -> bool {
        let Some(slots) = self.buses.get_mut(bus) else {
            return false;
        };
        match slots.iter().position(|s| s.task == task) {
            Some(idx) => {
                slots.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Whether `task` is registered on `bus`.
    pub fn contains(&self, bus: usize, task: T) -> bool {
        self.buses
            .get(bus)
            .is_some_and(|slots| slots.iter().any(|s| s.task == task))
    }

    /// Number of tasks on `bus` (0 for an out-of-range index).
    pub fn task_count(&self, bus: usize) -> usize {
        self.buses.get(bus).map_or(0, |slots| slots.len())
    }

    /// Run at most one dispatch pass if a tick is due.
    ///
    /// Returns `true` if a pass ran. When the next tick is within the spin
    /// threshold this busy-waits for it rather than returning early.
    pub fn update<F>(&mut self, mut dispatch: F) -> bool
    where
        F: FnMut(usize, T) -> TaskControl,
    {
        let mut now = self.clock.micros();
        let elapsed = now.wrapping_sub(self.last_fire_us);

        if elapsed < self.period_us {
            if self.period_us - elapsed > self.spin_threshold_us {
                return false;
            }
            now = self.spin_until_due();
            self.stats.spins += 1;
        }

        self.advance_grid(now);
        self.run_pass(&mut dispatch);
        true
    }

    /// Swap the time source and restart the grid at its current time.
    pub fn synchronize(&mut self, clock: C) {
        self.clock = clock;
        self.reset_grid();
    }

    /// Restart the grid at the current time, e.g. after a blocking init.
    pub fn reset_grid(&mut self) {
        self.last_fire_us = self.clock.micros();
        debug!(last_fire_us = self.last_fire_us, "scheduler grid reset");
    }

    #[inline]
    pub const fn period_us(&self) -> u32 {
        self.period_us
    }

    /// Whole ticks in `interval_us`, rounded down.
    #[inline]
    pub const fn cycles_needed(&self, interval_us: u32) -> u32 {
        interval_us / self.period_us
    }

    #[inline]
    pub const fn last_fire_us(&self) -> u32 {
        self.last_fire_us
    }

    #[inline]
    pub const fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn spin_until_due(&self) -> u32 {
        loop {
            let now = self.clock.micros();
            if now.wrapping_sub(self.last_fire_us) >= self.period_us {
                return now;
            }
            core::hint::spin_loop();
        }
    }

    fn advance_grid(&mut self, now: u32) {
        let elapsed = now.wrapping_sub(self.last_fire_us);
        let behind = elapsed / self.period_us;
        if behind > 1 {
            let skipped = behind - 1;
            self.stats.skipped_ticks += skipped as u64;
            warn!(skipped, elapsed_us = elapsed, "scheduler late, resyncing to tick grid");
        }
        // One period when on time, otherwise the last grid point ≤ now.
        self.last_fire_us = now.wrapping_sub(elapsed % self.period_us);
    }

    fn run_pass<F>(&mut self, dispatch: &mut F)
    where
        F: FnMut(usize, T) -> TaskControl,
    {
        self.stats.passes += 1;
        for (bus, slots) in self.buses.iter_mut().enumerate() {
            let mut any_retired = false;
            for slot in slots.iter_mut() {
                slot.countdown = slot.countdown.saturating_sub(1);
                if slot.countdown > 0 {
                    continue;
                }
                slot.countdown = slot.interval;
                self.stats.dispatched += 1;
                if dispatch(bus, slot.task) == TaskControl::Remove {
                    slot.retired = true;
                    any_retired = true;
                }
            }
            if any_retired {
                slots.retain(|s| {
                    if s.retired {
                        debug!(bus, task = ?s.task, "task retired");
                    }
                    !s.retired
                });
            }
        }
    }
}
