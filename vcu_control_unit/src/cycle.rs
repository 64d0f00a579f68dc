//! Host loop runner and RT setup.
//!
//! The firmware's main loop is `loop { vcu.step() }`. On a host the same
//! loop runs here, with optional RT hardening and a CSV telemetry log.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity` to the configured core.
//! 4. `sched_setscheduler(SCHED_FIFO, priority)`.
//!
//! Without the `rt` feature every step is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::board::Board;
use crate::clock::MonotonicClock;
use crate::error::VcuError;
use crate::supervisor::Vcu;
use crate::telemetry::TelemetryLog;

// ─── Loop Statistics ────────────────────────────────────────────────

/// O(1) per-iteration timing statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    /// Loop iterations executed.
    pub iterations: u64,
    /// Iterations in which the scheduler fired.
    pub ticks: u64,
    /// Last fired-iteration duration [ns].
    pub last_tick_ns: u64,
    /// Minimum fired-iteration duration [ns].
    pub min_tick_ns: u64,
    /// Maximum fired-iteration duration [ns].
    pub max_tick_ns: u64,
    /// Running sum for the average.
    pub sum_tick_ns: u64,
    /// Fired iterations longer than one scheduler period.
    pub overruns: u64,
}

impl LoopStats {
    pub const fn new() -> Self {
        Self {
            iterations: 0,
            ticks: 0,
            last_tick_ns: 0,
            min_tick_ns: u64::MAX,
            max_tick_ns: 0,
            sum_tick_ns: 0,
            overruns: 0,
        }
    }

    /// Record one iteration. Only fired iterations carry timing.
    #[inline]
    pub fn record(&mut self, fired: bool, duration_ns: u64, period_ns: u64) {
        self.iterations += 1;
        if !fired {
            return;
        }
        self.ticks += 1;
        self.last_tick_ns = duration_ns;
        self.min_tick_ns = self.min_tick_ns.min(duration_ns);
        self.max_tick_ns = self.max_tick_ns.max(duration_ns);
        self.sum_tick_ns = self.sum_tick_ns.saturating_add(duration_ns);
        if duration_ns > period_ns {
            self.overruns += 1;
        }
    }

    /// Average fired-iteration duration [ns] (0 before the first tick).
    #[inline]
    pub fn avg_tick_ns(&self) -> u64 {
        if self.ticks == 0 {
            0
        } else {
            self.sum_tick_ns / self.ticks
        }
    }
}

impl Default for LoopStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), VcuError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| VcuError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), VcuError> {
    Ok(())
}

/// Touch stack pages so the loop never faults them in.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), VcuError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| VcuError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| VcuError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), VcuError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), VcuError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(VcuError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), VcuError> {
    Ok(())
}

/// Full RT setup. Call once before [`LoopRunner::run`].
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), VcuError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    debug!(cpu_core, rt_priority, rt = cfg!(feature = "rt"), "RT setup complete");
    Ok(())
}

// ─── Loop Runner ────────────────────────────────────────────────────

/// Drives [`Vcu::step`] until shutdown.
pub struct LoopRunner<B: Board, C: MonotonicClock> {
    vcu: Vcu<B, C>,
    log: Option<TelemetryLog>,
    stats: LoopStats,
    idle_sleep: Duration,
}

impl<B: Board, C: MonotonicClock> LoopRunner<B, C> {
    /// `vcu` must already be initialized.
    pub fn new(vcu: Vcu<B, C>) -> Self {
        Self {
            vcu,
            log: None,
            stats: LoopStats::new(),
            // Without RT the host yields between ticks instead of spinning.
            idle_sleep: if cfg!(feature = "rt") {
                Duration::ZERO
            } else {
                Duration::from_micros(200)
            },
        }
    }

    /// Append a CSV record after every scheduler tick.
    pub fn with_log(mut self, log: TelemetryLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Override the idle yield between ticks.
    pub fn with_idle_sleep(mut self, idle: Duration) -> Self {
        self.idle_sleep = idle;
        self
    }

    #[inline]
    pub fn vcu(&self) -> &Vcu<B, C> {
        &self.vcu
    }

    #[inline]
    pub fn vcu_mut(&mut self) -> &mut Vcu<B, C> {
        &mut self.vcu
    }

    #[inline]
    pub const fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Run until `shutdown` is set or `max_iterations` steps have run.
    ///
    /// Only the telemetry log can fail; loop faults are car state.
    pub fn run(&mut self, shutdown: &AtomicBool, max_iterations: Option<u64>) -> Result<LoopStats, VcuError> {
        let period_ns = self.vcu.scheduler().period_us() as u64 * 1_000;
        info!(?max_iterations, "entering main loop");

        while !shutdown.load(Ordering::Relaxed) {
            if max_iterations.is_some_and(|max| self.stats.iterations >= max) {
                break;
            }

            let start = Instant::now();
            let fired = self.vcu.step();
            let duration_ns = start.elapsed().as_nanos() as u64;
            self.stats.record(fired, duration_ns, period_ns);

            if fired {
                if duration_ns > period_ns {
                    warn!(duration_ns, period_ns, "loop iteration overran the tick");
                }
                if let Some(log) = self.log.as_mut() {
                    log.write(self.vcu.car())?;
                }
            } else if !self.idle_sleep.is_zero() {
                std::thread::sleep(self.idle_sleep);
            }
        }

        if let Some(log) = self.log.as_mut() {
            log.flush()?;
        }
        info!(
            iterations = self.stats.iterations,
            ticks = self.stats.ticks,
            avg_tick_ns = self.stats.avg_tick_ns(),
            max_tick_ns = self.stats.max_tick_ns,
            overruns = self.stats.overruns,
            status = self.vcu.car().car_status().name(),
            "main loop stopped"
        );
        Ok(self.stats)
    }
}
