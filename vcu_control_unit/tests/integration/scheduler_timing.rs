//! Integration test: scheduler timing.
//!
//! Validates: tasks never fire more often than their interval under a
//! jittery caller, a stalled loop gets exactly one pass, the table fails
//! closed when full, and the VCU's own schedule keeps its rates.

use std::collections::HashMap;
use std::rc::Rc;

use proptest::prelude::*;
use vcu_common::can::CanId;
use vcu_common::car::config::VcuConfig;
use vcu_common::consts::{TELEM_BMS_STATUS, TELEM_THROTTLE_IN, TELEM_THROTTLE_OUT};
use vcu_control_unit::scheduler::{Scheduler, TaskControl, VcuTask};
use vcu_control_unit::sim::SimClock;

use super::{Rig, with_id};

// ── Helpers ─────────────────────────────────────────────────────────

const PERIOD_US: u32 = 10_000;

type SmallScheduler = Scheduler<VcuTask, 2, 3, Rc<SimClock>>;

fn small() -> (SmallScheduler, Rc<SimClock>) {
    let clock = Rc::new(SimClock::new());
    (Scheduler::new(PERIOD_US, 500, clock.clone()), clock)
}

/// Gaps between caller wake-ups [µs], up to three and a half periods.
fn jitter() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..35_000, 1..600)
}

// ── Tests ───────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn jittered_caller_never_exceeds_task_rate(gaps in jitter()) {
        let (mut s, clock) = small();
        clock.set_auto_step_us(50);
        let tasks = [
            (0, VcuTask::PedalCycle, 1u16),
            (1, VcuTask::BmsPoll, 5),
            (2, VcuTask::TelemetryBms, 3),
        ];
        for (bus, task, interval) in tasks {
            prop_assert!(s.add_task(bus, task, interval));
        }

        let mut last_fire: HashMap<VcuTask, u32> = HashMap::new();
        let mut prev_pass: Option<u32> = None;
        for gap in gaps {
            clock.advance_us(gap);
            let passes = s.stats().passes;
            let mut fired = Vec::new();
            if !s.update(|_, task| {
                fired.push(task);
                TaskControl::Keep
            }) {
                continue;
            }
            prop_assert_eq!(s.stats().passes, passes + 1, "more than one pass per call");

            let now = s.last_fire_us();
            prop_assert_eq!(now % PERIOD_US, 0, "pass off the tick grid");
            if let Some(prev) = prev_pass {
                prop_assert!(now.wrapping_sub(prev) >= PERIOD_US, "two passes inside one period");
            }
            prev_pass = Some(now);

            for task in fired {
                let interval = tasks
                    .iter()
                    .find(|(_, t, _)| *t == task)
                    .map(|(_, _, i)| *i as u32)
                    .unwrap();
                if let Some(prev) = last_fire.insert(task, now) {
                    prop_assert!(
                        now.wrapping_sub(prev) >= interval * PERIOD_US,
                        "{:?} fired {}us after its last run",
                        task,
                        now.wrapping_sub(prev)
                    );
                }
            }
        }
    }
}

#[test]
fn full_table_leaves_existing_tasks_untouched() {
    let (mut s, clock) = small();
    assert!(s.add_task(0, VcuTask::PedalCycle, 1));
    assert!(s.add_task(0, VcuTask::TelemetryPedal, 2));
    assert!(!s.add_task(0, VcuTask::TelemetryMotor, 1));
    assert!(!s.remove_task(0, VcuTask::TelemetryMotor));
    assert_eq!(s.task_count(0), 2);

    let mut counts: HashMap<VcuTask, u32> = HashMap::new();
    for _ in 0..10 {
        clock.advance_us(PERIOD_US as u64);
        s.update(|_, task| {
            *counts.entry(task).or_default() += 1;
            TaskControl::Keep
        });
    }
    assert_eq!(counts.get(&VcuTask::PedalCycle), Some(&10));
    assert_eq!(counts.get(&VcuTask::TelemetryPedal), Some(&5));
    assert_eq!(counts.get(&VcuTask::TelemetryMotor), None);
}

#[test]
fn stalled_vcu_gets_one_pass() {
    let mut r = Rig::quiet(&VcuConfig::default());
    r.ticks(3);
    let passes = r.vcu.scheduler().stats().passes;
    r.sims[2].take_sent();

    r.clock.advance_ms(100);
    assert!(r.vcu.step());
    assert!(!r.vcu.step());
    assert_eq!(r.vcu.scheduler().stats().passes, passes + 1);
    assert_eq!(r.vcu.scheduler().stats().skipped_ticks, 9);

    let sent = r.sims[2].take_sent();
    assert_eq!(with_id(&sent, CanId::Standard(TELEM_THROTTLE_IN)).len(), 1);
    assert_eq!(with_id(&sent, CanId::Standard(TELEM_THROTTLE_OUT)).len(), 1);
}

#[test]
fn vcu_schedule_keeps_rates() {
    let mut r = Rig::quiet(&VcuConfig::default());
    r.sims[2].take_sent();
    r.ticks(100);

    let sent = r.sims[2].take_sent();
    assert_eq!(with_id(&sent, CanId::Standard(TELEM_THROTTLE_IN)).len(), 100);
    assert_eq!(with_id(&sent, CanId::Standard(TELEM_THROTTLE_OUT)).len(), 100);
    assert_eq!(with_id(&sent, CanId::Standard(TELEM_BMS_STATUS)).len(), 10);
    assert_eq!(r.vcu.scheduler().stats().passes, 100);
    assert!(r.vcu.scheduler().contains(0, VcuTask::PedalCycle));
}
