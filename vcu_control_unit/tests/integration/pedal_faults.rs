//! Integration test: pedal plausibility and torque mapping.
//!
//! Validates: APPS divergence debounce (trip after the window, recovery
//! inside it), the rest gate, sticky range faults, and, over generated
//! inputs, the direction symmetry of the torque map and the regen speed
//! floor.

use proptest::prelude::*;
use vcu_common::car::config::VcuConfig;
use vcu_common::car::data::{CarState, PedalStatus};
use vcu_common::car::flags::{PedalFaults, StatusFlags};
use vcu_control_unit::pedal::{Pedal, TorqueMap};

// ── Helpers ─────────────────────────────────────────────────────────

/// Sample period of the pedal cycle [ms].
const SAMPLE_MS: u32 = 10;

fn pedal() -> (Pedal, CarState) {
    (Pedal::new(&VcuConfig::default()), CarState::new())
}

/// Feed `(apps_5v, apps_3v3, brake)` every sample period over `[from, to)`.
fn feed(pedal: &mut Pedal, car: &mut CarState, from: u32, to: u32, raw: (u16, u16, u16)) {
    let mut t = from;
    while t < to {
        car.millis = t;
        pedal.update(car, raw.0, raw.1, raw.2);
        t += SAMPLE_MS;
    }
}

fn force_stop(car: &CarState) -> bool {
    car.pedal.status.contains(StatusFlags::FORCE_STOP)
}

// ── Divergence ──────────────────────────────────────────────────────

#[test]
fn divergence_past_window_forces_stop() {
    let (mut p, mut car) = pedal();
    // 5V at 600 while 3V3 reads rest: far outside a tenth of the range.
    feed(&mut p, &mut car, 0, 110, (600, 99, 100));
    assert!(car.pedal.faults.contains(PedalFaults::FAULT_ACTIVE));
    assert!(!car.pedal.faults.contains(PedalFaults::FAULT_EXCEEDED));
    assert!(!force_stop(&car));

    feed(&mut p, &mut car, 110, 120, (600, 99, 100));
    assert!(car.pedal.faults.contains(PedalFaults::FAULT_EXCEEDED));
    assert!(force_stop(&car));
    assert!(p.last_delta() > 65);
}

#[test]
fn divergence_resolved_inside_window_clears_active_only() {
    let (mut p, mut car) = pedal();
    feed(&mut p, &mut car, 0, 50, (600, 99, 100));
    assert!(car.pedal.faults.contains(PedalFaults::FAULT_ACTIVE));

    // Flush the filters with agreeing samples before the window closes.
    feed(&mut p, &mut car, 50, 90, (600, 396, 100));
    for _ in 0..8 {
        p.update(&mut car, 600, 396, 100);
    }
    assert!(!car.pedal.faults.contains(PedalFaults::FAULT_ACTIVE));

    feed(&mut p, &mut car, 90, 500, (600, 396, 100));
    assert!(car.pedal.faults.is_empty());
    assert!(!force_stop(&car));
}

#[test]
fn pedal_at_rest_is_never_cross_checked() {
    let (mut p, mut car) = pedal();
    // 3V3 disagrees wildly but 5V sits below the throttle dead-zone edge.
    feed(&mut p, &mut car, 0, 1_000, (150, 400, 100));
    assert!(car.pedal.faults.is_empty());
    assert!(!force_stop(&car));
}

#[test]
fn range_faults_stick_after_recovery() {
    let (mut p, mut car) = pedal();
    feed(&mut p, &mut car, 0, 10, (150, 99, 1_020));
    assert!(car.pedal.faults.contains(PedalFaults::BRAKE_HIGH));
    assert!(force_stop(&car));

    feed(&mut p, &mut car, 10, 500, (150, 99, 100));
    assert!(car.pedal.faults.contains(PedalFaults::BRAKE_HIGH));
    assert!(force_stop(&car));

    p.reset_faults(&mut car);
    assert!(car.pedal.faults.is_empty());
    assert!(!force_stop(&car));
}

// ── Torque Map ──────────────────────────────────────────────────────

/// Motor speeds, weighted toward the regen threshold.
fn motor_rpm() -> impl Strategy<Value = i16> {
    prop_oneof![-32_767i16..=32_767, -1_500i16..=1_500]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn flipped_direction_mirrors_torque(
        pedal in 0u16..=1023,
        brake in 0u16..=1023,
        rpm in motor_rpm(),
        stale in any::<bool>(),
    ) {
        let map = TorqueMap::from_config(&VcuConfig::default());
        let mut fwd = PedalStatus::default();
        let mut rev = PedalStatus::default();
        fwd.set(StatusFlags::MOTOR_NO_READ, stale);
        rev.set(StatusFlags::MOTOR_NO_READ, stale);

        let forward = map.torque(pedal, brake, rpm, false, &mut fwd);
        // Flipping the motor also mirrors the speed it reports.
        let reverse = map.torque(pedal, brake, -rpm, true, &mut rev);
        prop_assert_eq!(reverse, -forward);
        prop_assert_eq!(fwd, rev);
    }

    #[test]
    fn regen_follows_min_speed_floor(
        pedal in 0u16..=200,
        brake in 301u16..=1023,
        rpm in motor_rpm(),
    ) {
        let map = TorqueMap::from_config(&VcuConfig::default());
        let mut st = PedalStatus::default();
        let torque = map.torque(pedal, brake, rpm, false, &mut st);
        prop_assert!(!st.contains(StatusFlags::BOTH_PEDALS));
        if (rpm as i32) < map.min_regen_rpm() {
            prop_assert_eq!(torque, 0);
        } else {
            prop_assert!(torque < 0, "no regen at rpm {} brake {}", rpm, brake);
        }
    }
}

#[test]
fn regen_is_zero_below_min_speed() {
    let map = TorqueMap::from_config(&VcuConfig::default());
    let min = map.min_regen_rpm() as i16;
    let mut st = PedalStatus::default();

    // Half-way down the brake curve, throttle released.
    assert_eq!(map.torque(150, 550, 0, false, &mut st), 0);
    assert_eq!(map.torque(150, 550, min - 1, false, &mut st), 0);
    assert_eq!(map.torque(150, 550, -5_000, false, &mut st), 0);
    assert_eq!(map.torque(150, 550, min, false, &mut st), -8_000);
    assert_eq!(map.torque(150, 550, 20_000, false, &mut st), -8_000);

    assert_eq!(map.torque(150, 550, -(min - 1), true, &mut st), 0);
    assert_eq!(map.torque(150, 550, -min, true, &mut st), 8_000);

    // Stale speed disables regen entirely.
    st.set(StatusFlags::MOTOR_NO_READ, true);
    assert_eq!(map.torque(150, 550, 20_000, false, &mut st), 0);
}

#[test]
fn both_pedals_skip_regen() {
    let map = TorqueMap::from_config(&VcuConfig::default());
    let mut st = PedalStatus::default();
    assert_eq!(map.torque(500, 550, 20_000, false, &mut st), 12_000);
    assert!(st.contains(StatusFlags::BOTH_PEDALS));

    assert_eq!(map.torque(150, 550, 20_000, false, &mut st), -8_000);
    assert!(!st.contains(StatusFlags::BOTH_PEDALS));
}
