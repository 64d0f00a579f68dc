//! Integration test: force stop.
//!
//! Validates: a pedal fault in any state lands the car in INIT with the
//! buzzer and drive relay off within the same iteration, the latch holds
//! through further start attempts, and only a re-init clears it.

use vcu_common::car::config::VcuConfig;
use vcu_common::car::flags::{PedalFaults, StatusFlags};
use vcu_common::car::state::CarStatus;
use vcu_common::consts::TORQUE_CMD;
use vcu_control_unit::board::{AnalogInput, DigitalOutput};
use vcu_control_unit::scheduler::VcuTask;

use super::Rig;

// ── Helpers ─────────────────────────────────────────────────────────

fn status(r: &Rig) -> CarStatus {
    r.vcu.car().car_status()
}

fn assert_safe(r: &Rig) {
    assert_eq!(status(r), CarStatus::Init);
    assert!(!r.vcu.board().output(DigitalOutput::Buzzer));
    assert!(!r.vcu.board().output(DigitalOutput::DriveEnable));
    assert!(r.vcu.car().pedal.status.contains(StatusFlags::FORCE_STOP));
}

fn rig_in(target: CarStatus) -> Rig {
    let mut r = Rig::with_plant(&VcuConfig::default(), 0);
    r.hold_start();
    assert!(r.tick_until(400, |r| status(r) == target).is_some());
    r
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn range_fault_in_startin() {
    let mut r = rig_in(CarStatus::Startin);
    r.vcu.board_mut().set_analog(AnalogInput::Apps3v3, 750);
    r.tick();
    assert_safe(&r);
    assert!(r.vcu.car().pedal.faults.contains(PedalFaults::APPS_3V3_HIGH));
    assert!(!r.vcu.scheduler().contains(1, VcuTask::BmsPoll));
}

#[test]
fn range_fault_in_bussin_silences_buzzer() {
    let mut r = rig_in(CarStatus::Bussin);
    assert!(r.vcu.board().output(DigitalOutput::Buzzer));
    r.vcu.board_mut().set_analog(AnalogInput::Brake, 10);
    r.tick();
    assert_safe(&r);
    assert!(r.vcu.car().pedal.faults.contains(PedalFaults::BRAKE_LOW));
}

#[test]
fn range_fault_in_drive_drops_relay_and_torque() {
    let mut r = rig_in(CarStatus::Drive);
    r.release_all();
    r.vcu.board_mut().set_throttle(500);
    r.ticks(10);
    assert!(r.vcu.car().motor.torque_val > 0);

    r.vcu.board_mut().set_analog(AnalogInput::Apps5v, 1020);
    r.tick();
    assert_safe(&r);

    r.sims[0].take_sent();
    r.tick();
    assert_eq!(r.vcu.car().motor.torque_val, 0);
    let torque: Vec<_> = r.sims[0]
        .sent()
        .into_iter()
        .filter(|f| f.data().first() == Some(&TORQUE_CMD))
        .collect();
    assert!(!torque.is_empty());
    assert!(torque.iter().all(|f| f.data() == &[TORQUE_CMD, 0, 0]));
}

#[test]
fn sustained_divergence_stops_drive() {
    let mut r = rig_in(CarStatus::Drive);
    r.release_all();
    r.vcu.board_mut().set_throttle(600);
    r.ticks(10);
    assert!(r.vcu.car().pedal.faults.is_empty());

    // 3V3 channel collapses while 5V keeps reading 600.
    r.vcu.board_mut().set_analog(AnalogInput::Apps3v3, 99);
    let stopped = r.tick_until(40, |r| status(r) == CarStatus::Init).unwrap();
    assert!(stopped > 10, "stopped after {stopped} ticks, inside the window");
    assert_safe(&r);
    let faults = r.vcu.car().pedal.faults;
    assert!(faults.contains(PedalFaults::FAULT_EXCEEDED));
    assert!(!faults.intersects(PedalFaults::RANGE_MASK));
}

#[test]
fn latch_holds_until_reinitialize() {
    let mut r = rig_in(CarStatus::Drive);
    r.vcu.board_mut().set_analog(AnalogInput::Brake, 1020);
    r.tick();
    assert_safe(&r);

    // Clean inputs and a fresh start attempt do not clear the latch.
    r.hold_start();
    for _ in 0..50 {
        r.tick();
        assert_safe(&r);
    }

    r.vcu.reinitialize();
    assert!(r.vcu.car().pedal.faults.is_empty());
    assert!(!r.vcu.car().pedal.status.contains(StatusFlags::FORCE_STOP));
    assert!(!r.vcu.car().pedal.status.contains(StatusFlags::HV_READY));
    assert!(r.tick_until(10, |r| status(r) == CarStatus::Startin).is_some());
}
