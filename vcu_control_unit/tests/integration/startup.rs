//! Integration test: start sequence.
//!
//! Validates: init handshake → button + brake → STARTIN → HV ready (or
//! override) → BUSSIN with buzzer → DRIVE with the drive relay, then
//! torque reaching the inverter.

use vcu_common::can::CanId;
use vcu_common::car::config::VcuConfig;
use vcu_common::car::flags::StatusFlags;
use vcu_common::car::state::CarStatus;
use vcu_common::config::load_config_from_str;
use vcu_common::consts::{TELEM_CAR_STATUS_CHANGE, TORQUE_CMD};
use vcu_control_unit::board::{AnalogInput, DigitalOutput};
use vcu_control_unit::scheduler::VcuTask;
use vcu_control_unit::sim::{BmsResponder, InverterResponder, SimBus};

use super::{Rig, with_id};

// ── Helpers ─────────────────────────────────────────────────────────

fn status(r: &Rig) -> CarStatus {
    r.vcu.car().car_status()
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn init_leaves_outputs_low_and_tasks_registered() {
    let r = Rig::with_plant(&VcuConfig::default(), 2);
    let board = r.vcu.board();
    for out in DigitalOutput::ALL {
        assert!(!board.output(out), "{out:?} should start low");
    }
    assert!(r.vcu.pedal().motor_ready());
    assert!(r.vcu.scheduler().contains(0, VcuTask::PedalCycle));
    for task in [VcuTask::TelemetryPedal, VcuTask::TelemetryMotor, VcuTask::TelemetryBms] {
        assert!(r.vcu.scheduler().contains(2, task));
    }
    assert_eq!(status(&r), CarStatus::Init);
}

#[test]
fn full_sequence_with_bms_ready() {
    let mut r = Rig::with_plant(&VcuConfig::default(), 2);
    r.sims[2].take_sent();

    r.hold_start();
    let to_startin = r.tick_until(5, |r| status(r) == CarStatus::Startin);
    assert!(to_startin.is_some());
    assert!(r.vcu.scheduler().contains(1, VcuTask::BmsPoll));

    // The BMS reaches Run well inside the override window.
    let to_bussin = r.tick_until(99, |r| status(r) == CarStatus::Bussin);
    assert!(to_bussin.is_some(), "BMS never reported run");
    assert!(r.vcu.car().pedal.status.contains(StatusFlags::HV_READY));
    assert!(r.vcu.board().output(DigitalOutput::Buzzer));
    assert!(!r.vcu.scheduler().contains(1, VcuTask::BmsPoll));
    assert!(!r.sims[1].sent().is_empty(), "start-HV never sent");

    let to_drive = r.tick_until(250, |r| status(r) == CarStatus::Drive);
    assert!(to_drive.is_some_and(|n| n >= 200));
    assert!(!r.vcu.board().output(DigitalOutput::Buzzer));
    assert!(r.vcu.board().output(DigitalOutput::DriveEnable));

    let changes = with_id(&r.sims[2].sent(), CanId::Standard(TELEM_CAR_STATUS_CHANGE));
    let pairs: Vec<(u8, u8)> = changes.iter().map(|f| (f.data()[0], f.data()[1])).collect();
    assert_eq!(pairs, vec![(0, 1), (1, 2), (2, 3)]);
    assert_eq!(r.vcu.transitions(), 3);
}

#[test]
fn drive_sends_throttle_torque() {
    let mut r = Rig::with_plant(&VcuConfig::default(), 0);
    r.hold_start();
    assert!(r.tick_until(400, |r| status(r) == CarStatus::Drive).is_some());

    r.release_all();
    r.vcu.board_mut().set_throttle(500);
    r.ticks(20);

    assert_eq!(status(&r), CarStatus::Drive);
    assert_eq!(r.vcu.car().motor.torque_val, 12_000);
    let last = r.sims[0]
        .sent()
        .into_iter()
        .rev()
        .find(|f| f.data().first() == Some(&TORQUE_CMD))
        .unwrap();
    assert_eq!(last.data(), &[TORQUE_CMD, 0xE0, 0x2E]);
    assert!(r.vcu.car().motor.motor_rpm > 0, "inverter did not spin up");
    assert!(!r.vcu.car().pedal.status.contains(StatusFlags::MOTOR_NO_READ));
}

#[test]
fn silent_bms_reaches_drive_by_override() {
    let cfg = load_config_from_str(
        r#"
[supervisor]
bms_override_millis = 300
bussin_millis = 500
"#,
    )
    .unwrap();
    let sims = [
        SimBus::with_responder(InverterResponder::new()),
        SimBus::with_responder(BmsResponder::silent()),
        SimBus::new(),
    ];
    let mut r = Rig::new(&cfg, sims);

    r.hold_start();
    assert!(r.tick_until(5, |r| status(r) == CarStatus::Startin).is_some());
    let waited = r.tick_until(100, |r| status(r) == CarStatus::Bussin).unwrap();
    assert!((29..=31).contains(&waited), "override after {waited} ticks");
    assert!(!r.vcu.car().pedal.status.contains(StatusFlags::HV_READY));
    assert!(r.vcu.car().pedal.status.contains(StatusFlags::BMS_NO_MSG));

    let dwell = r.tick_until(100, |r| status(r) == CarStatus::Drive).unwrap();
    assert_eq!(dwell, 50);
}

#[test]
fn released_brake_aborts_start() {
    let mut r = Rig::with_plant(&VcuConfig::default(), 50);
    r.hold_start();
    assert!(r.tick_until(5, |r| status(r) == CarStatus::Startin).is_some());

    r.vcu.board_mut().set_analog(AnalogInput::Brake, 100);
    let back = r.tick_until(10, |r| status(r) == CarStatus::Init);
    assert!(back.is_some());
    assert!(!r.vcu.scheduler().contains(1, VcuTask::BmsPoll));
    assert!(!r.vcu.board().output(DigitalOutput::Buzzer));
}
