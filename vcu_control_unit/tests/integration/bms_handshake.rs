//! Integration test: BMS high-voltage handshake.
//!
//! Validates: Standby/Precharge frames answered with start-HV, Run sets
//! HV_READY which then survives silent polls, missing frames raise
//! BMS_NO_MSG and the fault LED, and HV_READY cuts STARTIN short.

use vcu_common::can::{CanBus, CanFrame, CanId};
use vcu_common::car::config::VcuConfig;
use vcu_common::car::data::CarState;
use vcu_common::car::flags::StatusFlags;
use vcu_common::car::state::CarStatus;
use vcu_common::consts::{BMS_CMD_EXT, BMS_INFO_EXT, BMS_START_HV, BMS_STATE_BYTE};
use vcu_control_unit::bms::{Bms, START_HV_FRAME};
use vcu_control_unit::board::DigitalOutput;
use vcu_control_unit::sim::SimBus;

use super::{Rig, with_id};

// ── Helpers ─────────────────────────────────────────────────────────

fn bms_frame(status_byte: u8) -> CanFrame {
    let mut data = [0u8; 8];
    data[BMS_STATE_BYTE] = status_byte;
    CanFrame::new(CanId::Extended(BMS_INFO_EXT), &data).unwrap()
}

fn hv_ready(car: &CarState) -> bool {
    car.pedal.status.contains(StatusFlags::HV_READY)
}

fn bms_bus() -> (Bms, SimBus) {
    let mut bms = Bms::new();
    let sim = SimBus::new();
    let mut handle = sim.clone();
    bms.init_filter(&mut handle);
    (bms, sim)
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn precharge_frame_requests_start() {
    let (mut bms, sim) = bms_bus();
    let mut car = CarState::new();
    let mut bus = sim.clone();

    sim.inject(bms_frame(0x35));
    bms.check_hv(&mut car, &mut bus);

    assert!(!hv_ready(&car));
    assert!(!car.pedal.status.contains(StatusFlags::BMS_NO_MSG));
    assert_eq!(sim.sent(), vec![START_HV_FRAME]);
    assert_eq!(START_HV_FRAME.id(), CanId::Extended(BMS_CMD_EXT));
    assert_eq!(START_HV_FRAME.data(), &BMS_START_HV);
    assert_eq!(car.bms.data[BMS_STATE_BYTE], 0x35);
}

#[test]
fn run_frame_latches_hv_ready_until_reset() {
    let (mut bms, sim) = bms_bus();
    let mut car = CarState::new();
    let mut bus = sim.clone();

    sim.inject(bms_frame(0x55));
    bms.check_hv(&mut car, &mut bus);
    assert!(hv_ready(&car));
    assert!(sim.sent().is_empty());

    // Fast path: silent polls neither clear HV_READY nor flag a missing frame.
    for _ in 0..5 {
        bms.check_hv(&mut car, &mut bus);
    }
    assert!(hv_ready(&car));
    assert!(!car.pedal.status.contains(StatusFlags::BMS_NO_MSG));

    car.pedal.status.set(StatusFlags::HV_READY, false);
    bms.check_hv(&mut car, &mut bus);
    assert!(!hv_ready(&car));
    assert!(car.pedal.status.contains(StatusFlags::BMS_NO_MSG));
}

#[test]
fn foreign_frames_never_reach_the_handshake() {
    let (mut bms, sim) = bms_bus();
    let mut car = CarState::new();
    let mut bus = sim.clone();

    sim.inject(CanFrame::new(CanId::Standard(0x181), &[0x55; 8]).unwrap());
    bms.check_hv(&mut car, &mut bus);

    assert!(!hv_ready(&car));
    assert!(car.pedal.status.contains(StatusFlags::BMS_NO_MSG));
    assert_eq!(sim.dropped(), 1);
    assert!(bus.receive().is_none());
}

#[test]
fn supervisor_polls_bms_only_in_startin() {
    let mut r = Rig::quiet(&VcuConfig::default());
    r.sims[1].inject(bms_frame(0x35));
    r.ticks(20);
    assert_eq!(r.sims[1].pending(), 1, "BMS polled outside STARTIN");

    r.hold_start();
    assert!(r.tick_until(5, |r| r.vcu.car().car_status() == CarStatus::Startin).is_some());
    r.ticks(5);
    assert_eq!(r.sims[1].pending(), 0);
    assert_eq!(
        with_id(&r.sims[1].sent(), CanId::Extended(BMS_CMD_EXT)).len(),
        1
    );
    assert!(!hv_ready(r.vcu.car()));

    r.sims[1].inject(bms_frame(0x55));
    let to_bussin = r.tick_until(10, |r| r.vcu.car().car_status() == CarStatus::Bussin);
    assert!(to_bussin.is_some());
    assert!(hv_ready(r.vcu.car()));
}

#[test]
fn missing_bms_lights_fault_led() {
    let mut r = Rig::quiet(&VcuConfig::default());
    r.hold_start();
    assert!(r.tick_until(5, |r| r.vcu.car().car_status() == CarStatus::Startin).is_some());
    assert!(!r.vcu.board().output(DigitalOutput::BmsFaultLed));

    r.ticks(6);
    assert!(r.vcu.car().pedal.status.contains(StatusFlags::BMS_NO_MSG));
    assert!(r.vcu.board().output(DigitalOutput::BmsFaultLed));
}
