//! Integration test: several roles on one physical bus.
//!
//! Validates: the bus map is checked at construction, every task fits on
//! one bus, both acceptance filters coexist on a shared controller, a BMS
//! poll never consumes an inverter reply, and the start sequence still
//! completes when the inverter and BMS share the controller.

use vcu_common::can::{CanBus, CanFilter, CanFrame, CanId};
use vcu_common::car::config::{BusMapConfig, BusRole, VcuConfig};
use vcu_common::car::data::CarState;
use vcu_common::car::flags::StatusFlags;
use vcu_common::car::state::CarStatus;
use vcu_common::consts::{
    BMS_INFO_EXT, BMS_STATE_BYTE, MAX_MOTOR_READ_MILLIS_DEFAULT, MOTOR_READ, NUM_BUSES, SPEED_IST,
    TELEM_CAR_STATUS_CHANGE,
};
use vcu_control_unit::VcuError;
use vcu_control_unit::bms::Bms;
use vcu_control_unit::board::DigitalOutput;
use vcu_control_unit::bus::CanBuses;
use vcu_control_unit::pedal::Pedal;
use vcu_control_unit::scheduler::VcuTask;
use vcu_control_unit::sim::SimBus;

use super::{Rig, with_id};

// ── Helpers ─────────────────────────────────────────────────────────

fn single_bus_config() -> VcuConfig {
    let mut cfg = VcuConfig::default();
    cfg.buses = BusMapConfig {
        motor: 0,
        bms: 0,
        datalogger: 0,
    };
    cfg
}

fn status(r: &Rig) -> CarStatus {
    r.vcu.car().car_status()
}

/// One controller behind every role, with both filters installed.
fn shared_buses(cfg: &VcuConfig) -> (CanBuses, SimBus, Pedal, Bms) {
    let sim = SimBus::new();
    let boxed: [Box<dyn CanBus>; NUM_BUSES] =
        core::array::from_fn(|_| Box::new(sim.clone()) as Box<dyn CanBus>);
    let mut buses = CanBuses::new(boxed, cfg.buses).unwrap();
    let mut pedal = Pedal::new(cfg);
    let mut bms = Bms::new();
    pedal.init_filter(&mut buses.role(BusRole::Motor));
    bms.init_filter(&mut buses.role(BusRole::Bms));
    (buses, sim, pedal, bms)
}

fn speed_reply(rpm: i16) -> CanFrame {
    let [lo, hi] = rpm.to_le_bytes();
    CanFrame::new(CanId::Standard(MOTOR_READ), &[SPEED_IST, lo, hi, 0]).unwrap()
}

fn bms_run() -> CanFrame {
    let mut data = [0u8; 8];
    data[BMS_STATE_BYTE] = 0x50;
    CanFrame::from_array(CanId::Extended(BMS_INFO_EXT), data, 8)
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn bus_map_past_last_bus_is_rejected() {
    let buses: [Box<dyn CanBus>; NUM_BUSES] =
        core::array::from_fn(|_| Box::new(SimBus::new()) as Box<dyn CanBus>);
    let map = BusMapConfig {
        motor: 0,
        bms: NUM_BUSES,
        datalogger: 0,
    };
    let err = CanBuses::new(buses, map).err().unwrap();
    assert!(matches!(
        err,
        VcuError::BusMap {
            role: BusRole::Bms,
            index: NUM_BUSES
        }
    ));
}

#[test]
fn shared_bus_carries_both_filters() {
    let r = Rig::aliased(&single_bus_config(), 2);
    let filters = r.sims[0].filters();
    assert!(filters.contains(&CanFilter::standard(MOTOR_READ)));
    assert!(filters.contains(&CanFilter::extended(BMS_INFO_EXT)));
    assert_eq!(r.vcu.scheduler().task_count(0), 4);
    assert_eq!(r.vcu.scheduler().task_count(1), 0);
}

#[test]
fn start_sequence_on_one_bus() {
    let mut r = Rig::aliased(&single_bus_config(), 2);
    r.hold_start();
    assert!(r.tick_until(5, |r| status(r) == CarStatus::Startin).is_some());
    // Every task kind now shares bus 0.
    assert_eq!(r.vcu.scheduler().task_count(0), VcuTask::ALL.len());

    let to_bussin = r.tick_until(99, |r| status(r) == CarStatus::Bussin);
    assert!(to_bussin.is_some(), "HV never confirmed on the shared bus");
    assert!(r.vcu.car().pedal.status.contains(StatusFlags::HV_READY));
    assert!(!r.vcu.scheduler().contains(0, VcuTask::BmsPoll));

    assert!(r.tick_until(250, |r| status(r) == CarStatus::Drive).is_some());
    assert!(r.vcu.board().output(DigitalOutput::DriveEnable));
    // Inverter frames interleave with BMS frames but never go stale.
    assert!(!r.vcu.car().pedal.status.contains(StatusFlags::MOTOR_NO_READ));

    let changes = with_id(&r.sims[0].sent(), CanId::Standard(TELEM_CAR_STATUS_CHANGE));
    assert_eq!(changes.len(), 3);
}

#[test]
fn bms_poll_leaves_inverter_reply_for_motor_read() {
    let cfg = single_bus_config();
    let (mut buses, sim, mut pedal, mut bms) = shared_buses(&cfg);
    let mut car = CarState::new();

    // The speed reply is queued ahead of the BMS status.
    sim.inject(speed_reply(1_500));
    sim.inject(bms_run());

    bms.check_hv(&mut car, &mut buses.role(BusRole::Bms));
    assert!(car.pedal.status.contains(StatusFlags::HV_READY));
    assert!(!car.pedal.status.contains(StatusFlags::BMS_NO_MSG));
    assert_eq!(buses.parked(BusRole::Motor), 1);

    // Past the staleness window: only the parked reply keeps speed fresh.
    car.millis = MAX_MOTOR_READ_MILLIS_DEFAULT + 50;
    pedal.read_motor(&mut car, &mut buses.role(BusRole::Motor));
    assert_eq!(car.motor.motor_rpm, 1_500);
    assert!(!car.pedal.status.contains(StatusFlags::MOTOR_NO_READ));
    assert_eq!(sim.pending(), 0);
}

#[test]
fn motor_read_leaves_bms_status_for_poll() {
    let cfg = single_bus_config();
    let (mut buses, sim, mut pedal, mut bms) = shared_buses(&cfg);
    let mut car = CarState::new();

    sim.inject(bms_run());
    sim.inject(speed_reply(-800));

    pedal.read_motor(&mut car, &mut buses.role(BusRole::Motor));
    assert_eq!(car.motor.motor_rpm, -800);
    bms.check_hv(&mut car, &mut buses.role(BusRole::Bms));
    assert!(car.pedal.status.contains(StatusFlags::HV_READY));
}
