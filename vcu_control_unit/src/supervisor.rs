//! Car supervisor: the top-level drivability state machine.
//!
//! ```text
//!          button + brake            HV ready or override timeout
//!   INIT ─────────────────▶ STARTIN ─────────────────────────────▶ BUSSIN
//!    ▲  ◀── released ──────────┘                                    │
//!    │                                             buzzer dwell     ▼
//!    └──────── force stop / throttle interlock ◀──────────────── DRIVE
//! ```
//!
//! One [`Vcu::step`] is one main-loop iteration:
//!
//! 1. refresh `millis`
//! 2. sample inputs and feed the pedal subsystem
//! 3. brake light and BMS fault LED
//! 4. scheduler dispatch (torque, BMS poll, telemetry)
//! 5. hall sensor
//! 6. force-stop override (rest of the iteration skipped)
//! 7. state body (`Drive` returns here)
//! 8. throttle interlock
//!
//! The supervisor owns `CarState` and lends it by `&mut` to whichever
//! component runs; the status bits each have one writer.

use static_assertions::const_assert;
use tracing::{debug, info, warn};
use vcu_common::can::CanBus;
use vcu_common::car::config::{BusRole, MotorConfig, SupervisorConfig, TelemetryConfig, VcuConfig};
use vcu_common::car::data::CarState;
use vcu_common::car::flags::StatusFlags;
use vcu_common::car::state::CarStatus;
use vcu_common::consts::{MAX_TASKS_PER_BUS, NUM_BUSES};
use vcu_common::telemetry::TelemetryRecord;

use crate::bms::Bms;
use crate::board::{AnalogInput, Board, DigitalInput, DigitalOutput};
use crate::bus::CanBuses;
use crate::clock::MonotonicClock;
use crate::error::VcuError;
use crate::pedal::Pedal;
use crate::scheduler::{Scheduler, TaskControl, VcuTask};
use crate::telemetry::Telemetry;

/// Scheduler sized for the VCU board.
pub type VcuScheduler<C> = Scheduler<VcuTask, MAX_TASKS_PER_BUS, NUM_BUSES, C>;

// Every task kind fits on one bus when all roles alias.
const_assert!(MAX_TASKS_PER_BUS >= VcuTask::ALL.len());

/// Raw inputs sampled at the top of an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Inputs {
    apps_5v: u16,
    apps_3v3: u16,
    brake: u16,
    button: bool,
}

/// The VCU: car state, components, board and buses.
pub struct Vcu<B: Board, C: MonotonicClock> {
    car: CarState,
    board: B,
    buses: CanBuses,
    scheduler: VcuScheduler<C>,
    pedal: Pedal,
    bms: Bms,
    telemetry: Telemetry,
    supervisor: SupervisorConfig,
    motor: MotorConfig,
    telemetry_cfg: TelemetryConfig,
    bms_poll_interval: u16,
    throttle_start: i32,
    brake_start: i32,
    transitions: u64,
}

impl<B: Board, C: MonotonicClock> Vcu<B, C> {
    /// Build the VCU from a validated configuration. Nothing touches the
    /// buses until [`Vcu::init`].
    pub fn new(cfg: &VcuConfig, board: B, buses: CanBuses, clock: C) -> Result<Self, VcuError> {
        cfg.validate()?;
        let pedal = Pedal::new(cfg);
        let throttle_start = pedal.torque_map().throttle_start();
        let brake_start = pedal.torque_map().brake_start();
        let scheduler =
            VcuScheduler::new(cfg.scheduler.period_us, cfg.scheduler.spin_threshold_us, clock);
        Ok(Self {
            car: CarState::new(),
            board,
            buses,
            scheduler,
            pedal,
            bms: Bms::new(),
            telemetry: Telemetry::new(brake_start),
            supervisor: cfg.supervisor.clone(),
            motor: cfg.motor.clone(),
            telemetry_cfg: cfg.telemetry.clone(),
            bms_poll_interval: cfg.bms.poll_interval,
            throttle_start,
            brake_start,
            transitions: 0,
        })
    }

    // ─── Init ───────────────────────────────────────────────────────

    /// Bring up the buses, complete the inverter handshake and register
    /// the periodic tasks.
    ///
    /// Blocks until the inverter confirms both cyclic reads, or fails
    /// after `motor.init_attempts` rounds when that is non-zero.
    pub fn init(&mut self) -> Result<(), VcuError> {
        for out in DigitalOutput::ALL {
            self.board.write_digital(out, false);
        }

        self.pedal.init_filter(&mut self.buses.role(BusRole::Motor));
        self.bms.init_filter(&mut self.buses.role(BusRole::Bms));

        let mut rounds = 0u32;
        while !self.pedal.init_motor(&mut self.buses.role(BusRole::Motor)) {
            rounds = rounds.saturating_add(1);
            if self.motor.init_attempts != 0 && rounds >= self.motor.init_attempts {
                warn!(rounds, "inverter handshake abandoned");
                return Err(VcuError::MotorNotResponding(rounds));
            }
            if rounds == 1 {
                info!("waiting for inverter to confirm cyclic reads");
            }
        }

        let motor_bus = self.buses.index(BusRole::Motor);
        let dl_bus = self.buses.index(BusRole::Datalogger);
        let tasks = [
            (motor_bus, VcuTask::PedalCycle, self.motor.task_interval),
            (dl_bus, VcuTask::TelemetryPedal, self.telemetry_cfg.pedal_interval),
            (dl_bus, VcuTask::TelemetryMotor, self.telemetry_cfg.motor_interval),
            (dl_bus, VcuTask::TelemetryBms, self.telemetry_cfg.bms_interval),
        ];
        for (bus, task, interval) in tasks {
            if !self.scheduler.add_task(bus, task, interval) {
                return Err(VcuError::TaskRejected(task));
            }
        }

        self.car.millis = self.scheduler.clock().millis();
        self.car.status_millis = self.car.millis;
        self.car.pedal.status.car_status = CarStatus::Init;
        self.scheduler.reset_grid();
        info!(
            motor_bus,
            bms_bus = self.buses.index(BusRole::Bms),
            datalogger_bus = dl_bus,
            handshake_rounds = rounds,
            "VCU initialized"
        );
        Ok(())
    }

    /// Full re-init: clears pedal faults, the force-stop latch and the
    /// handshake bits, and returns to `Init`. The only way out of a force
    /// stop.
    pub fn reinitialize(&mut self) {
        self.car.millis = self.scheduler.clock().millis();
        self.pedal.reset_faults(&mut self.car);
        let status = &mut self.car.pedal.status;
        status.set(StatusFlags::HV_READY, false);
        status.set(StatusFlags::BMS_NO_MSG, false);
        status.set(StatusFlags::STATE_UNKNOWN, false);
        self.enter_init();
        self.scheduler.reset_grid();
        info!("VCU reinitialized");
    }

    // ─── Main Loop ──────────────────────────────────────────────────

    /// One main-loop iteration. Returns `true` if the scheduler fired.
    pub fn step(&mut self) -> bool {
        self.car.millis = self.scheduler.clock().millis();

        let inputs = self.sample();
        self.pedal
            .update(&mut self.car, inputs.apps_5v, inputs.apps_3v3, inputs.brake);

        let brake_pressed = self.brake_pressed();
        self.board.write_digital(DigitalOutput::BrakeLight, brake_pressed);
        self.board.write_digital(
            DigitalOutput::BmsFaultLed,
            self.car.pedal.status.contains(StatusFlags::BMS_NO_MSG),
        );

        let fired = self.dispatch();

        self.car.pedal.hall_sensor = self.board.read_analog(AnalogInput::HallSensor);

        if self.car.pedal.status.contains(StatusFlags::FORCE_STOP) {
            self.enter_init();
            return fired;
        }

        match self.car.car_status() {
            CarStatus::Drive => return fired,
            CarStatus::Init => {
                if inputs.button && brake_pressed {
                    self.transition(CarStatus::Startin);
                    let bms_bus = self.buses.index(BusRole::Bms);
                    if !self
                        .scheduler
                        .add_task(bms_bus, VcuTask::BmsPoll, self.bms_poll_interval)
                    {
                        warn!(bus = bms_bus, "BMS poll task rejected");
                    }
                }
            }
            CarStatus::Startin => {
                if !inputs.button || !brake_pressed {
                    debug!(button = inputs.button, brake_pressed, "start sequence released");
                    self.enter_init();
                } else if self.car.pedal.status.contains(StatusFlags::HV_READY)
                    || self.car.millis_in_status() >= self.supervisor.bms_override_millis
                {
                    if !self.car.pedal.status.contains(StatusFlags::HV_READY) {
                        warn!(
                            waited_ms = self.car.millis_in_status(),
                            "HV not confirmed, override timeout"
                        );
                    }
                    self.transition(CarStatus::Bussin);
                    self.board.write_digital(DigitalOutput::Buzzer, true);
                    self.remove_bms_poll();
                }
            }
            CarStatus::Bussin => {
                if self.car.millis_in_status() >= self.supervisor.bussin_millis {
                    self.board.write_digital(DigitalOutput::Buzzer, false);
                    self.board.write_digital(DigitalOutput::DriveEnable, true);
                    self.transition(CarStatus::Drive);
                }
            }
            CarStatus::Unknown => {
                warn!("undecodable car status, returning to INIT");
                self.car.pedal.status.set(StatusFlags::STATE_UNKNOWN, true);
                self.enter_init();
            }
        }

        if self.car.car_status() != CarStatus::Drive
            && self.car.pedal.apps_5v as i32 > self.throttle_start
        {
            if self.car.car_status() != CarStatus::Init {
                warn!(apps_5v = self.car.pedal.apps_5v, "throttle pressed before drive");
            }
            self.enter_init();
        }

        fired
    }

    fn sample(&mut self) -> Inputs {
        let b = &mut self.board;
        Inputs {
            apps_5v: b.read_analog(AnalogInput::Apps5v),
            apps_3v3: b.read_analog(AnalogInput::Apps3v3),
            brake: b.read_analog(AnalogInput::Brake),
            button: b.read_digital(DigitalInput::DriveModeButton)
                == self.supervisor.button_active_high,
        }
    }

    fn dispatch(&mut self) -> bool {
        let Self {
            car,
            buses,
            scheduler,
            pedal,
            bms,
            telemetry,
            ..
        } = self;
        scheduler.update(|_, task| {
            let mut view = buses.role(task.role());
            let bus: &mut dyn CanBus = &mut view;
            match task {
                VcuTask::PedalCycle => {
                    pedal.send_frame(car, bus);
                    pedal.read_motor(car, bus);
                }
                VcuTask::BmsPoll => {
                    if car.car_status() != CarStatus::Startin {
                        return TaskControl::Remove;
                    }
                    bms.check_hv(car, bus);
                }
                VcuTask::TelemetryPedal => telemetry.send_pedal(car, pedal.last_delta(), bus),
                VcuTask::TelemetryMotor => telemetry.send_motor(car, bus),
                VcuTask::TelemetryBms => telemetry.send_bms(car, bus),
            }
            TaskControl::Keep
        })
    }

    // ─── Transitions ────────────────────────────────────────────────

    /// Stamp `status_millis` and, on an actual change, switch state, log
    /// and report it on the datalogger bus.
    fn transition(&mut self, to: CarStatus) {
        let from = self.car.car_status();
        self.car.status_millis = self.car.millis;
        if from == to {
            return;
        }
        self.car.pedal.status.car_status = to;
        self.transitions += 1;
        info!(from = from.name(), to = to.name(), millis = self.car.millis, "car status change");
        let bus = &mut self.buses.role(BusRole::Datalogger);
        self.telemetry
            .send_status_change(from, to, self.car.millis, bus);
    }

    /// Safe state: `Init`, buzzer and drive relay off, no BMS polling.
    fn enter_init(&mut self) {
        self.transition(CarStatus::Init);
        self.board.write_digital(DigitalOutput::Buzzer, false);
        self.board.write_digital(DigitalOutput::DriveEnable, false);
        self.remove_bms_poll();
    }

    fn remove_bms_poll(&mut self) {
        let bus = self.buses.index(BusRole::Bms);
        if self.scheduler.remove_task(bus, VcuTask::BmsPoll) {
            debug!(bus, "BMS poll task removed");
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────

    /// Filtered brake at or above the brake curve start.
    #[inline]
    pub fn brake_pressed(&self) -> bool {
        self.car.pedal.brake as i32 >= self.brake_start
    }

    #[inline]
    pub fn car(&self) -> &CarState {
        &self.car
    }

    /// Mutable car state, for test harnesses and diagnostics.
    #[inline]
    pub fn car_mut(&mut self) -> &mut CarState {
        &mut self.car
    }

    #[inline]
    pub fn board(&self) -> &B {
        &self.board
    }

    #[inline]
    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    #[inline]
    pub fn scheduler(&self) -> &VcuScheduler<C> {
        &self.scheduler
    }

    #[inline]
    pub fn pedal(&self) -> &Pedal {
        &self.pedal
    }

    #[inline]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    #[inline]
    pub const fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Flat snapshot of the car for the CSV log.
    #[inline]
    pub fn record(&self) -> TelemetryRecord {
        TelemetryRecord::from_car(&self.car)
    }
}
