//! Pedal subsystem: sampling, plausibility, torque requests and inverter
//! feedback.
//!
//! # Ownership
//!
//! Writes `car.pedal` (filtered values, faults, `FORCE_STOP`,
//! `MOTOR_NO_READ`, `BOTH_PEDALS`) and `car.motor`. Reads `car_status` and
//! `millis` only.

use tracing::{debug, info, trace, warn};
use vcu_common::can::{BusMode, CanBus, CanFilter};
use vcu_common::car::config::VcuConfig;
use vcu_common::car::data::CarState;
use vcu_common::car::flags::{PedalFaults, StatusFlags};
use vcu_common::car::state::CarStatus;
use vcu_common::consts::{MOTOR_READ, SPEED_IST, WARN_ERR};

use super::crosscheck::{CrossCheck, RangeLimits};
use super::filter::{FILTER_WINDOW, MovingAverage};
use super::motor::{self, MotorReading, STOP_FRAME};
use super::torque::TorqueMap;
use crate::bus::retry_until_ok;

/// Pedal sampling and torque control.
#[derive(Debug, Clone)]
pub struct Pedal {
    apps_5v: MovingAverage<FILTER_WINDOW>,
    apps_3v3: MovingAverage<FILTER_WINDOW>,
    brake: MovingAverage<FILTER_WINDOW>,
    limits: RangeLimits,
    crosscheck: CrossCheck,
    torque: TorqueMap,
    flip_dir: bool,
    rpm_period_ms: u8,
    err_period_ms: u8,
    max_motor_read_millis: u32,
    got_speed: bool,
    got_error: bool,
    last_motor_read_millis: u32,
    last_delta: i16,
}

impl Pedal {
    pub fn new(cfg: &VcuConfig) -> Self {
        Self {
            apps_5v: MovingAverage::new(),
            apps_3v3: MovingAverage::new(),
            brake: MovingAverage::new(),
            limits: RangeLimits {
                apps_5v: cfg.pedal.apps_5v,
                apps_3v3: cfg.pedal.apps_3v3,
                brake: cfg.pedal.brake,
            },
            crosscheck: CrossCheck::from_config(cfg),
            torque: TorqueMap::from_config(cfg),
            flip_dir: cfg.regen.flip_motor_dir,
            rpm_period_ms: cfg.motor.rpm_period_ms,
            err_period_ms: cfg.motor.err_period_ms,
            max_motor_read_millis: cfg.pedal.max_motor_read_millis,
            got_speed: false,
            got_error: false,
            last_motor_read_millis: 0,
            last_delta: 0,
        }
    }

    #[inline]
    pub fn torque_map(&self) -> &TorqueMap {
        &self.torque
    }

    /// Signed APPS cross-check delta from the last `update`.
    #[inline]
    pub const fn last_delta(&self) -> i16 {
        self.last_delta
    }

    /// Both cyclic reads confirmed by the inverter.
    #[inline]
    pub const fn motor_ready(&self) -> bool {
        self.got_speed && self.got_error
    }

    // ─── Sampling ───────────────────────────────────────────────────

    /// Feed one raw sample per channel and update the fault byte.
    pub fn update(&mut self, car: &mut CarState, pedal_1: u16, pedal_2: u16, brake: u16) {
        self.apps_5v.add_sample(pedal_1);
        self.apps_3v3.add_sample(pedal_2);
        self.brake.add_sample(brake);

        let faults = &mut car.pedal.faults;
        let range = self.limits.check(pedal_1, pedal_2, brake);
        if !range.is_empty() && !faults.contains(range) {
            warn!(
                apps_5v = pedal_1,
                apps_3v3 = pedal_2,
                brake,
                faults = ?range,
                "pedal sensor out of range"
            );
        }
        faults.insert(range);

        let sample = self
            .crosscheck
            .evaluate(self.apps_5v.filtered(), self.apps_3v3.filtered());
        self.last_delta = sample.delta;
        let had_active = faults.contains(PedalFaults::FAULT_ACTIVE);
        let exceeded = self.crosscheck.debounce(faults, sample.diverged, car.millis);
        if sample.diverged && !had_active {
            debug!(delta = sample.delta, "APPS divergence detected");
        }

        if (exceeded || faults.requires_force_stop())
            && !car.pedal.status.contains(StatusFlags::FORCE_STOP)
        {
            warn!(faults = ?car.pedal.faults, delta = sample.delta, "pedal fault: force stop");
            car.pedal.status.set(StatusFlags::FORCE_STOP, true);
        }
    }

    /// Clear faults, the force-stop latch and the debounce window.
    pub fn reset_faults(&mut self, car: &mut CarState) {
        car.pedal.faults = PedalFaults::empty();
        car.pedal.status.set(StatusFlags::FORCE_STOP, false);
        self.crosscheck.reset();
        self.apps_5v.reset();
        self.apps_3v3.reset();
        self.brake.reset();
        self.last_delta = 0;
    }

    // ─── Torque ─────────────────────────────────────────────────────

    /// Publish filtered values and send this tick's torque frame.
    ///
    /// Outside `Drive` the stop frame is sent and no torque is computed.
    pub fn send_frame(&mut self, car: &mut CarState, bus: &mut dyn CanBus) {
        car.pedal.apps_5v = self.apps_5v.filtered();
        car.pedal.apps_3v3 = self.apps_3v3.filtered();
        car.pedal.brake = self.brake.filtered();

        let frame = if car.car_status() != CarStatus::Drive {
            car.motor.torque_val = 0;
            STOP_FRAME
        } else {
            let torque = self.torque.torque(
                car.pedal.apps_5v,
                car.pedal.brake,
                car.motor.motor_rpm,
                self.flip_dir,
                &mut car.pedal.status,
            );
            car.motor.torque_val = torque;
            motor::torque_frame(torque)
        };

        if let Err(e) = bus.send(&frame) {
            debug!(error = %e, "torque frame dropped");
        }
    }

    // ─── Inverter Feedback ──────────────────────────────────────────

    /// Consume at most one inverter frame and track speed staleness.
    pub fn read_motor(&mut self, car: &mut CarState, bus: &mut dyn CanBus) {
        if let Some(frame) = bus.receive() {
            match motor::decode(&frame) {
                Some(MotorReading::Speed(rpm)) => {
                    car.motor.motor_rpm = rpm;
                    self.last_motor_read_millis = car.millis;
                    car.pedal.status.set(StatusFlags::MOTOR_NO_READ, false);
                    return;
                }
                Some(MotorReading::WarnErr { error, warn }) => {
                    if error != car.motor.motor_error {
                        debug!(error, warn, "inverter warn/err word changed");
                    }
                    car.motor.motor_error = error;
                    car.motor.motor_warn = warn;
                    return;
                }
                None => trace!(id = ?frame.id(), "ignored frame on motor bus"),
            }
        }

        let age = car.millis.wrapping_sub(self.last_motor_read_millis);
        if age > self.max_motor_read_millis && !car.pedal.status.contains(StatusFlags::MOTOR_NO_READ)
        {
            debug!(age_ms = age, "motor speed stale");
            car.pedal.status.set(StatusFlags::MOTOR_NO_READ, true);
        }
    }

    // ─── Init ───────────────────────────────────────────────────────

    /// Accept only inverter responses on the motor bus.
    pub fn init_filter(&mut self, bus: &mut dyn CanBus) {
        retry_until_ok("motor bus config mode", || bus.set_mode(BusMode::Config));
        retry_until_ok("motor response filter", || {
            bus.set_filter(CanFilter::standard(MOTOR_READ))
        });
        retry_until_ok("motor bus normal mode", || bus.set_mode(BusMode::Normal));
    }

    /// One round of the cyclic-read handshake. Returns `true` once both
    /// registers are confirmed; call until it does.
    pub fn init_motor(&mut self, bus: &mut dyn CanBus) -> bool {
        let registers = [
            (SPEED_IST, self.rpm_period_ms, &mut self.got_speed),
            (WARN_ERR, self.err_period_ms, &mut self.got_error),
        ];
        for (reg, period, confirmed) in registers {
            if *confirmed {
                continue;
            }
            let request = motor::cyclic_read_request(reg, period);
            retry_until_ok("cyclic read request", || bus.send(&request));
            if let Some(frame) = bus.receive() {
                if motor::confirms(&frame, reg) {
                    info!(reg, period_ms = period, "inverter cyclic read confirmed");
                    *confirmed = true;
                }
            }
        }
        self.motor_ready()
    }
}
