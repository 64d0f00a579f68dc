//! Telemetry channels on the datalogger bus.
//!
//! All multi-byte fields are little-endian.
//!
//! ```text
//! id     channel             payload
//! 0x690  throttle in         apps_5v:u16 apps_3v3:u16 brake:u16
//! 0x691  throttle out        torque:i16 rpm:i16 error:u16 warn:u16
//! 0x692  throttle fault      faults:u8 delta:i16
//! 0x693  car status          status_byte:u8 car_status:u8
//! 0x694  car status change   from:u8 to:u8 millis:u32
//! 0x695  brake status        pressed:u8 brake:u16
//! 0x696  BMS status          raw 8 bytes of the last BMS frame
//! 0x697  hall sensor         hall:u16
//! ```

use tracing::trace;
use vcu_common::can::{CanBus, CanFrame, CanId};
use vcu_common::car::data::CarState;
use vcu_common::car::state::CarStatus;
use vcu_common::consts::{
    TELEM_BMS_STATUS, TELEM_BRAKE_STATUS, TELEM_CAR_STATUS, TELEM_CAR_STATUS_CHANGE,
    TELEM_HALL_SENSOR, TELEM_THROTTLE_FAULT, TELEM_THROTTLE_IN, TELEM_THROTTLE_OUT,
};

// ─── Payload Builders ───────────────────────────────────────────────

fn frame(id: u16, data: [u8; 8], len: u8) -> CanFrame {
    CanFrame::from_array(CanId::Standard(id), data, len)
}

pub fn throttle_in(car: &CarState) -> CanFrame {
    let [a, b] = car.pedal.apps_5v.to_le_bytes();
    let [c, d] = car.pedal.apps_3v3.to_le_bytes();
    let [e, f] = car.pedal.brake.to_le_bytes();
    frame(TELEM_THROTTLE_IN, [a, b, c, d, e, f, 0, 0], 6)
}

pub fn throttle_out(car: &CarState) -> CanFrame {
    let m = &car.motor;
    let [a, b] = m.torque_val.to_le_bytes();
    let [c, d] = m.motor_rpm.to_le_bytes();
    let [e, f] = m.motor_error.to_le_bytes();
    let [g, h] = m.motor_warn.to_le_bytes();
    frame(TELEM_THROTTLE_OUT, [a, b, c, d, e, f, g, h], 8)
}

pub fn throttle_fault(car: &CarState, delta: i16) -> CanFrame {
    let [lo, hi] = delta.to_le_bytes();
    frame(
        TELEM_THROTTLE_FAULT,
        [car.pedal.faults.bits(), lo, hi, 0, 0, 0, 0, 0],
        3,
    )
}

pub fn car_status(car: &CarState) -> CanFrame {
    frame(
        TELEM_CAR_STATUS,
        [
            car.pedal.status.status_byte(),
            car.car_status().as_u8(),
            0,
            0,
            0,
            0,
            0,
            0,
        ],
        2,
    )
}

pub fn car_status_change(from: CarStatus, to: CarStatus, millis: u32) -> CanFrame {
    let [a, b, c, d] = millis.to_le_bytes();
    frame(
        TELEM_CAR_STATUS_CHANGE,
        [from.as_u8(), to.as_u8(), a, b, c, d, 0, 0],
        6,
    )
}

pub fn brake_status(car: &CarState, pressed: bool) -> CanFrame {
    let [lo, hi] = car.pedal.brake.to_le_bytes();
    frame(
        TELEM_BRAKE_STATUS,
        [pressed as u8, lo, hi, 0, 0, 0, 0, 0],
        3,
    )
}

pub fn bms_status(car: &CarState) -> CanFrame {
    frame(TELEM_BMS_STATUS, car.bms.data, 8)
}

pub fn hall_sensor(car: &CarState) -> CanFrame {
    let [lo, hi] = car.pedal.hall_sensor.to_le_bytes();
    frame(TELEM_HALL_SENSOR, [lo, hi, 0, 0, 0, 0, 0, 0], 2)
}

// ─── Publisher ──────────────────────────────────────────────────────

/// Sends telemetry frames. Failed sends are dropped; the datalogger is
/// best effort.
#[derive(Debug, Clone, Copy)]
pub struct Telemetry {
    brake_threshold: i32,
    sent: u64,
    dropped: u64,
}

impl Telemetry {
    /// `brake_threshold` is the brake curve start, the same edge that
    /// drives the brake light.
    pub const fn new(brake_threshold: i32) -> Self {
        Self {
            brake_threshold,
            sent: 0,
            dropped: 0,
        }
    }

    #[inline]
    pub const fn sent(&self) -> u64 {
        self.sent
    }

    #[inline]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Filtered brake at or above the threshold.
    #[inline]
    pub fn brake_pressed(&self, car: &CarState) -> bool {
        car.pedal.brake as i32 >= self.brake_threshold
    }

    fn emit(&mut self, bus: &mut dyn CanBus, frame: &CanFrame) {
        match bus.send(frame) {
            Ok(()) => self.sent += 1,
            Err(e) => {
                self.dropped += 1;
                trace!(id = ?frame.id(), error = %e, "telemetry frame dropped");
            }
        }
    }

    /// Pedal inputs, faults, car status, brake and hall sensor.
    pub fn send_pedal(&mut self, car: &CarState, delta: i16, bus: &mut dyn CanBus) {
        let pressed = self.brake_pressed(car);
        for f in [
            throttle_in(car),
            throttle_fault(car, delta),
            car_status(car),
            brake_status(car, pressed),
            hall_sensor(car),
        ] {
            self.emit(bus, &f);
        }
    }

    /// Torque command and inverter feedback.
    pub fn send_motor(&mut self, car: &CarState, bus: &mut dyn CanBus) {
        self.emit(bus, &throttle_out(car));
    }

    /// Last BMS status frame.
    pub fn send_bms(&mut self, car: &CarState, bus: &mut dyn CanBus) {
        self.emit(bus, &bms_status(car));
    }

    pub fn send_status_change(
        &mut self,
        from: CarStatus,
        to: CarStatus,
        millis: u32,
        bus: &mut dyn CanBus,
    ) {
        self.emit(bus, &car_status_change(from, to, millis));
    }
}
