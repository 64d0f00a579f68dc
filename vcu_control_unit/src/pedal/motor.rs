//! Inverter wire protocol.
//!
//! Requests go out on [`MOTOR_SEND`], responses come back on [`MOTOR_READ`].
//! Every response starts with the register id it carries.
//!
//! ```text
//! cyclic read request  [0x3D, reg, period_ms]
//! torque setpoint      [0x90, lo, hi]
//! speed response       [0x30, lo, hi, ..]
//! warn/err response    [0x8F, err_lo, err_hi, warn_lo, warn_hi]
//! ```

use vcu_common::can::{CanFrame, CanId};
use vcu_common::consts::{MOTOR_READ, MOTOR_SEND, REGID_READ, SPEED_IST, TORQUE_CMD, WARN_ERR};

/// Decoded inverter response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorReading {
    Speed(i16),
    WarnErr { error: u16, warn: u16 },
}

/// Request periodic reports of `reg` every `period_ms`.
pub const fn cyclic_read_request(reg: u8, period_ms: u8) -> CanFrame {
    CanFrame::from_array(
        CanId::Standard(MOTOR_SEND),
        [REGID_READ, reg, period_ms, 0, 0, 0, 0, 0],
        3,
    )
}

/// Torque setpoint frame.
pub const fn torque_frame(torque: i16) -> CanFrame {
    let [lo, hi] = torque.to_le_bytes();
    CanFrame::from_array(
        CanId::Standard(MOTOR_SEND),
        [TORQUE_CMD, lo, hi, 0, 0, 0, 0, 0],
        3,
    )
}

/// Zero-torque setpoint.
pub const STOP_FRAME: CanFrame = torque_frame(0);

/// A response frame is on the read id and longer than three bytes.
#[inline]
fn is_response(frame: &CanFrame) -> bool {
    frame.id() == CanId::Standard(MOTOR_READ) && frame.len() > 3
}

/// Whether `frame` confirms a cyclic read of `reg`.
pub fn confirms(frame: &CanFrame, reg: u8) -> bool {
    is_response(frame) && frame.raw_data()[0] == reg
}

/// Decode a speed or warn/err response; anything else is `None`.
pub fn decode(frame: &CanFrame) -> Option<MotorReading> {
    if !is_response(frame) {
        return None;
    }
    match frame.raw_data()[0] {
        SPEED_IST => frame.i16_le(1).map(MotorReading::Speed),
        WARN_ERR => Some(MotorReading::WarnErr {
            error: frame.u16_le(1)?,
            // Short replies carry no warn word.
            warn: frame.u16_le(3).unwrap_or(0),
        }),
        _ => None,
    }
}
