//! The shared `CarState` aggregate.
//!
//! One instance exists per VCU. It is owned by the supervisor and lent by
//! `&mut` to whichever component runs, so no field is ever observed
//! half-written.

use static_assertions::const_assert;

use super::flags::{PedalFaults, StatusFlags};
use super::state::{BmsState, CarStatus};
use crate::consts::BMS_STATE_BYTE;

// ─── Pedal ──────────────────────────────────────────────────────────

/// Status bits plus the supervisor state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PedalStatus {
    pub flags: StatusFlags,
    pub car_status: CarStatus,
}

impl PedalStatus {
    /// Packed telemetry byte: six flag bits in the low bits, car status in
    /// bits 6..=7. `Unknown` has no two-bit encoding and packs as `Init`.
    #[inline]
    pub fn status_byte(&self) -> u8 {
        let state = match self.car_status {
            CarStatus::Unknown => 0,
            s => s.as_u8() & 0x03,
        };
        (self.flags.bits() & 0x3F) | (state << 6)
    }

    #[inline]
    pub fn contains(&self, flag: StatusFlags) -> bool {
        self.flags.contains(flag)
    }

    #[inline]
    pub fn set(&mut self, flag: StatusFlags, value: bool) {
        self.flags.set(flag, value);
    }
}

/// Filtered pedal readings and pedal-owned bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PedalData {
    /// Filtered APPS 5V reading, also the final pedal value.
    pub apps_5v: u16,
    /// Filtered APPS 3V3 reading.
    pub apps_3v3: u16,
    /// Filtered brake pressure reading.
    pub brake: u16,
    /// Raw hall sensor reading.
    pub hall_sensor: u16,
    pub status: PedalStatus,
    pub faults: PedalFaults,
}

// ─── Motor ──────────────────────────────────────────────────────────

/// Last torque command and inverter feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorData {
    /// Last commanded torque, normalised to ±32767.
    pub torque_val: i16,
    /// Last read speed, normalised to ±32767.
    pub motor_rpm: i16,
    pub motor_error: u16,
    pub motor_warn: u16,
}

// ─── BMS ────────────────────────────────────────────────────────────

/// Raw bytes of the last BMS status frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BmsData {
    pub data: [u8; 8],
}

impl BmsData {
    /// Pack state decoded from the stored frame.
    #[inline]
    pub const fn state(&self) -> Option<BmsState> {
        BmsState::from_status_byte(self.data[BMS_STATE_BYTE])
    }
}

// ─── Aggregate ──────────────────────────────────────────────────────

/// Everything the control components share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarState {
    /// Milliseconds snapshot for this iteration (wrapping).
    pub millis: u32,
    /// `millis` at the last supervisor state entry.
    pub status_millis: u32,
    pub pedal: PedalData,
    pub motor: MotorData,
    pub bms: BmsData,
}

const_assert!(core::mem::size_of::<CarState>() <= 64);

impl CarState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn car_status(&self) -> CarStatus {
        self.pedal.status.car_status
    }

    #[inline]
    pub fn flags(&self) -> StatusFlags {
        self.pedal.status.flags
    }

    /// Milliseconds since the last state entry, wraparound safe.
    #[inline]
    pub fn millis_in_status(&self) -> u32 {
        self.millis.wrapping_sub(self.status_millis)
    }
}
