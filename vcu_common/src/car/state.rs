//! State enums for the car supervisor and the BMS handshake.
//!
//! All enums use `#[repr(u8)]` so they travel in telemetry frames as a
//! single byte.

use serde::{Deserialize, Serialize};

// ─── Car Status ─────────────────────────────────────────────────────

/// Top-level drivability state.
///
/// Strictly ordered lifecycle `Init → Startin → Bussin → Drive`; any fault
/// returns to `Init`. `Unknown` is the defensive fallback for a value that
/// does not decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CarStatus {
    /// Drive inhibited.
    Init = 0,
    /// Button and brake held, waiting for HV.
    Startin = 1,
    /// Ready-to-drive buzzer sounding.
    Bussin = 2,
    /// Torque requests forwarded to the inverter.
    Drive = 3,
    /// Undecodable state.
    Unknown = 0xFF,
}

impl CarStatus {
    /// Convert from raw `u8`. Unrecognised values map to `Unknown`.
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Init,
            1 => Self::Startin,
            2 => Self::Bussin,
            3 => Self::Drive,
            _ => Self::Unknown,
        }
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Short name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Startin => "STARTIN",
            Self::Bussin => "BUSSIN",
            Self::Drive => "DRIVE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl Default for CarStatus {
    fn default() -> Self {
        Self::Init
    }
}

impl core::fmt::Display for CarStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ─── BMS State ──────────────────────────────────────────────────────

/// Pack state reported in the high nibble of status byte 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BmsState {
    /// Contactors open, ready to accept start-HV.
    Standby = 0x3,
    /// Precharge in progress.
    Precharge = 0x4,
    /// Contactors closed, HV on the bus.
    Run = 0x5,
}

impl BmsState {
    /// Decode from the raw status byte. Returns `None` for nibbles the
    /// handshake does not act on.
    #[inline]
    pub const fn from_status_byte(byte: u8) -> Option<Self> {
        match byte >> 4 {
            0x3 => Some(Self::Standby),
            0x4 => Some(Self::Precharge),
            0x5 => Some(Self::Run),
            _ => None,
        }
    }
}
