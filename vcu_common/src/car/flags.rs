//! Status and fault bitflags shared across components.
//!
//! Every status bit has exactly one writer (noted per flag) and may be
//! read by anyone. Fault bits are owned by the pedal subsystem and are
//! sticky: range checks only ever set them.

use bitflags::bitflags;

bitflags! {
    /// Mutually observable status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u8 {
        /// BMS reported Run. Writer: BMS.
        const HV_READY      = 0x01;
        /// No BMS status frame on the last poll. Writer: BMS.
        const BMS_NO_MSG    = 0x02;
        /// Latched safety stop. Writer: Pedal. **Only a full re-init clears it.**
        const FORCE_STOP    = 0x04;
        /// Motor speed not read within the staleness window. Writer: Pedal.
        const MOTOR_NO_READ = 0x08;
        /// Supervisor hit an undecodable state. Writer: Supervisor.
        const STATE_UNKNOWN = 0x10;
        /// Throttle and brake pressed together, regen skipped. Writer: Pedal.
        const BOTH_PEDALS   = 0x20;
    }
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Pedal sensor fault bits.
    ///
    /// Range bits are set from raw samples and never cleared by the range
    /// check. `FAULT_ACTIVE` tracks the live APPS cross-check, while
    /// `FAULT_EXCEEDED` latches once divergence outlasts the debounce window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PedalFaults: u8 {
        const APPS_5V_LOW    = 0x01;
        const APPS_5V_HIGH   = 0x02;
        const APPS_3V3_LOW   = 0x04;
        const APPS_3V3_HIGH  = 0x08;
        const BRAKE_LOW      = 0x10;
        const BRAKE_HIGH     = 0x20;
        /// APPS cross-check currently diverging.
        const FAULT_ACTIVE   = 0x40;
        /// Divergence persisted past the debounce window. **Forces stop.**
        const FAULT_EXCEEDED = 0x80;
    }
}

impl PedalFaults {
    /// All sensor range faults.
    pub const RANGE_MASK: Self = Self::from_bits_truncate(
        Self::APPS_5V_LOW.bits()
            | Self::APPS_5V_HIGH.bits()
            | Self::APPS_3V3_LOW.bits()
            | Self::APPS_3V3_HIGH.bits()
            | Self::BRAKE_LOW.bits()
            | Self::BRAKE_HIGH.bits(),
    );

    /// Faults that force a vehicle-wide stop.
    pub const FORCE_STOP_MASK: Self =
        Self::from_bits_truncate(Self::RANGE_MASK.bits() | Self::FAULT_EXCEEDED.bits());

    /// Returns true if any force-stop fault is set.
    #[inline]
    pub const fn requires_force_stop(&self) -> bool {
        self.intersects(Self::FORCE_STOP_MASK)
    }
}

impl Default for PedalFaults {
    fn default() -> Self {
        Self::empty()
    }
}
