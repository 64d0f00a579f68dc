//! Pedal → torque mapping with regenerative braking.
//!
//! Regen applies only when the brake is past its curve start, regen is
//! enabled and motor speed is fresh. Pressing both pedals skips regen so
//! the brake-plausibility device can still be tested, and regen is zero
//! below the minimum speed in the direction of travel so it never drives
//! the car backwards.

use vcu_common::car::config::VcuConfig;
use vcu_common::car::data::PedalStatus;
use vcu_common::car::flags::StatusFlags;
use vcu_common::interp::InterpTable;

#[derive(Debug, Clone)]
pub struct TorqueMap {
    throttle: InterpTable,
    brake: InterpTable,
    regen_enabled: bool,
    min_regen_rpm: i32,
}

#[inline]
fn saturate(v: i32) -> i16 {
    v.clamp(-(i16::MAX as i32), i16::MAX as i32) as i16
}

impl TorqueMap {
    pub fn new(
        throttle: InterpTable,
        brake: InterpTable,
        regen_enabled: bool,
        min_regen_rpm: i32,
    ) -> Self {
        Self {
            throttle,
            brake,
            regen_enabled,
            min_regen_rpm,
        }
    }

    pub fn from_config(cfg: &VcuConfig) -> Self {
        Self::new(
            cfg.curves.throttle.clone(),
            cfg.curves.brake.clone(),
            cfg.regen.enabled,
            cfg.regen.min_regen_rpm_val(),
        )
    }

    /// Throttle dead-zone edge.
    #[inline]
    pub fn throttle_start(&self) -> i32 {
        self.throttle.start()
    }

    /// Brake threshold above which regen may engage.
    #[inline]
    pub fn brake_start(&self) -> i32 {
        self.brake.start()
    }

    #[inline]
    pub const fn min_regen_rpm(&self) -> i32 {
        self.min_regen_rpm
    }

    /// Map filtered pedal and brake readings to a signed torque request.
    ///
    /// Reads `MOTOR_NO_READ` and writes `BOTH_PEDALS` in `status`.
    pub fn torque(
        &self,
        pedal: u16,
        brake: u16,
        motor_rpm: i16,
        flip_dir: bool,
        status: &mut PedalStatus,
    ) -> i16 {
        let regen = self.regen_enabled
            && brake as i32 > self.brake.start()
            && !status.contains(StatusFlags::MOTOR_NO_READ);
        let both_pedals = regen && pedal as i32 > self.throttle.start();
        status.set(StatusFlags::BOTH_PEDALS, both_pedals);

        if regen && !both_pedals {
            let rpm = motor_rpm as i32;
            let regen_torque = self.brake.interp(brake as i32);
            return if !flip_dir {
                if rpm < self.min_regen_rpm {
                    0
                } else {
                    saturate(regen_torque)
                }
            } else if rpm > -self.min_regen_rpm {
                0
            } else {
                saturate(-regen_torque)
            };
        }

        let drive = self.throttle.interp(pedal as i32);
        if flip_dir {
            saturate(-drive)
        } else {
            saturate(drive)
        }
    }
}
