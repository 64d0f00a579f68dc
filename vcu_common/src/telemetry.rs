//! Flat per-tick telemetry record.
//!
//! One record is a snapshot of `CarState` in a fixed column order, written
//! as one CSV line. No schema versioning; the header names the columns.

use std::io::{self, Write};

use crate::car::data::CarState;

/// CSV header matching [`TelemetryRecord::write_csv`] column order.
pub const CSV_HEADER: &str = "millis,apps_5v,apps_3v3,brake,hall_sensor,status,faults,\
torque,motor_rpm,motor_error,motor_warn,bms0,bms1,bms2,bms3,bms4,bms5,bms6,bms7";

/// One flat telemetry sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub millis: u32,
    pub apps_5v: u16,
    pub apps_3v3: u16,
    pub brake: u16,
    pub hall_sensor: u16,
    /// Packed status byte (see `PedalStatus::status_byte`).
    pub status: u8,
    pub faults: u8,
    pub torque: i16,
    pub motor_rpm: i16,
    pub motor_error: u16,
    pub motor_warn: u16,
    pub bms: [u8; 8],
}

impl TelemetryRecord {
    /// Snapshot the car state.
    pub fn from_car(car: &CarState) -> Self {
        Self {
            millis: car.millis,
            apps_5v: car.pedal.apps_5v,
            apps_3v3: car.pedal.apps_3v3,
            brake: car.pedal.brake,
            hall_sensor: car.pedal.hall_sensor,
            status: car.pedal.status.status_byte(),
            faults: car.pedal.faults.bits(),
            torque: car.motor.torque_val,
            motor_rpm: car.motor.motor_rpm,
            motor_error: car.motor.motor_error,
            motor_warn: car.motor.motor_warn,
            bms: car.bms.data,
        }
    }

    /// Write the record as one CSV line, newline terminated.
    pub fn write_csv<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(
            w,
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.millis,
            self.apps_5v,
            self.apps_3v3,
            self.brake,
            self.hall_sensor,
            self.status,
            self.faults,
            self.torque,
            self.motor_rpm,
            self.motor_error,
            self.motor_warn,
        )?;
        for b in self.bms {
            write!(w, ",{b}")?;
        }
        writeln!(w)
    }
}
