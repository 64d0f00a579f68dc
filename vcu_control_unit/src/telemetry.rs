//! Datalogger output.
//!
//! [`Telemetry`] publishes `CarState` on the datalogger CAN bus;
//! [`TelemetryLog`] appends one CSV line per tick on the host.

pub mod frames;
pub mod log;

pub use frames::Telemetry;
pub use log::TelemetryLog;
