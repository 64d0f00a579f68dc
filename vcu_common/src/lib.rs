//! VCU Common Library
//!
//! Shared types for the vehicle control unit workspace: the `CarState`
//! aggregate every component reads and writes, CAN framing and the bus
//! trait, piecewise-linear curves, configuration loading, and the flat
//! telemetry record.
//!
//! # Module Structure
//!
//! - [`car`] - Car state, status/fault bitflags, state enums, config structs
//! - [`can`] - CAN identifiers, frames, filters and the `CanBus` trait
//! - [`interp`] - Interpolation tables for pedal curves
//! - [`config`] - TOML loading and `ConfigError`
//! - [`consts`] - CAN ids, register ids and timing defaults
//! - [`telemetry`] - Telemetry record and CSV encoding
//! - [`prelude`] - Common re-exports for convenience

pub mod can;
pub mod car;
pub mod config;
pub mod consts;
pub mod interp;
pub mod prelude;
pub mod telemetry;
