//! # VCU Control Unit Library
//!
//! Control core of the vehicle control unit: a cooperative single-threaded
//! loop that turns pedal readings into inverter torque requests and walks
//! the car through its start-up sequence.
//!
//! ## Components
//!
//! 1. **Scheduler**: fixed-tick, per-bus periodic task table
//! 2. **Pedal**: filtering, plausibility checks, torque map, inverter I/O
//! 3. **BMS**: high-voltage start handshake
//! 4. **Supervisor**: `Init → Startin → Bussin → Drive` state machine
//!
//! Telemetry, the host loop runner and simulation backends sit around them.
//!
//! ## Zero-Allocation Loop
//!
//! Task tables and filters are fixed-size. After `Vcu::init` the loop
//! allocates nothing, except the optional CSV log on the host.

pub mod bms;
pub mod board;
pub mod bus;
pub mod clock;
pub mod cycle;
pub mod error;
pub mod pedal;
pub mod scheduler;
pub mod sim;
pub mod supervisor;
pub mod telemetry;

pub use error::VcuError;
pub use supervisor::{Vcu, VcuScheduler};
