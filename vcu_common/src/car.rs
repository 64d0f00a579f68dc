//! Car-level shared types.
//!
//! Everything the control components read and write during one loop
//! iteration lives here: the `CarState` aggregate, its status and fault
//! bitflags, the car/BMS state enums, and the configuration structures.

pub mod config;
pub mod data;
pub mod flags;
pub mod state;
