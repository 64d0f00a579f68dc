//! Prelude module for common re-exports.
//!
//! `use vcu_common::prelude::*;` brings in the car state, its flags and
//! enums, the CAN types and the configuration root.
//!
//! # Usage
//!
//! ```rust
//! use vcu_common::prelude::*;
//!
//! let car = CarState::new();
//! assert_eq!(car.car_status(), CarStatus::Init);
//! ```

// ─── Car State ──────────────────────────────────────────────────────
pub use crate::car::data::{BmsData, CarState, MotorData, PedalData, PedalStatus};
pub use crate::car::flags::{PedalFaults, StatusFlags};
pub use crate::car::state::{BmsState, CarStatus};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::car::config::{BusMapConfig, BusRole, VcuConfig};
pub use crate::config::{ConfigError, ConfigLoader, LogLevel};

// ─── CAN ────────────────────────────────────────────────────────────
pub use crate::can::{BusError, BusMode, CanBus, CanFilter, CanFrame, CanId};

// ─── Curves ─────────────────────────────────────────────────────────
pub use crate::interp::InterpTable;
