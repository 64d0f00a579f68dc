//! CAN transport abstraction.
//!
//! This module defines:
//! - `CanFrame` / `CanId` - Frame value type shared by all components
//! - `CanBus` trait - Interface for pluggable per-controller transports
//! - `BusError` enum - Transport error types
//!
//! The control core never touches a controller directly; it only sees
//! `&mut dyn CanBus` for the bus role it is servicing.

pub mod bus;
pub mod frame;

pub use bus::{BusError, BusMode, CanBus, CanFilter};
pub use frame::{CanFrame, CanId};
