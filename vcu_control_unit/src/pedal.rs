//! Pedal subsystem.
//!
//! - `filter`: moving averages over the raw ADC channels
//! - `crosscheck`: range faults and APPS plausibility debounce
//! - `torque`: pedal/brake → torque with regen
//! - `motor`: inverter frame builders and decoder
//! - `subsystem`: the [`Pedal`] component tying them together

pub mod crosscheck;
pub mod filter;
pub mod motor;
pub mod subsystem;
pub mod torque;

pub use crosscheck::{CrossCheck, CrossCheckSample, RangeLimits};
pub use filter::{FILTER_WINDOW, MovingAverage};
pub use motor::MotorReading;
pub use subsystem::Pedal;
pub use torque::TorqueMap;
