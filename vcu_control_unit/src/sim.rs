//! Host simulation backends.
//!
//! Stand-ins for the board, the CAN controllers, time and the other nodes
//! on the car, so the full loop runs and tests without hardware.

pub mod board;
pub mod bus;
pub mod clock;
pub mod plant;

pub use board::SimBoard;
pub use bus::{Responder, SimBus};
pub use clock::SimClock;
pub use plant::{BmsResponder, InverterResponder, NodeSet, ScriptedDriver};
