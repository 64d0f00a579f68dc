//! CAN transport trait and error types.

use thiserror::Error;

use super::frame::{CanFrame, CanId};

/// Error types for CAN transport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    /// All transmit buffers are occupied.
    #[error("transmit buffers full")]
    TxBusy,

    /// Filter or mask change attempted outside configuration mode.
    #[error("controller not in configuration mode")]
    NotInConfigMode,

    /// Controller refused the filter.
    #[error("filter rejected: {0}")]
    FilterRejected(&'static str),

    /// Controller or bus fault.
    #[error("bus failure: {0}")]
    Failed(&'static str),
}

/// Controller operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusMode {
    /// Filters and masks may be changed; no traffic.
    Config,
    /// Normal send/receive.
    #[default]
    Normal,
}

/// Receive acceptance filter: a frame passes when
/// `(frame_id & mask) == (id & mask)` and the id kinds match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFilter {
    pub id: u32,
    pub mask: u32,
    pub extended: bool,
}

impl CanFilter {
    /// Exact match on a standard id.
    pub const fn standard(id: u16) -> Self {
        Self {
            id: id as u32,
            mask: CanId::STANDARD_MAX as u32,
            extended: false,
        }
    }

    /// Exact match on an extended id.
    pub const fn extended(id: u32) -> Self {
        Self {
            id,
            mask: CanId::EXTENDED_MAX,
            extended: true,
        }
    }

    /// Whether a frame id passes this filter.
    #[inline]
    pub const fn matches(&self, id: CanId) -> bool {
        id.is_extended() == self.extended && (id.raw() & self.mask) == (self.id & self.mask)
    }
}

/// Trait defining one CAN controller as seen by the control core.
///
/// # Contract
///
/// - `send` never blocks; a full controller returns `BusError::TxBusy`.
/// - `receive` never blocks; `None` means no frame pending.
/// - `set_filter` is only valid in `BusMode::Config`.
pub trait CanBus {
    /// Queue a frame for transmission.
    fn send(&mut self, frame: &CanFrame) -> Result<(), BusError>;

    /// Pop one received frame, if any.
    fn receive(&mut self) -> Option<CanFrame>;

    /// Install a receive acceptance filter.
    fn set_filter(&mut self, filter: CanFilter) -> Result<(), BusError>;

    /// Switch controller mode.
    fn set_mode(&mut self, mode: BusMode) -> Result<(), BusError>;
}
