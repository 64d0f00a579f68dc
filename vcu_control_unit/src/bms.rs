//! BMS high-voltage handshake.
//!
//! Polled from the scheduler while the car is in `Startin`. Each poll reads
//! at most one status frame and answers it:
//!
//! ```text
//! state nibble   action
//! 0x3 Standby    send start-HV
//! 0x4 Precharge  send start-HV again
//! 0x5 Run        HV_READY
//! other          nothing
//! ```
//!
//! Writes `car.bms` and the `HV_READY` / `BMS_NO_MSG` bits only.

use tracing::{debug, info, trace};
use vcu_common::can::{BusMode, CanBus, CanFilter, CanFrame, CanId};
use vcu_common::car::data::CarState;
use vcu_common::car::flags::StatusFlags;
use vcu_common::car::state::BmsState;
use vcu_common::consts::{BMS_CMD_EXT, BMS_INFO_EXT, BMS_START_HV, BMS_STATE_BYTE};

use crate::bus::retry_until_ok;

/// Start-HV command frame.
pub const START_HV_FRAME: CanFrame =
    CanFrame::from_array(CanId::Extended(BMS_CMD_EXT), BMS_START_HV, 8);

#[derive(Debug, Clone, Copy, Default)]
pub struct Bms {
    start_requests: u32,
}

impl Bms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept only BMS status broadcasts on the BMS bus.
    pub fn init_filter(&mut self, bus: &mut dyn CanBus) {
        retry_until_ok("bms bus config mode", || bus.set_mode(BusMode::Config));
        retry_until_ok("bms status filter", || {
            bus.set_filter(CanFilter::extended(BMS_INFO_EXT))
        });
        retry_until_ok("bms bus normal mode", || bus.set_mode(BusMode::Normal));
    }

    /// One handshake step.
    pub fn check_hv(&mut self, car: &mut CarState, bus: &mut dyn CanBus) {
        let status = &mut car.pedal.status;
        if status.contains(StatusFlags::HV_READY) {
            return;
        }
        status.set(StatusFlags::BMS_NO_MSG, false);

        let frame = bus
            .receive()
            .filter(|f| f.id() == CanId::Extended(BMS_INFO_EXT));
        let Some(frame) = frame else {
            status.set(StatusFlags::BMS_NO_MSG, true);
            return;
        };
        car.bms.data = frame.raw_data();

        match BmsState::from_status_byte(car.bms.data[BMS_STATE_BYTE]) {
            Some(BmsState::Standby) | Some(BmsState::Precharge) => {
                match bus.send(&START_HV_FRAME) {
                    Ok(()) => self.start_requests = self.start_requests.saturating_add(1),
                    Err(e) => debug!(error = %e, "start-HV dropped"),
                }
            }
            Some(BmsState::Run) => {
                info!(start_requests = self.start_requests, "BMS in run state, HV ready");
                car.pedal.status.set(StatusFlags::HV_READY, true);
            }
            None => trace!(
                byte = car.bms.data[BMS_STATE_BYTE],
                "unhandled BMS state"
            ),
        }
    }
}
