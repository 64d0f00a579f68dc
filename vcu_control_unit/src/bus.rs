//! Physical CAN buses and the role → bus mapping.
//!
//! The VCU board has [`NUM_BUSES`] controllers. Each logical role (motor,
//! BMS, datalogger) is mapped to one of them by configuration. Components
//! never see a controller directly: they get a [`RoleBus`] view.
//!
//! When several roles share a controller, the view demultiplexes by the
//! acceptance filter each role installed. A frame read on behalf of one
//! role that belongs to another is parked in that role's inbox instead of
//! being consumed, so neither side eats the other's traffic.
//!
//! ```text
//! receive(role):  inbox[role] non-empty      → pop it
//!                 controller frame, mine     → return it
//!                 controller frame, other's  → park in inbox[other], read on
//!                 controller frame, nobody's → drop, read on
//! ```

use std::fmt::Debug;

use heapless::Deque;
use tracing::{trace, warn};
use vcu_common::can::{BusError, BusMode, CanBus, CanFilter, CanFrame};
use vcu_common::car::config::{BusMapConfig, BusRole};
use vcu_common::consts::NUM_BUSES;

use crate::error::VcuError;

/// Parked frames per role. The oldest is dropped when full.
pub const INBOX_DEPTH: usize = 4;

/// Controller reads per `receive` on a shared bus.
const MAX_SHARED_READS: usize = 4;

const ROLES: usize = BusRole::ALL.len();

#[inline]
const fn slot(role: BusRole) -> usize {
    match role {
        BusRole::Motor => 0,
        BusRole::Bms => 1,
        BusRole::Datalogger => 2,
    }
}

/// Owned set of physical buses plus the role map.
pub struct CanBuses {
    buses: [Box<dyn CanBus>; NUM_BUSES],
    map: BusMapConfig,
    filters: [Option<CanFilter>; ROLES],
    inbox: [Deque<CanFrame, INBOX_DEPTH>; ROLES],
}

impl CanBuses {
    /// Build the bus set. Fails if the map points past the last bus.
    pub fn new(buses: [Box<dyn CanBus>; NUM_BUSES], map: BusMapConfig) -> Result<Self, VcuError> {
        for role in BusRole::ALL {
            let index = map.index(role);
            if index >= NUM_BUSES {
                return Err(VcuError::BusMap { role, index });
            }
        }
        Ok(Self {
            buses,
            map,
            filters: [None; ROLES],
            inbox: core::array::from_fn(|_| Deque::new()),
        })
    }

    /// Physical index serving `role`.
    #[inline]
    pub const fn index(&self, role: BusRole) -> usize {
        self.map.index(role)
    }

    /// Whether another role maps to `role`'s controller.
    pub fn is_shared(&self, role: BusRole) -> bool {
        let index = self.index(role);
        BusRole::ALL
            .iter()
            .any(|&other| other != role && self.index(other) == index)
    }

    /// View of the bus serving `role`.
    #[inline]
    pub fn role(&mut self, role: BusRole) -> RoleBus<'_> {
        RoleBus { buses: self, role }
    }

    /// Frames parked for `role`.
    pub fn parked(&self, role: BusRole) -> usize {
        self.inbox[slot(role)].len()
    }

    fn controller(&mut self, role: BusRole) -> &mut dyn CanBus {
        // Indices are checked in `new`.
        self.buses[self.map.index(role)].as_mut()
    }

    /// Role on `role`'s controller whose filter accepts `frame`.
    fn owner(&self, role: BusRole, frame: &CanFrame) -> Option<BusRole> {
        let index = self.index(role);
        BusRole::ALL.into_iter().find(|&r| {
            self.index(r) == index
                && self.filters[slot(r)].is_some_and(|f| f.matches(frame.id()))
        })
    }

    fn park(&mut self, role: BusRole, frame: CanFrame) {
        let inbox = &mut self.inbox[slot(role)];
        if inbox.is_full() {
            inbox.pop_front();
            trace!(?role, "inbox full, oldest frame dropped");
        }
        // Space was just made.
        let _ = inbox.push_back(frame);
    }

    fn receive_shared(&mut self, role: BusRole) -> Option<CanFrame> {
        if let Some(frame) = self.inbox[slot(role)].pop_front() {
            return Some(frame);
        }
        for _ in 0..MAX_SHARED_READS {
            let frame = self.controller(role).receive()?;
            match self.owner(role, &frame) {
                Some(owner) if owner == role => return Some(frame),
                Some(owner) => self.park(owner, frame),
                None if self.filters[slot(role)].is_none() => return Some(frame),
                None => trace!(id = ?frame.id(), "unclaimed frame on shared bus"),
            }
        }
        None
    }
}

// ─── Role View ──────────────────────────────────────────────────────

/// One role's view of its controller.
pub struct RoleBus<'a> {
    buses: &'a mut CanBuses,
    role: BusRole,
}

impl CanBus for RoleBus<'_> {
    fn send(&mut self, frame: &CanFrame) -> Result<(), BusError> {
        self.buses.controller(self.role).send(frame)
    }

    fn receive(&mut self) -> Option<CanFrame> {
        if self.buses.is_shared(self.role) {
            self.buses.receive_shared(self.role)
        } else {
            self.buses.controller(self.role).receive()
        }
    }

    fn set_filter(&mut self, filter: CanFilter) -> Result<(), BusError> {
        self.buses.controller(self.role).set_filter(filter)?;
        self.buses.filters[slot(self.role)] = Some(filter);
        Ok(())
    }

    fn set_mode(&mut self, mode: BusMode) -> Result<(), BusError> {
        self.buses.controller(self.role).set_mode(mode)
    }
}

/// Retry `op` until it succeeds and return the number of failed attempts.
///
/// Init-time only: a controller that never accepts blocks here forever,
/// which leaves the car inert.
pub fn retry_until_ok<E: Debug>(what: &str, mut op: impl FnMut() -> Result<(), E>) -> u32 {
    let mut failures = 0u32;
    loop {
        match op() {
            Ok(()) => {
                if failures > 0 {
                    trace!(what, failures, "accepted after retries");
                }
                return failures;
            }
            Err(e) => {
                if failures == 0 {
                    warn!(what, error = ?e, "bus operation rejected, retrying");
                }
                failures = failures.saturating_add(1);
                core::hint::spin_loop();
            }
        }
    }
}
