//! In-memory CAN controller.
//!
//! `SimBus` is a cheap handle: clones share one controller, so a test can
//! hand one clone to the VCU and keep another to inject frames and inspect
//! what was sent. An optional [`Responder`] models the node on the other
//! end of the wire.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use vcu_common::can::{BusError, BusMode, CanBus, CanFilter, CanFrame};

/// Acceptance filter slots, as on an MCP2515.
pub const SIM_FILTER_SLOTS: usize = 6;

/// Remote node behaviour.
pub trait Responder {
    /// Called after every accepted send.
    fn on_send(&mut self, frame: &CanFrame, rx: &mut VecDeque<CanFrame>);

    /// Called when the controller is polled with nothing queued.
    fn on_poll(&mut self, _rx: &mut VecDeque<CanFrame>) {}
}

#[derive(Default)]
struct SimBusInner {
    rx: VecDeque<CanFrame>,
    sent: Vec<CanFrame>,
    mode: BusMode,
    filters: heapless::Vec<CanFilter, SIM_FILTER_SLOTS>,
    fail_sends: u32,
    fail_filter_ops: u32,
    dropped: u64,
    responder: Option<Box<dyn Responder>>,
}

/// Shared handle to a simulated controller.
#[derive(Clone, Default)]
pub struct SimBus {
    inner: Rc<RefCell<SimBusInner>>,
}

impl SimBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responder(responder: impl Responder + 'static) -> Self {
        let bus = Self::new();
        bus.inner.borrow_mut().responder = Some(Box::new(responder));
        bus
    }

    /// Queue a frame as if received from the wire.
    pub fn inject(&self, frame: CanFrame) {
        self.inner.borrow_mut().rx.push_back(frame);
    }

    /// All frames sent so far.
    pub fn sent(&self) -> Vec<CanFrame> {
        self.inner.borrow().sent.clone()
    }

    /// Drain the sent log.
    pub fn take_sent(&self) -> Vec<CanFrame> {
        std::mem::take(&mut self.inner.borrow_mut().sent)
    }

    /// Make the next `n` sends fail with `TxBusy`.
    pub fn fail_next_sends(&self, n: u32) {
        self.inner.borrow_mut().fail_sends = n;
    }

    /// Make the next `n` filter installs fail.
    pub fn fail_next_filter_ops(&self, n: u32) {
        self.inner.borrow_mut().fail_filter_ops = n;
    }

    pub fn mode(&self) -> BusMode {
        self.inner.borrow().mode
    }

    pub fn filters(&self) -> Vec<CanFilter> {
        self.inner.borrow().filters.iter().copied().collect()
    }

    /// Frames discarded by the acceptance filters.
    pub fn dropped(&self) -> u64 {
        self.inner.borrow().dropped
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().rx.len()
    }
}

impl CanBus for SimBus {
    fn send(&mut self, frame: &CanFrame) -> Result<(), BusError> {
        let inner = &mut *self.inner.borrow_mut();
        if inner.mode != BusMode::Normal {
            return Err(BusError::Failed("controller in configuration mode"));
        }
        if inner.fail_sends > 0 {
            inner.fail_sends -= 1;
            return Err(BusError::TxBusy);
        }
        inner.sent.push(*frame);
        if let Some(responder) = inner.responder.as_mut() {
            responder.on_send(frame, &mut inner.rx);
        }
        Ok(())
    }

    fn receive(&mut self) -> Option<CanFrame> {
        let inner = &mut *self.inner.borrow_mut();
        if inner.mode != BusMode::Normal {
            return None;
        }
        if inner.rx.is_empty() {
            if let Some(responder) = inner.responder.as_mut() {
                responder.on_poll(&mut inner.rx);
            }
        }
        while let Some(frame) = inner.rx.pop_front() {
            if inner.filters.is_empty() || inner.filters.iter().any(|f| f.matches(frame.id())) {
                return Some(frame);
            }
            inner.dropped += 1;
        }
        None
    }

    fn set_filter(&mut self, filter: CanFilter) -> Result<(), BusError> {
        let inner = &mut *self.inner.borrow_mut();
        if inner.mode != BusMode::Config {
            return Err(BusError::NotInConfigMode);
        }
        if inner.fail_filter_ops > 0 {
            inner.fail_filter_ops -= 1;
            return Err(BusError::FilterRejected("injected failure"));
        }
        if inner.filters.contains(&filter) {
            return Ok(());
        }
        inner
            .filters
            .push(filter)
            .map_err(|_| BusError::FilterRejected("no free filter slot"))
    }

    fn set_mode(&mut self, mode: BusMode) -> Result<(), BusError> {
        self.inner.borrow_mut().mode = mode;
        Ok(())
    }
}
