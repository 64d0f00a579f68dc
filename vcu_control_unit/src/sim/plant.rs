//! Simulated car: inverter, BMS and a scripted driver.
//!
//! Enough physics to exercise every supervisor state on a host, nothing
//! more. Speeds and torques use the inverter's ±32767 scale.

use std::collections::VecDeque;

use vcu_common::can::{CanFrame, CanId};
use vcu_common::car::state::BmsState;
use vcu_common::consts::{
    BMS_CMD_EXT, BMS_INFO_EXT, BMS_START_HV, BMS_STATE_BYTE, INVERTER_FULL_SCALE, MOTOR_READ,
    MOTOR_SEND, REGID_READ, SPEED_IST, TORQUE_CMD, WARN_ERR,
};

use super::board::SimBoard;
use super::bus::Responder;
use crate::board::{AnalogInput, Board, DigitalInput, DigitalOutput};
use crate::clock::MonotonicClock;

// ─── Inverter ───────────────────────────────────────────────────────

/// Every n-th poll reports the warn/err word instead of speed.
const WARN_ERR_EVERY: u64 = 10;

/// Inverter that confirms cyclic reads and integrates torque into speed.
#[derive(Debug, Clone, Default)]
pub struct InverterResponder {
    torque: i16,
    rpm: i32,
    polls: u64,
    confirmed: u8,
    error: u16,
}

impl InverterResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `error` in subsequent warn/err frames.
    pub fn with_error(mut self, error: u16) -> Self {
        self.error = error;
        self
    }

    pub const fn rpm(&self) -> i32 {
        self.rpm
    }

    pub const fn torque(&self) -> i16 {
        self.torque
    }

    fn response(data: [u8; 8]) -> CanFrame {
        CanFrame::from_array(CanId::Standard(MOTOR_READ), data, 5)
    }
}

impl Responder for InverterResponder {
    fn on_send(&mut self, frame: &CanFrame, rx: &mut VecDeque<CanFrame>) {
        if frame.id() != CanId::Standard(MOTOR_SEND) {
            return;
        }
        let d = frame.raw_data();
        match d[0] {
            REGID_READ => {
                self.confirmed = self.confirmed.saturating_add(1);
                rx.push_back(Self::response([d[1], 0, 0, 0, 0, 0, 0, 0]));
            }
            TORQUE_CMD => {
                if let Some(torque) = frame.i16_le(1) {
                    self.torque = torque;
                }
            }
            _ => {}
        }
    }

    fn on_poll(&mut self, rx: &mut VecDeque<CanFrame>) {
        if self.confirmed == 0 {
            return;
        }
        // First-order lag toward a torque-proportional speed, with drag.
        self.rpm += self.torque as i32 / 64 - self.rpm / 100;
        self.rpm = self.rpm.clamp(-INVERTER_FULL_SCALE, INVERTER_FULL_SCALE);
        self.polls += 1;

        let frame = if self.polls % WARN_ERR_EVERY == 0 {
            let [e0, e1] = self.error.to_le_bytes();
            Self::response([WARN_ERR, e0, e1, 0, 0, 0, 0, 0])
        } else {
            let [r0, r1] = (self.rpm as i16).to_le_bytes();
            Self::response([SPEED_IST, r0, r1, 0, 0, 0, 0, 0])
        };
        rx.push_back(frame);
    }
}

// ─── BMS ────────────────────────────────────────────────────────────

/// BMS that precharges after a start-HV command and then runs.
#[derive(Debug, Clone)]
pub struct BmsResponder {
    state: BmsState,
    precharge_polls: u32,
    polls_in_precharge: u32,
    silent: bool,
}

impl BmsResponder {
    /// Reach `Run` after `precharge_polls` polls in `Precharge`.
    pub fn new(precharge_polls: u32) -> Self {
        Self {
            state: BmsState::Standby,
            precharge_polls,
            polls_in_precharge: 0,
            silent: false,
        }
    }

    /// A BMS that never broadcasts.
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::new(0)
        }
    }

    pub const fn state(&self) -> BmsState {
        self.state
    }

    fn status_frame(&self) -> CanFrame {
        let mut data = [0u8; 8];
        data[BMS_STATE_BYTE] = (self.state as u8) << 4;
        CanFrame::from_array(CanId::Extended(BMS_INFO_EXT), data, 8)
    }
}

impl Responder for BmsResponder {
    fn on_send(&mut self, frame: &CanFrame, _rx: &mut VecDeque<CanFrame>) {
        if frame.id() == CanId::Extended(BMS_CMD_EXT)
            && frame.raw_data() == BMS_START_HV
            && self.state == BmsState::Standby
        {
            self.state = BmsState::Precharge;
            self.polls_in_precharge = 0;
        }
    }

    fn on_poll(&mut self, rx: &mut VecDeque<CanFrame>) {
        if self.silent {
            return;
        }
        if self.state == BmsState::Precharge {
            self.polls_in_precharge += 1;
            if self.polls_in_precharge > self.precharge_polls {
                self.state = BmsState::Run;
            }
        }
        rx.push_back(self.status_frame());
    }
}

// ─── Node Set ───────────────────────────────────────────────────────

/// Several nodes sharing one simulated bus.
#[derive(Default)]
pub struct NodeSet {
    nodes: Vec<Box<dyn Responder>>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: impl Responder + 'static) {
        self.nodes.push(Box::new(node));
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Responder for NodeSet {
    fn on_send(&mut self, frame: &CanFrame, rx: &mut VecDeque<CanFrame>) {
        for node in &mut self.nodes {
            node.on_send(frame, rx);
        }
    }

    fn on_poll(&mut self, rx: &mut VecDeque<CanFrame>) {
        for node in &mut self.nodes {
            node.on_poll(rx);
        }
    }
}

// ─── Driver ─────────────────────────────────────────────────────────

const REST_MS: u32 = 500;
const START_HOLD_MS: u32 = 3_000;
const LAP_MS: u32 = 8_000;
const THROTTLE_RAMP_MS: u32 = 4_000;
const COAST_MS: u32 = 2_000;

/// Board whose inputs follow a time script.
///
/// ```text
/// 0.0 s   rest
/// 0.5 s   brake + drive button held (start sequence)
/// 3.0 s   button released, then per 8 s lap:
///           2 s coast, 4 s throttle ramp, 2 s braking
/// ```
pub struct ScriptedDriver<C: MonotonicClock> {
    board: SimBoard,
    clock: C,
    start_ms: u32,
}

impl<C: MonotonicClock> ScriptedDriver<C> {
    pub fn new(clock: C) -> Self {
        let start_ms = clock.millis();
        Self {
            board: SimBoard::new(),
            clock,
            start_ms,
        }
    }

    pub fn board(&self) -> &SimBoard {
        &self.board
    }

    fn apply_script(&mut self) {
        let t = self.clock.millis().wrapping_sub(self.start_ms);
        let b = &mut self.board;
        match t {
            0..REST_MS => {
                b.set_throttle(150);
                b.set_analog(AnalogInput::Brake, 100);
                b.set_button(false);
            }
            REST_MS..START_HOLD_MS => {
                b.set_throttle(150);
                b.set_analog(AnalogInput::Brake, 600);
                b.set_button(true);
            }
            _ => {
                b.set_button(false);
                let lap = (t - START_HOLD_MS) % LAP_MS;
                if (COAST_MS..COAST_MS + THROTTLE_RAMP_MS).contains(&lap) {
                    let ramp = lap - COAST_MS;
                    b.set_throttle((150 + ramp * 550 / THROTTLE_RAMP_MS) as u16);
                    b.set_analog(AnalogInput::Brake, 100);
                } else if lap >= COAST_MS + THROTTLE_RAMP_MS {
                    b.set_throttle(150);
                    b.set_analog(AnalogInput::Brake, 550);
                } else {
                    b.set_throttle(150);
                    b.set_analog(AnalogInput::Brake, 100);
                }
            }
        }
    }
}

impl<C: MonotonicClock> Board for ScriptedDriver<C> {
    fn read_analog(&mut self, input: AnalogInput) -> u16 {
        self.apply_script();
        self.board.read_analog(input)
    }

    fn read_digital(&mut self, input: DigitalInput) -> bool {
        self.apply_script();
        self.board.read_digital(input)
    }

    fn write_digital(&mut self, output: DigitalOutput, level: bool) {
        self.board.write_digital(output, level);
    }
}
