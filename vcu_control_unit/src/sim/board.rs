//! In-memory board pins.

use crate::board::{AnalogInput, Board, DigitalInput, DigitalOutput};

/// Settable inputs and observable outputs.
///
/// Defaults describe a car at rest: pedals released and in range, button
/// up, all outputs low.
#[derive(Debug, Clone)]
pub struct SimBoard {
    apps_5v: u16,
    apps_3v3: u16,
    brake: u16,
    hall: u16,
    button: bool,
    outputs: [bool; 4],
    output_writes: u64,
}

impl Default for SimBoard {
    fn default() -> Self {
        Self {
            apps_5v: 150,
            apps_3v3: 99,
            brake: 100,
            hall: 512,
            button: false,
            outputs: [false; 4],
            output_writes: 0,
        }
    }
}

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_analog(&mut self, input: AnalogInput, value: u16) {
        match input {
            AnalogInput::Apps5v => self.apps_5v = value,
            AnalogInput::Apps3v3 => self.apps_3v3 = value,
            AnalogInput::Brake => self.brake = value,
            AnalogInput::HallSensor => self.hall = value,
        }
    }

    /// Set both APPS channels from one 5V-scale reading, keeping them in
    /// agreement through the stock 3V3 ratio.
    pub fn set_throttle(&mut self, apps_5v: u16) {
        self.apps_5v = apps_5v;
        self.apps_3v3 = (apps_5v as u32 * 66 / 100) as u16;
    }

    /// Electrical level of the drive-mode button.
    pub fn set_button(&mut self, level: bool) {
        self.button = level;
    }

    pub fn output(&self, output: DigitalOutput) -> bool {
        self.outputs[Self::slot(output)]
    }

    pub fn output_writes(&self) -> u64 {
        self.output_writes
    }

    const fn slot(output: DigitalOutput) -> usize {
        match output {
            DigitalOutput::DriveEnable => 0,
            DigitalOutput::BrakeLight => 1,
            DigitalOutput::Buzzer => 2,
            DigitalOutput::BmsFaultLed => 3,
        }
    }
}

impl Board for SimBoard {
    fn read_analog(&mut self, input: AnalogInput) -> u16 {
        match input {
            AnalogInput::Apps5v => self.apps_5v,
            AnalogInput::Apps3v3 => self.apps_3v3,
            AnalogInput::Brake => self.brake,
            AnalogInput::HallSensor => self.hall,
        }
    }

    fn read_digital(&mut self, input: DigitalInput) -> bool {
        match input {
            DigitalInput::DriveModeButton => self.button,
        }
    }

    fn write_digital(&mut self, output: DigitalOutput, level: bool) {
        self.outputs[Self::slot(output)] = level;
        self.output_writes += 1;
    }
}
