//! Board I/O abstraction.
//!
//! Pin reads and writes go through [`Board`] so the supervisor can run on
//! real hardware glue or against `sim::SimBoard`.

/// Analog inputs, 10-bit ADC counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogInput {
    Apps5v,
    Apps3v3,
    Brake,
    HallSensor,
}

/// Digital inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigitalInput {
    DriveModeButton,
}

/// Digital outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigitalOutput {
    /// Inverter drive enable relay (FRG).
    DriveEnable,
    BrakeLight,
    Buzzer,
    BmsFaultLed,
}

impl DigitalOutput {
    pub const ALL: [Self; 4] = [
        Self::DriveEnable,
        Self::BrakeLight,
        Self::Buzzer,
        Self::BmsFaultLed,
    ];
}

/// Pin-level access to the VCU board.
///
/// # Contract
///
/// - Reads never block.
/// - `read_digital` returns the electrical level; polarity is applied by
///   the caller.
pub trait Board {
    fn read_analog(&mut self, input: AnalogInput) -> u16;
    fn read_digital(&mut self, input: DigitalInput) -> bool;
    fn write_digital(&mut self, output: DigitalOutput, level: bool);
}
