//! System-wide constants for the VCU workspace.
//!
//! Single source of truth for CAN identifiers, inverter register ids and
//! timing defaults. Identifiers must match the other nodes on the car bit
//! for bit.

// ─── Buses ──────────────────────────────────────────────────────────

/// Number of physical CAN controllers on the VCU board.
pub const NUM_BUSES: usize = 3;

/// Maximum periodic tasks per bus in the scheduler table. Large enough for
/// every task kind when all roles share one bus.
pub const MAX_TASKS_PER_BUS: usize = 5;

// ─── Inverter (motor controller) ────────────────────────────────────

/// Standard id the VCU sends inverter commands on.
pub const MOTOR_SEND: u16 = 0x201;

/// Standard id the inverter answers register reads on.
pub const MOTOR_READ: u16 = 0x181;

/// "Read register" opcode, first byte of a cyclic read request.
pub const REGID_READ: u8 = 0x3D;

/// Actual speed register.
pub const SPEED_IST: u8 = 0x30;

/// Warning / error word register.
pub const WARN_ERR: u8 = 0x8F;

/// Torque setpoint register, first byte of a torque frame.
pub const TORQUE_CMD: u8 = 0x90;

/// Full-scale value of the inverter's normalised speed and torque.
pub const INVERTER_FULL_SCALE: i32 = 32767;

// ─── BMS ────────────────────────────────────────────────────────────

/// Extended id of the BMS status broadcast.
pub const BMS_INFO_EXT: u32 = 0x1860_40F3;

/// Extended id the VCU sends BMS commands on.
pub const BMS_CMD_EXT: u32 = 0x1806_E5F4;

/// Payload of the start-HV command.
pub const BMS_START_HV: [u8; 8] = [0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

/// Byte of the BMS status frame carrying the state nibble.
pub const BMS_STATE_BYTE: usize = 6;

// ─── Telemetry channels (datalogger bus) ────────────────────────────

pub const TELEM_THROTTLE_IN: u16 = 0x690;
pub const TELEM_THROTTLE_OUT: u16 = 0x691;
pub const TELEM_THROTTLE_FAULT: u16 = 0x692;
pub const TELEM_CAR_STATUS: u16 = 0x693;
pub const TELEM_CAR_STATUS_CHANGE: u16 = 0x694;
pub const TELEM_BRAKE_STATUS: u16 = 0x695;
pub const TELEM_BMS_STATUS: u16 = 0x696;
pub const TELEM_HALL_SENSOR: u16 = 0x697;

// ─── Timing defaults ────────────────────────────────────────────────

/// Scheduler tick length [µs].
pub const PERIOD_US_DEFAULT: u32 = 10_000;

/// Spin-wait threshold [µs].
pub const SPIN_US_DEFAULT: u32 = 500;

/// Startin → Bussin HV override timeout [ms].
pub const BMS_OVERRIDE_MILLIS_DEFAULT: u32 = 1000;

/// Ready-to-drive buzzer dwell [ms].
pub const BUSSIN_MILLIS_DEFAULT: u32 = 2000;

/// Pedal divergence persistence before force stop [ms].
pub const PEDAL_FAULT_WINDOW_MS_DEFAULT: u32 = 100;

/// Motor speed staleness window [ms].
pub const MAX_MOTOR_READ_MILLIS_DEFAULT: u32 = 100;

/// Cyclic speed report period requested from the inverter [ms].
pub const RPM_PERIOD_MS_DEFAULT: u8 = 10;

/// Cyclic warn/err report period requested from the inverter [ms].
pub const ERR_PERIOD_MS_DEFAULT: u8 = 100;

/// Full-scale ADC reading (10-bit).
pub const ADC_MAX: u16 = 1023;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/vcu.toml";
