//! VCU configuration structures.
//!
//! All config types use `serde::Deserialize` for TOML loading. Every field
//! has a default, so an empty file yields the stock car. `validate()` checks
//! bounds after parsing.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, LogLevel};
use crate::consts::{
    ADC_MAX, BMS_OVERRIDE_MILLIS_DEFAULT, BUSSIN_MILLIS_DEFAULT, ERR_PERIOD_MS_DEFAULT,
    INVERTER_FULL_SCALE, MAX_MOTOR_READ_MILLIS_DEFAULT, NUM_BUSES, PEDAL_FAULT_WINDOW_MS_DEFAULT,
    PERIOD_US_DEFAULT, RPM_PERIOD_MS_DEFAULT, SPIN_US_DEFAULT,
};
use crate::interp::InterpTable;

/// Scheduler period bounds [µs].
pub const PERIOD_US_MIN: u32 = 1_000;
pub const PERIOD_US_MAX: u32 = 1_000_000;

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete VCU configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VcuConfig {
    /// Default log verbosity; `--verbose` and `RUST_LOG` take precedence.
    pub log_level: LogLevel,
    pub scheduler: SchedulerConfig,
    pub supervisor: SupervisorConfig,
    pub pedal: PedalConfig,
    pub regen: RegenConfig,
    pub curves: CurvesConfig,
    pub motor: MotorConfig,
    pub bms: BmsConfig,
    pub telemetry: TelemetryConfig,
    pub buses: BusMapConfig,
}

impl VcuConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        self.supervisor.validate()?;
        self.pedal.validate()?;
        self.regen.validate()?;
        self.curves.validate()?;
        self.motor.validate()?;
        self.bms.validate()?;
        self.telemetry.validate()?;
        self.buses.validate()?;
        Ok(())
    }

    /// Cross-check gate: explicit setting, else the throttle dead-zone edge.
    pub fn crosscheck_min_apps_5v(&self) -> u16 {
        self.pedal
            .crosscheck_min_apps_5v
            .unwrap_or_else(|| self.curves.throttle.start().clamp(0, ADC_MAX as i32) as u16)
    }
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::ValidationError(msg)
}

// ─── Scheduler ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Tick length [µs].
    pub period_us: u32,
    /// Busy-wait threshold [µs].
    pub spin_threshold_us: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period_us: PERIOD_US_DEFAULT,
            spin_threshold_us: SPIN_US_DEFAULT,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_us < PERIOD_US_MIN || self.period_us > PERIOD_US_MAX {
            return Err(invalid(format!(
                "scheduler.period_us {} out of range [{}, {}]",
                self.period_us, PERIOD_US_MIN, PERIOD_US_MAX
            )));
        }
        if self.spin_threshold_us >= self.period_us {
            return Err(invalid(format!(
                "scheduler.spin_threshold_us {} must be below period_us {}",
                self.spin_threshold_us, self.period_us
            )));
        }
        Ok(())
    }
}

// ─── Supervisor ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Startin → Bussin without `hv_ready` after this long [ms].
    pub bms_override_millis: u32,
    /// Buzzer dwell before Drive [ms].
    pub bussin_millis: u32,
    /// Level the drive-mode button reads when pressed.
    pub button_active_high: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            bms_override_millis: BMS_OVERRIDE_MILLIS_DEFAULT,
            bussin_millis: BUSSIN_MILLIS_DEFAULT,
            button_active_high: true,
        }
    }
}

impl SupervisorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bussin_millis == 0 {
            return Err(invalid("supervisor.bussin_millis must be > 0".to_string()));
        }
        Ok(())
    }
}

// ─── Pedal ──────────────────────────────────────────────────────────

/// Raw ADC validity window for one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorRange {
    pub min: u16,
    pub max: u16,
}

impl SensorRange {
    pub const fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.min >= self.max || self.max > ADC_MAX {
            return Err(invalid(format!(
                "pedal.{name} range [{}, {}] invalid (need min < max <= {ADC_MAX})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PedalConfig {
    pub apps_5v: SensorRange,
    pub apps_3v3: SensorRange,
    pub brake: SensorRange,
    /// Cross-check divergence persistence before force stop [ms].
    pub fault_window_ms: u32,
    /// Motor speed staleness window [ms].
    pub max_motor_read_millis: u32,
    /// Cross-check is skipped below this filtered APPS 5V value.
    /// Defaults to the throttle curve start.
    pub crosscheck_min_apps_5v: Option<u16>,
}

impl Default for PedalConfig {
    fn default() -> Self {
        Self {
            apps_5v: SensorRange::new(50, 1000),
            apps_3v3: SensorRange::new(30, 700),
            brake: SensorRange::new(30, 1000),
            fault_window_ms: PEDAL_FAULT_WINDOW_MS_DEFAULT,
            max_motor_read_millis: MAX_MOTOR_READ_MILLIS_DEFAULT,
            crosscheck_min_apps_5v: None,
        }
    }
}

impl PedalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.apps_5v.validate("apps_5v")?;
        self.apps_3v3.validate("apps_3v3")?;
        self.brake.validate("brake")?;
        if self.fault_window_ms == 0 {
            return Err(invalid("pedal.fault_window_ms must be > 0".to_string()));
        }
        if self.max_motor_read_millis == 0 {
            return Err(invalid(
                "pedal.max_motor_read_millis must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Regen ──────────────────────────────────────────────────────────

/// Regenerative braking parameters.
///
/// The minimum regen speed is given in km/h and converted to the
/// inverter's normalised speed scale through the drivetrain geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegenConfig {
    pub enabled: bool,
    /// Motor spins negative for forward travel.
    pub flip_motor_dir: bool,
    /// No regen below this road speed [km/h].
    pub min_speed_kmh: f64,
    /// Tyre outer diameter [in].
    pub wheel_diameter_in: f64,
    /// Motor revolutions per wheel revolution.
    pub gear_ratio: f64,
    /// Motor speed at inverter full scale [rpm].
    pub max_motor_rpm: f64,
}

impl Default for RegenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            flip_motor_dir: false,
            min_speed_kmh: 5.0,
            wheel_diameter_in: 18.0,
            gear_ratio: 40.0 / 11.0,
            max_motor_rpm: 6500.0,
        }
    }
}

impl RegenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("wheel_diameter_in", self.wheel_diameter_in),
            ("gear_ratio", self.gear_ratio),
            ("max_motor_rpm", self.max_motor_rpm),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(format!("regen.{name} must be > 0, got {value}")));
            }
        }
        if !(self.min_speed_kmh.is_finite() && self.min_speed_kmh >= 0.0) {
            return Err(invalid(format!(
                "regen.min_speed_kmh must be >= 0, got {}",
                self.min_speed_kmh
            )));
        }
        if self.min_regen_rpm_val() > INVERTER_FULL_SCALE {
            return Err(invalid(
                "regen.min_speed_kmh exceeds the inverter speed range".to_string(),
            ));
        }
        Ok(())
    }

    /// Minimum regen speed on the inverter's ±32767 speed scale.
    pub fn min_regen_rpm_val(&self) -> i32 {
        let circumference_m = self.wheel_diameter_in * 0.0254 * core::f64::consts::PI;
        let wheel_rpm = self.min_speed_kmh * 1000.0 / 60.0 / circumference_m;
        let motor_rpm = wheel_rpm * self.gear_ratio;
        (motor_rpm / self.max_motor_rpm * INVERTER_FULL_SCALE as f64) as i32
    }
}

// ─── Curves ─────────────────────────────────────────────────────────

/// Pedal lookup tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurvesConfig {
    /// Filtered APPS 5V → torque. The first input is the throttle dead zone.
    pub throttle: InterpTable,
    /// Filtered brake → regen torque (non-positive outputs).
    pub brake: InterpTable,
    /// Filtered APPS 3V3 → APPS 5V scale.
    pub apps_3v3_scale: InterpTable,
}

impl Default for CurvesConfig {
    fn default() -> Self {
        Self {
            throttle: stock_curve(&[(200, 0), (500, 12_000), (850, 32_767)]),
            brake: stock_curve(&[(300, 0), (800, -16_000)]),
            apps_3v3_scale: stock_curve(&[(132, 200), (561, 850)]),
        }
    }
}

fn stock_curve(pairs: &[(i32, i32)]) -> InterpTable {
    // An invalid table falls back to empty and fails validate().
    InterpTable::from_pairs(pairs).unwrap_or_default()
}

impl CurvesConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tables = [
            ("throttle", &self.throttle),
            ("brake", &self.brake),
            ("apps_3v3_scale", &self.apps_3v3_scale),
        ];
        for (name, table) in tables {
            table
                .validate()
                .map_err(|e| invalid(format!("curves.{name}: {e}")))?;
        }
        if self.throttle.range() < 10 {
            return Err(invalid(
                "curves.throttle must span at least 10 counts".to_string(),
            ));
        }
        if self.brake.points().iter().any(|p| p.output > 0) {
            return Err(invalid(
                "curves.brake outputs must be <= 0".to_string(),
            ));
        }
        let out_of_scale = |t: &InterpTable| {
            t.points()
                .iter()
                .any(|p| p.output.abs() > INVERTER_FULL_SCALE)
        };
        if out_of_scale(&self.throttle) || out_of_scale(&self.brake) {
            return Err(invalid(format!(
                "torque curve outputs must be within ±{INVERTER_FULL_SCALE}"
            )));
        }
        Ok(())
    }
}

// ─── Motor ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    /// Cyclic speed report period requested from the inverter [ms].
    pub rpm_period_ms: u8,
    /// Cyclic warn/err report period [ms].
    pub err_period_ms: u8,
    /// Scheduler interval of the torque send + motor read task [ticks].
    pub task_interval: u16,
    /// Handshake rounds before init gives up, 0 for unlimited.
    pub init_attempts: u32,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            rpm_period_ms: RPM_PERIOD_MS_DEFAULT,
            err_period_ms: ERR_PERIOD_MS_DEFAULT,
            task_interval: 1,
            init_attempts: 0,
        }
    }
}

impl MotorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpm_period_ms == 0 || self.err_period_ms == 0 {
            return Err(invalid("motor report periods must be > 0".to_string()));
        }
        if self.task_interval == 0 {
            return Err(invalid("motor.task_interval must be > 0".to_string()));
        }
        Ok(())
    }
}

// ─── BMS ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BmsConfig {
    /// Poll interval while in Startin [ticks].
    pub poll_interval: u16,
}

impl Default for BmsConfig {
    fn default() -> Self {
        Self { poll_interval: 5 }
    }
}

impl BmsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval == 0 {
            return Err(invalid("bms.poll_interval must be > 0".to_string()));
        }
        Ok(())
    }
}

// ─── Telemetry ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Pedal channel interval [ticks].
    pub pedal_interval: u16,
    /// Motor channel interval [ticks].
    pub motor_interval: u16,
    /// BMS channel interval [ticks].
    pub bms_interval: u16,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            pedal_interval: 1,
            motor_interval: 1,
            bms_interval: 10,
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pedal_interval == 0 || self.motor_interval == 0 || self.bms_interval == 0 {
            return Err(invalid("telemetry intervals must be > 0".to_string()));
        }
        Ok(())
    }
}

// ─── Bus Map ────────────────────────────────────────────────────────

/// Logical role of a CAN bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusRole {
    Motor,
    Bms,
    Datalogger,
}

impl BusRole {
    pub const ALL: [Self; 3] = [Self::Motor, Self::Bms, Self::Datalogger];
}

/// Role → physical bus index. Several roles may share one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusMapConfig {
    pub motor: usize,
    pub bms: usize,
    pub datalogger: usize,
}

impl Default for BusMapConfig {
    fn default() -> Self {
        Self {
            motor: 0,
            bms: 1,
            datalogger: 2,
        }
    }
}

impl BusMapConfig {
    #[inline]
    pub const fn index(&self, role: BusRole) -> usize {
        match role {
            BusRole::Motor => self.motor,
            BusRole::Bms => self.bms,
            BusRole::Datalogger => self.datalogger,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for role in BusRole::ALL {
            let idx = self.index(role);
            if idx >= NUM_BUSES {
                return Err(invalid(format!(
                    "buses.{role:?} index {idx} out of range [0, {NUM_BUSES})"
                )));
            }
        }
        Ok(())
    }
}
