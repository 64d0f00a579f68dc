//! # VCU Control Unit
//!
//! Runs the VCU control loop on a host against the simulated car: a
//! scripted driver on the board pins, an inverter on the motor bus and a
//! BMS on the BMS bus. Every supervisor state is reached within seconds.
//!
//! The configuration file is optional; without one the built-in defaults
//! apply.

use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use vcu_common::can::CanBus;
use vcu_common::car::config::VcuConfig;
use vcu_common::config::{ConfigError, load_config};
use vcu_common::consts::{DEFAULT_CONFIG_PATH, NUM_BUSES};
use vcu_control_unit::bus::CanBuses;
use vcu_control_unit::clock::StdClock;
use vcu_control_unit::cycle::{LoopRunner, rt_setup};
use vcu_control_unit::sim::{BmsResponder, InverterResponder, NodeSet, ScriptedDriver, SimBus};
use vcu_control_unit::telemetry::TelemetryLog;
use vcu_control_unit::Vcu;

/// Polls the simulated BMS spends in precharge.
const SIM_PRECHARGE_POLLS: u32 = 4;

/// VCU Control Unit: pedal-to-torque control loop
#[derive(Parser, Debug)]
#[command(name = "vcu_control_unit")]
#[command(author = "Red Bird Racing")]
#[command(version)]
#[command(about = "VCU control loop against a simulated car")]
struct Args {
    /// Path to the VCU configuration TOML.
    /// Defaults to config/vcu.toml, falling back to built-in defaults.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// CPU core to pin the loop thread to (rt feature only).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (rt feature only).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Stop after this many loop iterations.
    #[arg(long)]
    iterations: Option<u64>,

    /// Directory for per-run CSV telemetry logs.
    #[arg(long, value_name = "DIR")]
    telemetry_dir: Option<PathBuf>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = resolve_config(args.config.as_deref());
    let level = match (&config, args.verbose) {
        (_, true) => "debug",
        (Ok(cfg), false) => cfg.log_level.as_directive(),
        (Err(_), false) => "info",
    };
    setup_tracing(&args, level);

    info!("VCU Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|cfg| run(&args, cfg));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("VCU Control Unit shutdown complete");
}

/// Explicit path must load; the default path may be absent.
fn resolve_config(path: Option<&Path>) -> Result<VcuConfig, ConfigError> {
    match path {
        Some(p) => load_config(p),
        None => match load_config(Path::new(DEFAULT_CONFIG_PATH)) {
            Err(ConfigError::FileNotFound) => Ok(VcuConfig::default()),
            other => other,
        },
    }
}

fn run(args: &Args, config: VcuConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        period_us = config.scheduler.period_us,
        motor_bus = config.buses.motor,
        bms_bus = config.buses.bms,
        datalogger_bus = config.buses.datalogger,
        "Config OK"
    );
    match toml::to_string(&config) {
        Ok(text) => debug!("effective configuration:\n{text}"),
        Err(e) => warn!("could not render configuration: {e}"),
    }

    rt_setup(args.cpu_core, args.rt_priority)?;

    let clock = Rc::new(StdClock::new());
    let buses = CanBuses::new(sim_buses(&config), config.buses)?;
    let board = ScriptedDriver::new(clock.clone());
    let mut vcu = Vcu::new(&config, board, buses, clock)?;
    vcu.init()?;

    let mut runner = LoopRunner::new(vcu);
    if let Some(dir) = args.telemetry_dir.as_deref() {
        runner = runner.with_log(TelemetryLog::create(dir)?);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(true, Ordering::SeqCst);
    })?;

    let stats = runner.run(&shutdown, args.iterations)?;
    let car = runner.vcu().car();
    info!(
        ticks = stats.ticks,
        overruns = stats.overruns,
        status = car.car_status().name(),
        faults = car.pedal.faults.bits(),
        "run summary"
    );
    Ok(())
}

/// One simulated controller per physical bus, with the inverter and BMS
/// attached wherever the bus map puts them.
fn sim_buses(config: &VcuConfig) -> [Box<dyn CanBus>; NUM_BUSES] {
    let mut nodes: [NodeSet; NUM_BUSES] = core::array::from_fn(|_| NodeSet::new());
    if let Some(set) = nodes.get_mut(config.buses.motor) {
        set.push(InverterResponder::new());
    }
    if let Some(set) = nodes.get_mut(config.buses.bms) {
        set.push(BmsResponder::new(SIM_PRECHARGE_POLLS));
    }
    nodes.map(|set| Box::new(SimBus::with_responder(set)) as Box<dyn CanBus>)
}

/// Setup tracing subscriber. `RUST_LOG` wins over `level`.
fn setup_tracing(args: &Args, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
