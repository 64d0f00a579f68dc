//! Control-unit error type.
//!
//! Only construction, init and the host runner fail with an error. Sensor
//! and logic faults during the loop are car state (fault bits, status
//! flags), never a `VcuError`.

use thiserror::Error;
use vcu_common::car::config::BusRole;
use vcu_common::config::ConfigError;

use crate::scheduler::VcuTask;

#[derive(Debug, Error)]
pub enum VcuError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A role is mapped past the last physical bus.
    #[error("bus map: {role:?} mapped to bus {index}, which does not exist")]
    BusMap { role: BusRole, index: usize },

    /// The scheduler table refused a task.
    #[error("scheduler rejected task {0:?}")]
    TaskRejected(VcuTask),

    /// Bounded motor init gave up.
    #[error("inverter did not confirm cyclic reads after {0} attempts")]
    MotorNotResponding(u32),

    /// Real-time setup failed (mlockall, affinity, SCHED_FIFO).
    #[error("RT setup failed: {0}")]
    RtSetup(String),

    #[error("telemetry log: {0}")]
    TelemetryLog(#[from] std::io::Error),
}
