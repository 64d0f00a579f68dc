//! Per-run CSV telemetry log.
//!
//! Each run gets a fresh `telemetry<N>.csv` in the log directory. `N` comes
//! from `count.txt` beside it, bumped on every start.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use vcu_common::car::data::CarState;
use vcu_common::telemetry::{CSV_HEADER, TelemetryRecord};

use crate::error::VcuError;

const COUNT_FILE: &str = "count.txt";

pub struct TelemetryLog {
    path: PathBuf,
    out: BufWriter<File>,
    records: u64,
}

impl TelemetryLog {
    /// Claim the next run number in `dir` and open its log.
    pub fn create(dir: &Path) -> Result<Self, VcuError> {
        fs::create_dir_all(dir)?;
        let count_path = dir.join(COUNT_FILE);
        let run = match fs::read_to_string(&count_path) {
            Ok(s) => s.trim().parse::<u32>().unwrap_or(0),
            Err(_) => 0,
        };
        fs::write(&count_path, format!("{}\n", run.wrapping_add(1)))?;

        let path = dir.join(format!("telemetry{run}.csv"));
        let mut out = BufWriter::new(File::create(&path)?);
        writeln!(out, "{CSV_HEADER}")?;
        info!(path = %path.display(), "telemetry log created");
        Ok(Self {
            path,
            out,
            records: 0,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub const fn records(&self) -> u64 {
        self.records
    }

    /// Append one snapshot.
    pub fn write(&mut self, car: &CarState) -> Result<(), VcuError> {
        TelemetryRecord::from_car(car).write_csv(&mut self.out)?;
        self.records += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), VcuError> {
        self.out.flush()?;
        debug!(records = self.records, "telemetry log flushed");
        Ok(())
    }
}
