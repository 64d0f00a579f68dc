//! Piecewise-linear lookup tables.
//!
//! Pedal curves are stored as ordered `(input, output)` points in a
//! fixed-capacity vector. Inputs outside the table clamp to the first or
//! last output.

use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Maximum points per curve.
pub const MAX_CURVE_POINTS: usize = 16;

/// One breakpoint of a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub input: i32,
    pub output: i32,
}

/// Errors building a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CurveError {
    #[error("curve needs at least two points")]
    TooFewPoints,
    #[error("curve exceeds {MAX_CURVE_POINTS} points")]
    TooManyPoints,
    #[error("curve inputs must be strictly increasing (index {0})")]
    NotIncreasing(usize),
}

/// Piecewise-linear interpolation table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterpTable {
    points: Vec<CurvePoint, MAX_CURVE_POINTS>,
}

impl InterpTable {
    /// Build a table from `(input, output)` pairs.
    pub fn from_pairs(pairs: &[(i32, i32)]) -> Result<Self, CurveError> {
        let mut points = Vec::new();
        for &(input, output) in pairs {
            points
                .push(CurvePoint { input, output })
                .map_err(|_| CurveError::TooManyPoints)?;
        }
        let table = Self { points };
        table.validate()?;
        Ok(table)
    }

    /// Check point count and ordering. Deserialized tables are unchecked
    /// until this runs.
    pub fn validate(&self) -> Result<(), CurveError> {
        if self.points.len() < 2 {
            return Err(CurveError::TooFewPoints);
        }
        for (i, w) in self.points.windows(2).enumerate() {
            if w[1].input <= w[0].input {
                return Err(CurveError::NotIncreasing(i + 1));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// First input of the table, the curve's dead-zone edge.
    #[inline]
    pub fn start(&self) -> i32 {
        self.points.first().map_or(0, |p| p.input)
    }

    /// Input span covered by the table.
    #[inline]
    pub fn range(&self) -> i32 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => last.input - first.input,
            _ => 0,
        }
    }

    /// Interpolate `x`, clamping outside the table.
    pub fn interp(&self, x: i32) -> i32 {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return 0;
        };
        if x <= first.input {
            return first.output;
        }
        if x >= last.input {
            return last.output;
        }
        for w in self.points.windows(2) {
            let (a, b) = (w[0], w[1]);
            if x < b.input {
                let span = (b.input - a.input) as i64;
                let rise = (b.output - a.output) as i64;
                let t = (x - a.input) as i64;
                return a.output + (rise * t / span) as i32;
            }
        }
        last.output
    }
}
