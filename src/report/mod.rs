//! Reporting utilities: accuracy of a recovered temperature history and
//! formatted terminal output.

use crate::error::AppError;
use crate::math::stats::{mean, rms};

pub mod format;

pub use format::*;

/// One time step of an estimate-versus-truth comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureError {
    pub time: f64,
    pub truth: f64,
    pub estimate: f64,
    /// `estimate − truth` (K).
    pub error: f64,
}

/// Aggregate accuracy of a recovered temperature history.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub rows: Vec<TemperatureError>,
    /// Root-mean-square error (K).
    pub rmse: f64,
    /// Mean signed error (K).
    pub bias: f64,
    pub max_abs: f64,
}

/// Compare a recovered shot-averaged temperature with the true one.
///
/// Non-finite estimates are kept in `rows` but excluded from the aggregates.
pub fn compare_temperatures(time: &[f64], truth: &[f64], estimate: &[f64]) -> Result<Comparison, AppError> {
    if time.len() != truth.len() || truth.len() != estimate.len() {
        return Err(AppError::config(format!(
            "Comparison needs equal lengths (time={}, truth={}, estimate={}).",
            time.len(),
            truth.len(),
            estimate.len()
        )));
    }
    let rows: Vec<TemperatureError> = time
        .iter()
        .zip(truth)
        .zip(estimate)
        .map(|((&time, &truth), &estimate)| TemperatureError {
            time,
            truth,
            estimate,
            error: estimate - truth,
        })
        .collect();
    let finite: Vec<f64> = rows.iter().map(|r| r.error).filter(|e| e.is_finite()).collect();
    Ok(Comparison {
        rmse: rms(&finite),
        bias: mean(&finite),
        max_abs: finite.iter().fold(0.0, |m, e| m.max(e.abs())),
        rows,
    })
}
