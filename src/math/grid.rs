//! Time-grid generation.
//!
//! Time is measured in nanoseconds relative to the laser-pulse centre, so a grid
//! that starts a few pulse widths before zero captures the ambient baseline and
//! the heating phase, and everything after the pulse is pure cooling.

use crate::error::AppError;

/// `steps` evenly spaced points between `start` and `end` (inclusive).
pub fn linspace(start: f64, end: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(start.is_finite() && end.is_finite() && end > start) {
        return Err(AppError::config(format!(
            "Invalid time range: start={start}, end={end} (must be finite and end>start)."
        )));
    }
    if steps < 2 {
        return Err(AppError::config("Time grid needs at least 2 points."));
    }

    let step = (end - start) / (steps as f64 - 1.0);
    Ok((0..steps).map(|i| start + step * i as f64).collect())
}

/// `steps` log-spaced points between `min` and `max` (inclusive).
pub fn log_space(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, AppError> {
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > min) {
        return Err(AppError::config(format!(
            "Invalid log range: min={min}, max={max} (must be finite, >0, and max>min)."
        )));
    }
    let exps = linspace(min.ln(), max.ln(), steps)?;
    Ok(exps.into_iter().map(f64::exp).collect())
}

/// Pulse-centred grid: `n_pre` points uniformly covering `[-pre, 0)` followed by
/// `n_post` log-spaced points on `(0, post]`, with `t = 0` included.
///
/// Dense sampling near the pulse and sparse sampling in the slow cooling tail.
pub fn pulse_grid(pre: f64, post: f64, n_pre: usize, n_post: usize) -> Result<Vec<f64>, AppError> {
    if !(pre > 0.0 && post > 0.0) {
        return Err(AppError::config("Pulse grid needs positive pre- and post-pulse spans."));
    }
    let mut out = linspace(-pre, 0.0, n_pre.max(2))?;
    let first = (post * 1e-3).min(0.1);
    out.extend(log_space(first, post, n_post.max(2))?);
    Ok(out)
}
