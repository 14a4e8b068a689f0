//! Synthetic multi-shot incandescence signals.
//!
//! Each shot is the forward model of a temperature history, multiplied by a
//! scaling factor (particle volume fraction × detector gain) with optional
//! per-shot jitter, plus independent relative Gaussian noise per sample.
//! Generation is fully determined by the seed.

use ndarray::Array3;
use rand::rngs::StdRng;
use rand::prelude::*;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::domain::{SignalTensor, TemperatureTrajectory};
use crate::error::AppError;
use crate::models::SpectroscopicModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Number of laser shots.
    pub shots: usize,
    /// Relative noise standard deviation per sample.
    pub noise: f64,
    /// True scaling factor applied to every shot.
    pub scaling: f64,
    /// Relative standard deviation of the per-shot scaling factor.
    pub jitter: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            shots: 20,
            noise: 0.02,
            scaling: 1.0,
            jitter: 0.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticSignal {
    pub signal: SignalTensor,
    /// Scaling factor actually applied to each shot.
    pub shot_scaling: Vec<f64>,
}

/// Noisy shots of `trajectory` through `model`.
///
/// A single-shot trajectory is replicated across all shots; otherwise its shot
/// count must equal `config.shots`.
pub fn synthesize(
    model: &SpectroscopicModel,
    trajectory: &TemperatureTrajectory,
    config: &SyntheticConfig,
) -> Result<SyntheticSignal, AppError> {
    if config.shots == 0 {
        return Err(AppError::config("Shot count must be > 0."));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0 && config.jitter.is_finite() && config.jitter >= 0.0) {
        return Err(AppError::config("Noise and jitter levels must be finite and non-negative."));
    }
    if !(config.scaling.is_finite() && config.scaling > 0.0) {
        return Err(AppError::config("Scaling factor must be positive."));
    }
    let source_shots = trajectory.n_shots();
    if source_shots != 1 && source_shots != config.shots {
        return Err(AppError::config(format!(
            "Trajectory has {source_shots} shots but {} were requested.",
            config.shots
        )));
    }

    let clean = model.forward_trajectory(trajectory);
    let (n_time, _, n_wl) = clean.data.dim();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| AppError::numerical(format!("Noise distribution error: {e}")))?;

    let shot_scaling: Vec<f64> = (0..config.shots)
        .map(|_| config.scaling * (1.0 + config.jitter * normal.sample(&mut rng)).max(0.0))
        .collect();

    let mut data = Array3::<f64>::zeros((n_time, config.shots, n_wl));
    for ((i, s, k), v) in data.indexed_iter_mut() {
        let src = if source_shots == 1 { 0 } else { s };
        let z: f64 = normal.sample(&mut rng);
        *v = shot_scaling[s] * clean.data[[i, src, k]] * (1.0 + config.noise * z);
    }

    Ok(SyntheticSignal {
        signal: SignalTensor {
            wavelengths: clean.wavelengths,
            data,
        },
        shot_scaling,
    })
}
