//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed between the heat-transfer and spectroscopic models in memory
//! - exported to JSON/CSV by the CLI
//! - compared across strategies in tests
//!
//! Axis conventions are fixed crate-wide:
//!
//! - trajectories are `(time, shot)`
//! - signals are `(time, shot, wavelength)`, wavelength order = configured list

use clap::ValueEnum;
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Inversion strategy for recovering temperature from incandescence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PyrometryKind {
    /// Closed-form two-color ratio; temperature only.
    Ratio,
    /// Two-color temperature, then `C = J / forward(T)`.
    ScalingFactor,
    /// Two-color temperature, scaling evaluated at the boiling point.
    ConstTemperature,
    /// Shot-averaged two-color with Monte-Carlo uncertainty.
    Advanced,
    /// Fixed scaling factor. Defined but not implemented.
    ConstConcentration,
    /// Nonlinear least squares over all wavelengths.
    SpectralFit,
}

impl PyrometryKind {
    /// Strategies built on the closed-form two-wavelength ratio.
    pub fn is_two_color(self) -> bool {
        matches!(
            self,
            PyrometryKind::Ratio
                | PyrometryKind::ScalingFactor
                | PyrometryKind::ConstTemperature
                | PyrometryKind::Advanced
                | PyrometryKind::ConstConcentration
        )
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PyrometryKind::Ratio => "two-color ratio",
            PyrometryKind::ScalingFactor => "two-color + scaling factor",
            PyrometryKind::ConstTemperature => "two-color, constant reference temperature",
            PyrometryKind::Advanced => "two-color, shot-averaged + Monte Carlo",
            PyrometryKind::ConstConcentration => "constant concentration",
            PyrometryKind::SpectralFit => "spectral fit",
        }
    }
}

/// Sub-strategy for the spectral-fit family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MulticolorKind {
    /// Joint fit over all time steps with one shared scaling factor.
    SimultaneousConstMass,
    /// Joint fit with a smoothness penalty on the scaling trajectory.
    SimultaneousSmoothPrior,
    /// Independent fit per time step.
    Sequential,
}

impl MulticolorKind {
    pub fn display_name(self) -> &'static str {
        match self {
            MulticolorKind::SimultaneousConstMass => "simultaneous, constant mass",
            MulticolorKind::SimultaneousSmoothPrior => "simultaneous, smooth prior",
            MulticolorKind::Sequential => "sequential",
        }
    }
}

/// Spectral radiance law used by the forward model.
///
/// `Wien` drops the `-1` in Planck's denominator; it is the approximation the
/// closed-form two-color inversion is derived from, so forward(Wien) followed by
/// the ratio inversion is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BlackbodyLaw {
    #[default]
    Planck,
    Wien,
}

/// Temperature (and optional mass / annealed-fraction) history on a fixed time grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureTrajectory {
    /// Time grid (ns), relative to the laser-pulse centre.
    pub time: Vec<f64>,
    /// Temperature (K), shape `(time, shot)`.
    pub temperature: Array2<f64>,
    /// Particle mass normalized by its initial value, shape `(time, shot)`.
    pub mass: Option<Array2<f64>>,
    /// Annealed fraction in `[0, 1]`, shape `(time, shot)`.
    pub annealed: Option<Array2<f64>>,
}

impl TemperatureTrajectory {
    /// Single-shot trajectory from plain vectors.
    pub fn single(
        time: Vec<f64>,
        temperature: Vec<f64>,
        mass: Option<Vec<f64>>,
        annealed: Option<Vec<f64>>,
    ) -> Self {
        let column = |v: Vec<f64>| {
            let n = v.len();
            Array1::from_vec(v).into_shape_with_order((n, 1)).unwrap_or_else(|_| Array2::zeros((0, 1)))
        };
        Self {
            time,
            temperature: column(temperature),
            mass: mass.map(column),
            annealed: annealed.map(column),
        }
    }

    /// Stack single-shot trajectories (same time grid) along the shot axis.
    pub fn stack(parts: &[TemperatureTrajectory]) -> Result<Self, AppError> {
        let Some(first) = parts.first() else {
            return Err(AppError::config("Cannot stack an empty set of trajectories."));
        };
        let n_time = first.time.len();
        if parts.iter().any(|p| p.time.len() != n_time || p.temperature.nrows() != n_time) {
            return Err(AppError::config("Trajectories must share the same time grid."));
        }

        let concat = |get: &dyn Fn(&TemperatureTrajectory) -> Option<ArrayView2<f64>>| -> Option<Array2<f64>> {
            let views: Option<Vec<ArrayView2<f64>>> = parts.iter().map(get).collect();
            ndarray::concatenate(Axis(1), &views?).ok()
        };

        let temperature = concat(&|p| Some(p.temperature.view()))
            .ok_or_else(|| AppError::config("Failed to stack temperature trajectories."))?;
        Ok(Self {
            time: first.time.clone(),
            temperature,
            mass: concat(&|p| p.mass.as_ref().map(|m| m.view())),
            annealed: concat(&|p| p.annealed.as_ref().map(|a| a.view())),
        })
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn n_shots(&self) -> usize {
        self.temperature.ncols()
    }

    /// Temperature averaged over shots at each time step.
    pub fn mean_temperature(&self) -> Vec<f64> {
        match self.temperature.mean_axis(Axis(1)) {
            Some(mean) => mean.to_vec(),
            None => Vec::new(),
        }
    }

    /// Peak of the shot-averaged temperature and the time it occurs at.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.mean_temperature()
            .into_iter()
            .zip(self.time.iter().copied())
            .filter(|(t, _)| t.is_finite())
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(temp, time)| (time, temp))
    }
}

/// Observed or simulated incandescence, indexed `(time, shot, wavelength)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalTensor {
    /// Measurement wavelengths (nm) in channel order.
    pub wavelengths: Vec<f64>,
    pub data: Array3<f64>,
}

impl SignalTensor {
    pub fn new(wavelengths: Vec<f64>, data: Array3<f64>) -> Result<Self, AppError> {
        let signal = Self { wavelengths, data };
        signal.check_channels()?;
        Ok(signal)
    }

    /// The wavelength axis of `data` must match `wavelengths`.
    pub fn check_channels(&self) -> Result<(), AppError> {
        if self.data.len_of(Axis(2)) != self.wavelengths.len() {
            return Err(AppError::config(format!(
                "Signal has {} wavelength channels but {} wavelengths were configured.",
                self.data.len_of(Axis(2)),
                self.wavelengths.len()
            )));
        }
        Ok(())
    }

    pub fn n_time(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn n_shots(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn n_wavelengths(&self) -> usize {
        self.wavelengths.len()
    }

    /// Shot-averaged signal, shape `(time, wavelength)`.
    pub fn shot_mean(&self) -> Array2<f64> {
        self.data
            .mean_axis(Axis(1))
            .unwrap_or_else(|| Array2::zeros((self.n_time(), self.n_wavelengths())))
    }

    /// Standard error of the shot mean, shape `(time, wavelength)`.
    ///
    /// Zero when only one shot is available.
    pub fn shot_std_error(&self) -> Array2<f64> {
        let n = self.n_shots();
        if n < 2 {
            return Array2::zeros((self.n_time(), self.n_wavelengths()));
        }
        self.data.std_axis(Axis(1), 1.0) / (n as f64).sqrt()
    }

    /// Collapse the shot axis to its mean, keeping a single-shot tensor.
    pub fn averaged(&self) -> SignalTensor {
        let mean = self.shot_mean();
        let (n_time, n_wl) = mean.dim();
        let data = mean
            .into_shape_with_order((n_time, 1, n_wl))
            .unwrap_or_else(|_| Array3::zeros((n_time, 1, n_wl)));
        SignalTensor {
            wavelengths: self.wavelengths.clone(),
            data,
        }
    }
}

/// Auxiliary output of an inversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Mean over shots of the temperature at the first time index (K).
    pub initial_temperature: f64,
    /// Fit residuals `(time, wavelength)` (spectral fits only).
    pub residuals: Option<Array2<f64>>,
    /// Lower 95% confidence bound on temperature per time step.
    pub lower: Option<Array1<f64>>,
    /// Upper 95% confidence bound on temperature per time step.
    pub upper: Option<Array1<f64>>,
    /// Monte-Carlo temperature draws, shape `(time, sample)`.
    pub mc_draws: Option<Array2<f64>>,
    /// Closed-form samples whose log-argument was non-positive and were
    /// reduced to the real part.
    pub degenerate: usize,
    /// Optimizer iterations (spectral fits only; summed for sequential fits).
    pub iterations: Option<usize>,
    /// Whether every underlying fit converged (spectral fits only).
    pub converged: Option<bool>,
}

/// Output of a single inversion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PyrometryResult {
    pub strategy: PyrometryKind,
    /// Temperature (K), shape `(time, shot)`; shot-averaging strategies return one column.
    pub temperature: Array2<f64>,
    /// Scaling / concentration factor with the same shape as `temperature`.
    pub scaling: Option<Array2<f64>>,
    /// One-sigma temperature uncertainty per time step.
    pub temperature_std: Option<Array1<f64>>,
    /// One-sigma scaling uncertainty per time step.
    pub scaling_std: Option<Array1<f64>>,
    pub diagnostics: Diagnostics,
}

impl PyrometryResult {
    /// Temperature averaged across shots.
    pub fn mean_temperature(&self) -> Vec<f64> {
        self.temperature
            .mean_axis(Axis(1))
            .map(|m| m.to_vec())
            .unwrap_or_default()
    }

    /// Scaling factor averaged across shots.
    pub fn mean_scaling(&self) -> Option<Vec<f64>> {
        self.scaling
            .as_ref()
            .and_then(|c| c.mean_axis(Axis(1)))
            .map(|m| m.to_vec())
    }
}

/// Mean over shots of the first time row of a `(time, shot)` array.
pub fn initial_row_mean(temperature: &Array2<f64>) -> f64 {
    if temperature.nrows() == 0 {
        return f64::NAN;
    }
    temperature.row(0).mean().unwrap_or(f64::NAN)
}
