//! Spectral fitting: temperature and scaling factor by nonlinear least squares.
//!
//! Model per time step `i` and wavelength `k`:
//!
//! ```text
//! J(i, k) = C(i) · E_k(T(i))       E_k = B(λk, T) · E(m, λk) / λk / scale
//! ```
//!
//! - `sequential`: one `(T, C)` fit per time step, in parallel
//! - `simultaneous`: all time steps jointly, with either one shared `C`
//!   (constant mass) or a smoothness penalty on `C(i)`
//!
//! Shots are averaged first. Residuals are divided by the per-channel standard
//! error of the shot mean when more than one shot is available, otherwise by
//! the mean channel magnitude.

use ndarray::{Array1, Array2};
use rand::RngCore;
use tracing::warn;

use crate::domain::{Diagnostics, MulticolorKind, PyrometryKind, PyrometryResult, SignalTensor};
use crate::error::AppError;
use crate::math::lm::LmOptions;
use crate::models::SpectroscopicModel;
use crate::pyrometry::{Invert, two_color_temperature};

pub mod sequential;
pub mod simultaneous;

/// Temperature search range (K).
pub const T_MIN: f64 = 300.0;
pub const T_MAX: f64 = 10_000.0;

/// Two-sided 95% normal quantile.
const Z95: f64 = 1.959_963_984_540_054;

#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFit {
    pub kind: MulticolorKind,
    /// Weight of the smoothness penalty (smooth-prior mode only).
    pub prior_weight: f64,
}

/// Shot-averaged observations and residual weights, both `(time, wavelength)`.
#[derive(Debug, Clone)]
pub struct FitData {
    pub wavelengths: Vec<f64>,
    pub mean: Array2<f64>,
    pub sigma: Array2<f64>,
    /// `sigma` holds measured standard errors rather than channel magnitudes.
    pub measured: bool,
}

impl FitData {
    pub fn from_signal(signal: &SignalTensor) -> Self {
        let mean = signal.shot_mean();
        let stderr = signal.shot_std_error();
        let use_stderr = signal.n_shots() >= 2 && stderr.iter().all(|s| s.is_finite() && *s > 0.0);
        let sigma = if use_stderr {
            stderr
        } else {
            let mut sigma = Array2::<f64>::ones(mean.dim());
            for (k, col) in mean.columns().into_iter().enumerate() {
                let mag = col.iter().map(|v| v.abs()).sum::<f64>() / col.len().max(1) as f64;
                if mag.is_finite() && mag > 0.0 {
                    sigma.column_mut(k).fill(mag);
                }
            }
            sigma
        };
        Self {
            wavelengths: signal.wavelengths.clone(),
            mean,
            sigma,
            measured: use_stderr,
        }
    }

    pub fn n_time(&self) -> usize {
        self.mean.nrows()
    }

    pub fn n_wavelengths(&self) -> usize {
        self.wavelengths.len()
    }

    /// Starting point at time step `i`: two-color temperature from the outermost
    /// wavelengths, then the channel-averaged scaling factor at that temperature.
    pub fn initial_guess(&self, model: &SpectroscopicModel, i: usize) -> (f64, f64) {
        let last = self.n_wavelengths() - 1;
        let (l1, l2) = (self.wavelengths[0], self.wavelengths[last]);
        let (t, _) = two_color_temperature(self.mean[[i, 0]], self.mean[[i, last]], l1, l2, model.emr(l1, l2));
        let t = if t.is_finite() && t > 0.0 {
            t.clamp(T_MIN, T_MAX)
        } else {
            model.props().particle.ti
        };
        let c = self
            .wavelengths
            .iter()
            .enumerate()
            .map(|(k, &l)| self.mean[[i, k]] / model.spectral_emission(l, t))
            .sum::<f64>()
            / self.n_wavelengths() as f64;
        let c = if c.is_finite() && c > 0.0 { c } else { 1.0 };
        (t, c)
    }
}

/// Per-time-step estimates shared by both fitting modes.
#[derive(Debug, Clone)]
pub(crate) struct FitOutcome {
    pub temperature: Array1<f64>,
    pub scaling: Array1<f64>,
    pub temperature_std: Array1<f64>,
    pub scaling_std: Array1<f64>,
    pub residuals: Array2<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl FitOutcome {
    fn into_result(self) -> PyrometryResult {
        let n = self.temperature.len();
        let lower = &self.temperature - &(&self.temperature_std * Z95);
        let upper = &self.temperature + &(&self.temperature_std * Z95);
        let diagnostics = Diagnostics {
            initial_temperature: self.temperature.first().copied().unwrap_or(f64::NAN),
            residuals: Some(self.residuals),
            lower: Some(lower),
            upper: Some(upper),
            iterations: Some(self.iterations),
            converged: Some(self.converged),
            ..Diagnostics::default()
        };
        PyrometryResult {
            strategy: PyrometryKind::SpectralFit,
            temperature: column(self.temperature, n),
            scaling: Some(column(self.scaling, n)),
            temperature_std: Some(self.temperature_std),
            scaling_std: Some(self.scaling_std),
            diagnostics,
        }
    }
}

fn column(v: Array1<f64>, n: usize) -> Array2<f64> {
    v.into_shape_with_order((n, 1)).unwrap_or_else(|_| Array2::zeros((n, 1)))
}

pub(crate) fn lm_options() -> LmOptions {
    LmOptions {
        max_iterations: 500,
        ..LmOptions::default()
    }
}

impl Invert for SpectralFit {
    fn kind(&self) -> PyrometryKind {
        PyrometryKind::SpectralFit
    }

    fn invert(
        &self,
        model: &SpectroscopicModel,
        signal: &SignalTensor,
        _rng: &mut dyn RngCore,
    ) -> Result<PyrometryResult, AppError> {
        if signal.n_wavelengths() < 2 {
            return Err(AppError::config("Spectral fitting needs at least 2 wavelengths."));
        }
        if signal.n_time() == 0 {
            return Err(AppError::config("Signal has no time steps."));
        }
        let data = FitData::from_signal(signal);
        let outcome = match self.kind {
            MulticolorKind::Sequential => sequential::fit(model, &data)?,
            MulticolorKind::SimultaneousConstMass => simultaneous::fit_const_mass(model, &data)?,
            MulticolorKind::SimultaneousSmoothPrior => {
                simultaneous::fit_smooth_prior(model, &data, self.prior_weight)?
            }
        };
        if !outcome.converged {
            warn!(mode = self.kind.display_name(), "spectral fit did not converge");
        }
        Ok(outcome.into_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlackbodyLaw;
    use crate::models::SpectroscopicOptions;
    use crate::props::{GasKind, MaterialKind, MaterialProperties};
    use approx::assert_relative_eq;
    use ndarray::{Array3, array};

    fn model() -> SpectroscopicModel {
        let opts = SpectroscopicOptions {
            wavelengths: vec![500.0, 650.0, 750.0],
            pyrometry: PyrometryKind::SpectralFit,
            law: BlackbodyLaw::Planck,
            ..SpectroscopicOptions::default()
        };
        SpectroscopicModel::new(MaterialProperties::build(MaterialKind::Iron, GasKind::Argon), opts).unwrap()
    }

    #[test]
    fn single_shot_weights_use_channel_magnitude() {
        let signal = SignalTensor::new(vec![650.0, 750.0], array![[[2.0, 4.0]], [[4.0, 8.0]]]).unwrap();
        let data = FitData::from_signal(&signal);
        assert_eq!(data.sigma, array![[3.0, 6.0], [3.0, 6.0]]);
    }

    #[test]
    fn multi_shot_weights_use_standard_error() {
        let data = Array3::from_shape_vec((1, 2, 2), vec![1.0, 2.0, 3.0, 6.0]).unwrap();
        let signal = SignalTensor::new(vec![650.0, 750.0], data).unwrap();
        let fit = FitData::from_signal(&signal);
        assert_relative_eq!(fit.sigma[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(fit.sigma[[0, 1]], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn initial_guess_is_close_for_planck_data() {
        let m = model();
        let signal = m.forward(&array![[3000.0]]);
        let data = FitData::from_signal(&signal);
        let (t, c) = data.initial_guess(&m, 0);
        assert_relative_eq!(t, 3000.0, max_relative = 1e-2);
        assert_relative_eq!(c, 1.0, max_relative = 0.1);
    }

    #[test]
    fn confidence_bounds_bracket_the_estimate() {
        let m = model();
        let signal = m.forward(&array![[3100.0], [2900.0]]);
        let out = m.inverse(&signal).unwrap();
        let (lo, hi) = (out.diagnostics.lower.unwrap(), out.diagnostics.upper.unwrap());
        for i in 0..2 {
            assert!(lo[i] <= out.temperature[[i, 0]] && out.temperature[[i, 0]] <= hi[i]);
        }
        assert_eq!(out.diagnostics.residuals.unwrap().dim(), (2, 3));
        assert_eq!(out.diagnostics.converged, Some(true));
    }

    #[test]
    fn two_channel_single_shot_fit_leaves_uncertainty_undetermined() {
        let opts = SpectroscopicOptions {
            wavelengths: vec![650.0, 750.0],
            pyrometry: PyrometryKind::SpectralFit,
            law: BlackbodyLaw::Planck,
            ..SpectroscopicOptions::default()
        };
        let m = SpectroscopicModel::new(MaterialProperties::build(MaterialKind::Iron, GasKind::Argon), opts).unwrap();
        let out = m.inverse(&m.forward(&array![[3000.0]])).unwrap();
        assert_relative_eq!(out.temperature[[0, 0]], 3000.0, max_relative = 1e-6);
        assert!(out.temperature_std.unwrap()[0].is_nan());
        assert!(out.scaling_std.unwrap()[0].is_nan());
    }

    #[test]
    fn three_channel_noise_free_fit_has_negligible_uncertainty() {
        let m = model();
        let out = m.inverse(&m.forward(&array![[3000.0]])).unwrap();
        assert!(out.temperature_std.unwrap()[0] < 1e-3);
    }
}
