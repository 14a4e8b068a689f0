//! Spectroscopic model: temperature ⇄ multi-wavelength incandescence.
//!
//! Forward: `J(λ, T) = B(λ, T) · E(m, λ) / λ / scale` per configured wavelength.
//!
//! Inverse: dispatched to one strategy per `PyrometryKind` (see
//! `crate::pyrometry`). The model holds no mutable state; the Monte-Carlo
//! strategy draws from the random source handed to `inverse_with_rng`.

use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    BlackbodyLaw, MulticolorKind, PyrometryKind, PyrometryResult, SignalTensor, TemperatureTrajectory,
};
use crate::error::AppError;
use crate::math::planck::{NM, blackbody, blackbody_dt};
use crate::props::MaterialProperties;
use crate::pyrometry::{Invert, Strategy};

/// Inversion and forward-model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectroscopicOptions {
    /// Measurement wavelengths (nm) in channel order. Default: `[650, 750]`.
    pub wavelengths: Vec<f64>,
    /// Default: `Ratio`.
    pub pyrometry: PyrometryKind,
    /// Spectral-fit sub-strategy. Default: `Sequential`.
    pub multicolor: MulticolorKind,
    /// Monte-Carlo draws per time step (advanced strategy). Default: 500.
    pub mc_samples: usize,
    /// Seed for `inverse`. Default: 42.
    pub seed: u64,
    /// Instrument calibration divisor. Default: 1.
    pub signal_scale: f64,
    /// Default: Planck.
    pub law: BlackbodyLaw,
    /// Weight of the smoothness penalty on the scaling trajectory. Default: 1.
    pub prior_weight: f64,
    /// Fixed scaling factor for the constant-concentration strategy.
    pub const_concentration: Option<f64>,
}

impl Default for SpectroscopicOptions {
    fn default() -> Self {
        Self {
            wavelengths: vec![650.0, 750.0],
            pyrometry: PyrometryKind::Ratio,
            multicolor: MulticolorKind::Sequential,
            mc_samples: 500,
            seed: 42,
            signal_scale: 1.0,
            law: BlackbodyLaw::Planck,
            prior_weight: 1.0,
            const_concentration: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpectroscopicModel {
    props: MaterialProperties,
    opts: SpectroscopicOptions,
}

impl SpectroscopicModel {
    pub fn new(props: MaterialProperties, opts: SpectroscopicOptions) -> Result<Self, AppError> {
        if opts.wavelengths.is_empty() {
            return Err(AppError::config("At least one measurement wavelength is required."));
        }
        if let Some(bad) = opts.wavelengths.iter().find(|l| !(l.is_finite() && **l > 0.0)) {
            return Err(AppError::config(format!("Invalid wavelength {bad} nm.")));
        }
        if !(opts.signal_scale.is_finite() && opts.signal_scale > 0.0) {
            return Err(AppError::config("Signal scaling constant must be positive."));
        }
        Ok(Self { props, opts })
    }

    pub fn props(&self) -> &MaterialProperties {
        &self.props
    }

    pub fn options(&self) -> &SpectroscopicOptions {
        &self.opts
    }

    pub fn wavelengths(&self) -> &[f64] {
        &self.opts.wavelengths
    }

    /// Diameter (nm) the absorption function is evaluated at.
    pub fn diameter(&self) -> f64 {
        self.props.particle.dp0
    }

    /// `E(m, λ1) / E(m, λ2)` at the model diameter.
    pub fn emr(&self, l1: f64, l2: f64) -> f64 {
        self.props.emr(l1, l2, self.diameter())
    }

    /// Signal of a unit scaling factor at one wavelength.
    pub fn spectral_emission(&self, lambda_nm: f64, t: f64) -> f64 {
        blackbody(lambda_nm, t, self.opts.law) * self.props.em(lambda_nm, self.diameter())
            / (lambda_nm * NM)
            / self.opts.signal_scale
    }

    /// `∂/∂T` of `spectral_emission`.
    pub fn spectral_emission_dt(&self, lambda_nm: f64, t: f64) -> f64 {
        blackbody_dt(lambda_nm, t, self.opts.law) * self.props.em(lambda_nm, self.diameter())
            / (lambda_nm * NM)
            / self.opts.signal_scale
    }

    /// Forward model for a `(time, shot)` temperature array.
    pub fn forward(&self, temperature: &Array2<f64>) -> SignalTensor {
        let (n_time, n_shots) = temperature.dim();
        let wl = &self.opts.wavelengths;
        let data = Array3::from_shape_fn((n_time, n_shots, wl.len()), |(i, j, k)| {
            self.spectral_emission(wl[k], temperature[[i, j]])
        });
        SignalTensor {
            wavelengths: wl.clone(),
            data,
        }
    }

    /// Forward model for a single temperature: one time step, one shot.
    pub fn forward_scalar(&self, t: f64) -> SignalTensor {
        self.forward(&Array2::from_elem((1, 1), t))
    }

    pub fn forward_trajectory(&self, trajectory: &TemperatureTrajectory) -> SignalTensor {
        self.forward(&trajectory.temperature)
    }

    /// Strategy selected by the options.
    pub fn strategy(&self) -> Result<Strategy, AppError> {
        Strategy::from_options(&self.opts)
    }

    /// Invert with the configured seed.
    pub fn inverse(&self, signal: &SignalTensor) -> Result<PyrometryResult, AppError> {
        let mut rng = StdRng::seed_from_u64(self.opts.seed);
        self.inverse_with_rng(signal, &mut rng)
    }

    /// Invert with an injected random source (only the advanced strategy draws from it).
    pub fn inverse_with_rng(
        &self,
        signal: &SignalTensor,
        rng: &mut dyn RngCore,
    ) -> Result<PyrometryResult, AppError> {
        if signal.wavelengths != self.opts.wavelengths {
            return Err(AppError::config(format!(
                "Signal wavelengths {:?} do not match the configured wavelengths {:?}.",
                signal.wavelengths, self.opts.wavelengths
            )));
        }
        signal.check_channels()?;
        let strategy = self.strategy()?;
        debug!(
            strategy = strategy.kind().display_name(),
            n_time = signal.n_time(),
            n_shots = signal.n_shots(),
            "inverting signal"
        );
        strategy.invert(self, signal, rng)
    }
}
