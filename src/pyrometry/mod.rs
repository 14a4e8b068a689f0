//! Pyrometry strategies.
//!
//! Every strategy implements `Invert`; `Strategy` is the closed set selected by
//! `SpectroscopicOptions`:
//!
//! - two-color family (`two_color`): ratio, scaling factor, constant reference
//!   temperature, and the constant-concentration placeholder
//! - `advanced`: shot-averaged two-color with Monte-Carlo uncertainty
//! - spectral fit (`crate::fit`): sequential or simultaneous least squares
//!
//! Dispatch happens once, from configuration. A two-color strategy with any
//! wavelength count other than two is a configuration error.

use rand::RngCore;

use crate::domain::{PyrometryKind, PyrometryResult, SignalTensor};
use crate::error::AppError;
use crate::fit::SpectralFit;
use crate::models::{SpectroscopicModel, SpectroscopicOptions};

pub mod advanced;
pub mod two_color;

pub use advanced::Advanced;
pub use two_color::{ConstConcentration, ConstTemperature, Ratio, ScalingFactor, two_color_temperature};

/// Common contract of all inversion strategies.
pub trait Invert {
    fn kind(&self) -> PyrometryKind;

    fn invert(
        &self,
        model: &SpectroscopicModel,
        signal: &SignalTensor,
        rng: &mut dyn RngCore,
    ) -> Result<PyrometryResult, AppError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    Ratio(Ratio),
    ScalingFactor(ScalingFactor),
    ConstTemperature(ConstTemperature),
    Advanced(Advanced),
    ConstConcentration(ConstConcentration),
    SpectralFit(SpectralFit),
}

impl Strategy {
    pub fn from_options(opts: &SpectroscopicOptions) -> Result<Self, AppError> {
        let kind = opts.pyrometry;
        let n_wl = opts.wavelengths.len();
        if kind.is_two_color() && kind != PyrometryKind::ConstConcentration && n_wl != 2 {
            return Err(AppError::config(format!(
                "{} pyrometry needs exactly 2 wavelengths, {n_wl} configured.",
                kind.display_name()
            )));
        }
        Ok(match kind {
            PyrometryKind::Ratio => Strategy::Ratio(Ratio),
            PyrometryKind::ScalingFactor => Strategy::ScalingFactor(ScalingFactor),
            PyrometryKind::ConstTemperature => Strategy::ConstTemperature(ConstTemperature),
            PyrometryKind::Advanced => {
                if opts.mc_samples < 2 {
                    return Err(AppError::config("Monte-Carlo uncertainty needs at least 2 samples."));
                }
                Strategy::Advanced(Advanced {
                    samples: opts.mc_samples,
                })
            }
            PyrometryKind::ConstConcentration => Strategy::ConstConcentration(ConstConcentration {
                constant: opts.const_concentration,
            }),
            PyrometryKind::SpectralFit => {
                if n_wl < 2 {
                    return Err(AppError::config("Spectral fitting needs at least 2 wavelengths."));
                }
                Strategy::SpectralFit(SpectralFit {
                    kind: opts.multicolor,
                    prior_weight: opts.prior_weight,
                })
            }
        })
    }

    fn inner(&self) -> &dyn Invert {
        match self {
            Strategy::Ratio(s) => s,
            Strategy::ScalingFactor(s) => s,
            Strategy::ConstTemperature(s) => s,
            Strategy::Advanced(s) => s,
            Strategy::ConstConcentration(s) => s,
            Strategy::SpectralFit(s) => s,
        }
    }
}

impl Invert for Strategy {
    fn kind(&self) -> PyrometryKind {
        self.inner().kind()
    }

    fn invert(
        &self,
        model: &SpectroscopicModel,
        signal: &SignalTensor,
        rng: &mut dyn RngCore,
    ) -> Result<PyrometryResult, AppError> {
        self.inner().invert(model, signal, rng)
    }
}
