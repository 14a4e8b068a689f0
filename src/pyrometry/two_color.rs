//! Closed-form two-color pyrometry.
//!
//! ```text
//! T = φ · (1/λ2 − 1/λ1) · 1e9 / ln( J1/J2 · (λ1/λ2)⁶ / Emr )
//! ```
//!
//! with `φ = h c / kb` and wavelengths in nm. The expression is exact under the
//! Wien approximation. A non-positive log argument is evaluated with the
//! complex logarithm and only the real part of `T` is kept; such samples are
//! counted in `Diagnostics::degenerate` and logged.

use nalgebra::Complex;
use ndarray::{Array2, ArrayView3};
use rand::RngCore;
use tracing::warn;

use crate::constants::PHI;
use crate::domain::{Diagnostics, PyrometryKind, PyrometryResult, SignalTensor, initial_row_mean};
use crate::error::AppError;
use crate::models::SpectroscopicModel;
use crate::pyrometry::Invert;

/// Closed-form temperature from two channels. Returns `(T, degenerate)`.
pub fn two_color_temperature(j1: f64, j2: f64, l1: f64, l2: f64, emr: f64) -> (f64, bool) {
    let numerator = PHI * (1.0 / l2 - 1.0 / l1) * 1e9;
    let arg = j1 / j2 * (l1 / l2).powi(6) / emr;
    if arg > 0.0 {
        return (numerator / arg.ln(), false);
    }
    let t = Complex::new(numerator, 0.0) / Complex::new(arg, 0.0).ln();
    (t.re, true)
}

/// Closed-form temperature for every `(time, shot)` sample of a two-channel tensor.
pub(crate) struct ClosedForm {
    pub temperature: Array2<f64>,
    pub degenerate: usize,
}

pub(crate) fn closed_form(model: &SpectroscopicModel, data: ArrayView3<'_, f64>) -> ClosedForm {
    let wl = model.wavelengths();
    let (l1, l2) = (wl[0], wl[1]);
    let emr = model.emr(l1, l2);
    let (n_time, n_shots, _) = data.dim();
    let mut degenerate = 0;
    let temperature = Array2::from_shape_fn((n_time, n_shots), |(i, j)| {
        let (t, bad) = two_color_temperature(data[[i, j, 0]], data[[i, j, 1]], l1, l2, emr);
        degenerate += usize::from(bad);
        t
    });
    if degenerate > 0 {
        warn!(degenerate, "non-positive two-color log argument; kept the real part");
    }
    ClosedForm {
        temperature,
        degenerate,
    }
}

/// `C = J / forward(T)` averaged over channels, per `(time, shot)`.
pub(crate) fn scaling_at(
    model: &SpectroscopicModel,
    data: ArrayView3<'_, f64>,
    temperature: &Array2<f64>,
) -> Array2<f64> {
    let wl = model.wavelengths();
    Array2::from_shape_fn(temperature.dim(), |(i, j)| {
        let t = temperature[[i, j]];
        let sum: f64 = wl
            .iter()
            .enumerate()
            .map(|(k, &l)| data[[i, j, k]] / model.spectral_emission(l, t))
            .sum();
        sum / wl.len() as f64
    })
}

fn result(
    kind: PyrometryKind,
    temperature: Array2<f64>,
    scaling: Option<Array2<f64>>,
    degenerate: usize,
) -> PyrometryResult {
    let diagnostics = Diagnostics {
        initial_temperature: initial_row_mean(&temperature),
        degenerate,
        ..Diagnostics::default()
    };
    PyrometryResult {
        strategy: kind,
        temperature,
        scaling,
        temperature_std: None,
        scaling_std: None,
        diagnostics,
    }
}

/// Temperature only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio;

impl Invert for Ratio {
    fn kind(&self) -> PyrometryKind {
        PyrometryKind::Ratio
    }

    fn invert(
        &self,
        model: &SpectroscopicModel,
        signal: &SignalTensor,
        _rng: &mut dyn RngCore,
    ) -> Result<PyrometryResult, AppError> {
        let cf = closed_form(model, signal.data.view());
        Ok(result(self.kind(), cf.temperature, None, cf.degenerate))
    }
}

/// Temperature, then the scaling factor at that temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingFactor;

impl Invert for ScalingFactor {
    fn kind(&self) -> PyrometryKind {
        PyrometryKind::ScalingFactor
    }

    fn invert(
        &self,
        model: &SpectroscopicModel,
        signal: &SignalTensor,
        _rng: &mut dyn RngCore,
    ) -> Result<PyrometryResult, AppError> {
        let cf = closed_form(model, signal.data.view());
        let scaling = scaling_at(model, signal.data.view(), &cf.temperature);
        Ok(result(self.kind(), cf.temperature, Some(scaling), cf.degenerate))
    }
}

/// Temperature as for `Ratio`; scaling evaluated at the material boiling point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstTemperature;

impl Invert for ConstTemperature {
    fn kind(&self) -> PyrometryKind {
        PyrometryKind::ConstTemperature
    }

    fn invert(
        &self,
        model: &SpectroscopicModel,
        signal: &SignalTensor,
        _rng: &mut dyn RngCore,
    ) -> Result<PyrometryResult, AppError> {
        let cf = closed_form(model, signal.data.view());
        let reference = Array2::from_elem(cf.temperature.dim(), model.props().particle.tb);
        let scaling = scaling_at(model, signal.data.view(), &reference);
        Ok(result(self.kind(), cf.temperature, Some(scaling), cf.degenerate))
    }
}

/// Fixed scaling factor. Not implemented; always a configuration error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstConcentration {
    pub constant: Option<f64>,
}

impl Invert for ConstConcentration {
    fn kind(&self) -> PyrometryKind {
        PyrometryKind::ConstConcentration
    }

    fn invert(
        &self,
        _model: &SpectroscopicModel,
        _signal: &SignalTensor,
        _rng: &mut dyn RngCore,
    ) -> Result<PyrometryResult, AppError> {
        match self.constant {
            None => Err(AppError::config(
                "Constant-concentration pyrometry requires a constant scaling factor.",
            )),
            Some(c) => Err(AppError::config(format!(
                "Constant-concentration pyrometry (C = {c}) is not implemented."
            ))),
        }
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

    fn model(material: MaterialKind, kind: PyrometryKind, law: BlackbodyLaw, wl: [f64; 2]) -> SpectroscopicModel {
        let opts = SpectroscopicOptions {
            wavelengths: wl.to_vec(),
            pyrometry: kind,
            law,
            ..SpectroscopicOptions::default()
        };
        SpectroscopicModel::new(MaterialProperties::build(material, GasKind::Argon), opts).unwrap()
    }

    #[test]
    fn reference_scenario() {
        let (t, degenerate) = two_color_temperature(2.0, 1.0, 650.0, 750.0, 1.0);
        assert!(!degenerate);
        assert_relative_eq!(t, 17_837.39, max_relative = 5e-7);
    }

    #[test]
    fn physically_consistent_ratio_lands_in_incandescence_range() {
        // J1/J2 of a 3000 K Planck emitter (E(m) constant).
        let (t, _) = two_color_temperature(0.881_419_872_1, 1.0, 650.0, 750.0, 1.0);
        assert!((2000.0..=4500.0).contains(&t));
        assert_relative_eq!(t, 2996.81, max_relative = 1e-5);
    }

    #[test]
    fn swapping_channels_is_invariant() {
        let (a, _) = two_color_temperature(1.7, 1.1, 650.0, 750.0, 1.2);
        let (b, _) = two_color_temperature(1.1, 1.7, 750.0, 650.0, 1.0 / 1.2);
        assert_relative_eq!(a, b, max_relative = 1e-12);

        let forward = model(MaterialKind::Iron, PyrometryKind::Ratio, BlackbodyLaw::Wien, [650.0, 750.0]);
        let swapped = model(MaterialKind::Iron, PyrometryKind::Ratio, BlackbodyLaw::Wien, [750.0, 650.0]);
        let ta = forward.inverse(&forward.forward_scalar(2800.0)).unwrap();
        let tb = swapped.inverse(&swapped.forward_scalar(2800.0)).unwrap();
        assert_relative_eq!(ta.temperature[[0, 0]], tb.temperature[[0, 0]], max_relative = 1e-12);
    }

    #[test]
    fn wien_round_trip_is_exact() {
        let m = model(MaterialKind::Iron, PyrometryKind::Ratio, BlackbodyLaw::Wien, [650.0, 750.0]);
        let truth = array![[1500.0, 2500.0], [3500.0, 5000.0]];
        let out = m.inverse(&m.forward(&truth)).unwrap();
        for (a, b) in out.temperature.iter().zip(truth.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-10);
        }
        assert_eq!(out.diagnostics.degenerate, 0);
        assert_relative_eq!(out.diagnostics.initial_temperature, 2000.0, max_relative = 1e-10);
    }

    #[test]
    fn planck_round_trip_is_close_at_incandescence_temperatures() {
        let m = model(MaterialKind::Soot, PyrometryKind::Ratio, BlackbodyLaw::Planck, [650.0, 750.0]);
        let out = m.inverse(&m.forward_scalar(3000.0)).unwrap();
        assert_relative_eq!(out.temperature[[0, 0]], 3000.0, max_relative = 5e-3);
    }

    #[test]
    fn scaling_factor_reproduces_the_signal() {
        let m = model(MaterialKind::Soot, PyrometryKind::ScalingFactor, BlackbodyLaw::Wien, [650.0, 750.0]);
        let truth = array![[3200.0], [2900.0], [2600.0]];
        let c_true = 2.5e-3;
        let signal = m.forward(&truth);
        let scaled = SignalTensor {
            wavelengths: signal.wavelengths.clone(),
            data: &signal.data * c_true,
        };
        let out = m.inverse(&scaled).unwrap();
        let c = out.scaling.unwrap();
        for &v in c.iter() {
            assert_relative_eq!(v, c_true, max_relative = 1e-10);
        }
        // C · forward(T) == J
        let rebuilt = m.forward(&out.temperature).data * c_true;
        for (a, b) in rebuilt.iter().zip(scaled.data.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-9);
        }
    }

    #[test]
    fn const_temperature_matches_ratio_temperature() {
        let truth = array![[3200.0, 3100.0], [2700.0, 2650.0]];
        let ratio = model(MaterialKind::Iron, PyrometryKind::Ratio, BlackbodyLaw::Planck, [650.0, 750.0]);
        let fixed = model(MaterialKind::Iron, PyrometryKind::ConstTemperature, BlackbodyLaw::Planck, [650.0, 750.0]);
        let signal = ratio.forward(&truth);
        let a = ratio.inverse(&signal).unwrap();
        let b = fixed.inverse(&signal).unwrap();
        assert_eq!(a.temperature, b.temperature);
        assert!(a.scaling.is_none());

        // Scaling is J / forward(Tb), independent of the recovered temperature.
        let tb = fixed.props().particle.tb;
        let c = b.scaling.unwrap();
        let expected = signal.data[[0, 0, 0]] / fixed.spectral_emission(650.0, tb);
        let expected = (expected + signal.data[[0, 0, 1]] / fixed.spectral_emission(750.0, tb)) / 2.0;
        assert_relative_eq!(c[[0, 0]], expected, max_relative = 1e-12);
    }

    #[test]
    fn negative_log_argument_is_reduced_to_real_part() {
        let m = model(MaterialKind::Soot, PyrometryKind::Ratio, BlackbodyLaw::Planck, [650.0, 750.0]);
        let data = Array3::from_shape_vec((1, 1, 2), vec![-1.0, 1.0]).unwrap();
        let signal = SignalTensor::new(vec![650.0, 750.0], data).unwrap();
        let out = m.inverse(&signal).unwrap();
        assert_eq!(out.diagnostics.degenerate, 1);
        let t = out.temperature[[0, 0]];
        assert!(t.is_finite());

        // Re(A / (ln|z| + iπ)) = A ln|z| / (ln²|z| + π²)
        let a = PHI * (1.0 / 750.0 - 1.0 / 650.0) * 1e9;
        let lz = (650.0f64 / 750.0).powi(6).ln();
        assert_relative_eq!(t, a * lz / (lz * lz + std::f64::consts::PI.powi(2)), max_relative = 1e-12);
    }

    #[test]
    fn const_concentration_is_a_config_error() {
        let m = model(MaterialKind::Soot, PyrometryKind::ConstConcentration, BlackbodyLaw::Planck, [650.0, 750.0]);
        let err = m.inverse(&m.forward_scalar(3000.0)).unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("requires")));

        let with_constant = SpectroscopicModel::new(
            m.props().clone(),
            SpectroscopicOptions {
                pyrometry: PyrometryKind::ConstConcentration,
                const_concentration: Some(1e-3),
                ..SpectroscopicOptions::default()
            },
        )
        .unwrap();
        let err = with_constant.inverse(&m.forward_scalar(3000.0)).unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("not implemented")));
    }
}
