//! Shot-averaged two-color pyrometry with Monte-Carlo uncertainty.
//!
//! Per time step:
//!
//! 1. average both channels over shots
//! 2. closed-form temperature and scaling factor on the averages
//! 3. draw `samples` channel pairs from `N(mean, Σ / n_shots)`, `Σ` the
//!    sample covariance across shots, and re-run the closed form on each draw
//!
//! The spread of the draws is the reported uncertainty. With identical shots
//! (`Σ = 0`) every draw equals the mean and the uncertainty is zero.

use nalgebra::{Cholesky, Matrix2, Vector2};
use ndarray::{Array1, Array2, Axis};
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};
use tracing::warn;

use crate::domain::{Diagnostics, PyrometryKind, PyrometryResult, SignalTensor, initial_row_mean};
use crate::error::AppError;
use crate::math::stats::{quantile, std_dev};
use crate::models::SpectroscopicModel;
use crate::pyrometry::Invert;
use crate::pyrometry::two_color::{closed_form, scaling_at, two_color_temperature};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advanced {
    /// Draws per time step.
    pub samples: usize,
}

/// Lower-triangular factor of the per-time-step covariance of the shot mean.
fn mean_covariance_factor(signal: &SignalTensor, i: usize) -> Matrix2<f64> {
    let n = signal.n_shots();
    if n < 2 {
        return Matrix2::zeros();
    }
    let row = signal.data.index_axis(Axis(0), i);
    let m0 = row.column(0).mean().unwrap_or(0.0);
    let m1 = row.column(1).mean().unwrap_or(0.0);
    let mut cov = Matrix2::zeros();
    for s in 0..n {
        let d = Vector2::new(row[[s, 0]] - m0, row[[s, 1]] - m1);
        cov += d * d.transpose();
    }
    // Sample covariance (ddof 1), then covariance of the mean.
    cov /= (n - 1) as f64 * n as f64;

    match Cholesky::new(cov) {
        Some(chol) => chol.l(),
        // Singular (e.g. zero or perfectly correlated): fall back to independent channels.
        None => Matrix2::from_diagonal(&cov.diagonal().map(|v| v.max(0.0).sqrt())),
    }
}

impl Invert for Advanced {
    fn kind(&self) -> PyrometryKind {
        PyrometryKind::Advanced
    }

    fn invert(
        &self,
        model: &SpectroscopicModel,
        signal: &SignalTensor,
        rng: &mut dyn RngCore,
    ) -> Result<PyrometryResult, AppError> {
        let averaged = signal.averaged();
        let cf = closed_form(model, averaged.data.view());
        let scaling = scaling_at(model, averaged.data.view(), &cf.temperature);

        let wl = model.wavelengths();
        let (l1, l2) = (wl[0], wl[1]);
        let emr = model.emr(l1, l2);
        let n_time = signal.n_time();

        let mut draws = Array2::<f64>::zeros((n_time, self.samples));
        let mut t_std = Array1::<f64>::zeros(n_time);
        let mut c_std = Array1::<f64>::zeros(n_time);
        let mut lower = Array1::<f64>::zeros(n_time);
        let mut upper = Array1::<f64>::zeros(n_time);
        let mut degenerate = cf.degenerate;

        for i in 0..n_time {
            let mean = Vector2::new(averaged.data[[i, 0, 0]], averaged.data[[i, 0, 1]]);
            let factor = mean_covariance_factor(signal, i);

            let mut temps = Vec::with_capacity(self.samples);
            let mut scales = Vec::with_capacity(self.samples);
            for k in 0..self.samples {
                let z: Vector2<f64> =
                    Vector2::new(StandardNormal.sample(&mut *rng), StandardNormal.sample(&mut *rng));
                let j = mean + factor * z;
                let (t, bad) = two_color_temperature(j[0], j[1], l1, l2, emr);
                degenerate += usize::from(bad);
                let c = 0.5 * (j[0] / model.spectral_emission(l1, t) + j[1] / model.spectral_emission(l2, t));
                draws[[i, k]] = t;
                temps.push(t);
                scales.push(c);
            }
            t_std[i] = std_dev(&temps);
            c_std[i] = std_dev(&scales);
            lower[i] = quantile(&temps, 0.025);
            upper[i] = quantile(&temps, 0.975);
        }

        if degenerate > cf.degenerate {
            warn!(
                draws = degenerate - cf.degenerate,
                "Monte-Carlo draws with non-positive log argument; kept the real part"
            );
        }

        let diagnostics = Diagnostics {
            initial_temperature: initial_row_mean(&cf.temperature),
            lower: Some(lower),
            upper: Some(upper),
            mc_draws: Some(draws),
            degenerate,
            ..Diagnostics::default()
        };
        Ok(PyrometryResult {
            strategy: self.kind(),
            temperature: cf.temperature,
            scaling: Some(scaling),
            temperature_std: Some(t_std),
            scaling_std: Some(c_std),
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BlackbodyLaw;
    use crate::models::SpectroscopicOptions;
    use crate::props::{GasKind, MaterialKind, MaterialProperties};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::Array3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const PATTERN: [[f64; 2]; 5] = [[1.0, 0.3], [-1.0, 0.8], [0.5, -1.0], [-0.5, 0.2], [0.0, -0.3]];

    fn model() -> SpectroscopicModel {
        let opts = SpectroscopicOptions {
            pyrometry: PyrometryKind::Advanced,
            law: BlackbodyLaw::Wien,
            mc_samples: 400,
            ..SpectroscopicOptions::default()
        };
        SpectroscopicModel::new(MaterialProperties::build(MaterialKind::Soot, GasKind::Argon), opts).unwrap()
    }

    /// Five shots around the clean signal with relative spread `s`.
    fn noisy(model: &SpectroscopicModel, truth: &[f64], s: f64) -> SignalTensor {
        let clean = model.forward(&Array2::from_shape_vec((truth.len(), 1), truth.to_vec()).unwrap());
        let data = Array3::from_shape_fn((truth.len(), PATTERN.len(), 2), |(i, j, k)| {
            clean.data[[i, 0, k]] * (1.0 + s * PATTERN[j][k])
        });
        SignalTensor::new(clean.wavelengths, data).unwrap()
    }

    fn run(model: &SpectroscopicModel, signal: &SignalTensor) -> PyrometryResult {
        let mut rng = StdRng::seed_from_u64(7);
        model.inverse_with_rng(signal, &mut rng).unwrap()
    }

    #[test]
    fn uncertainty_shrinks_with_measurement_noise() {
        let m = model();
        let mut prev = f64::INFINITY;
        for s in [0.1, 0.03, 0.01, 0.001] {
            let out = run(&m, &noisy(&m, &[3000.0], s));
            let std = out.temperature_std.unwrap()[0];
            assert!(std > 0.0 && std < prev, "s = {s}: {std} !< {prev}");
            prev = std;
        }
    }

    #[test]
    fn zero_noise_collapses_to_the_deterministic_estimate() {
        let m = model();
        let signal = noisy(&m, &[3000.0, 2500.0], 0.0);
        let out = run(&m, &signal);
        let std = out.temperature_std.unwrap();
        for &v in std.iter() {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-6);
        }
        let draws = out.diagnostics.mc_draws.unwrap();
        assert_eq!(draws.dim(), (2, 400));
        for &d in draws.row(0).iter() {
            assert_relative_eq!(d, out.temperature[[0, 0]]);
        }
        assert_relative_eq!(out.temperature[[0, 0]], 3000.0, max_relative = 1e-10);
    }

    #[test]
    fn results_are_reproducible_for_a_seed() {
        let m = model();
        let signal = noisy(&m, &[3000.0, 2800.0], 0.05);
        assert_eq!(run(&m, &signal), run(&m, &signal));
        assert_eq!(m.inverse(&signal).unwrap(), m.inverse(&signal).unwrap());
    }

    #[test]
    fn shot_axis_is_averaged_away() {
        let m = model();
        let out = run(&m, &noisy(&m, &[3000.0, 2800.0, 2600.0], 0.02));
        assert_eq!(out.temperature.dim(), (3, 1));
        assert_eq!(out.scaling.as_ref().map(|c| c.dim()), Some((3, 1)));
        let (lo, hi) = (out.diagnostics.lower.unwrap(), out.diagnostics.upper.unwrap());
        for i in 0..3 {
            assert!(lo[i] <= out.temperature[[i, 0]] + 50.0 && hi[i] >= out.temperature[[i, 0]] - 50.0);
            assert!(lo[i] < hi[i]);
        }
    }
}
