//! Joint fits over all time steps.
//!
//! Parameter layouts:
//!
//! - constant mass: `[T_1..T_n, C]`, one scaling factor for the whole record
//! - smooth prior: `[T_1..T_n, C_1..C_n]` plus `n − 1` penalty rows
//!   `w · (C_{i+1} − C_i) / C̄`, `C̄` the mean initial scaling factor

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use tracing::debug;

use crate::error::AppError;
use crate::fit::{FitData, FitOutcome, T_MAX, T_MIN, lm_options};
use crate::math::lm::{Bounds, LeastSquaresProblem, LmReport, levenberg_marquardt};
use crate::models::SpectroscopicModel;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Scaling {
    Shared,
    Smooth { weight: f64, reference: f64 },
}

struct JointProblem<'a> {
    model: &'a SpectroscopicModel,
    data: &'a FitData,
    scaling: Scaling,
}

impl JointProblem<'_> {
    fn n_time(&self) -> usize {
        self.data.n_time()
    }

    /// Parameter index of the scaling factor used at time step `i`.
    fn c_index(&self, i: usize) -> usize {
        match self.scaling {
            Scaling::Shared => self.n_time(),
            Scaling::Smooth { .. } => self.n_time() + i,
        }
    }

    fn n_rows(&self) -> usize {
        let data_rows = self.n_time() * self.data.n_wavelengths();
        match self.scaling {
            Scaling::Shared => data_rows,
            Scaling::Smooth { .. } => data_rows + self.n_time().saturating_sub(1),
        }
    }
}

impl LeastSquaresProblem for JointProblem<'_> {
    fn n_params(&self) -> usize {
        match self.scaling {
            Scaling::Shared => self.n_time() + 1,
            Scaling::Smooth { .. } => 2 * self.n_time(),
        }
    }

    fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
        let n = self.n_time();
        let n_wl = self.data.n_wavelengths();
        let mut r = DVector::zeros(self.n_rows());
        for i in 0..n {
            let (t, c) = (p[i], p[self.c_index(i)]);
            for (k, &l) in self.data.wavelengths.iter().enumerate() {
                r[i * n_wl + k] =
                    (c * self.model.spectral_emission(l, t) - self.data.mean[[i, k]]) / self.data.sigma[[i, k]];
            }
        }
        if let Scaling::Smooth { weight, reference } = self.scaling {
            for i in 0..n.saturating_sub(1) {
                r[n * n_wl + i] = weight * (p[n + i + 1] - p[n + i]) / reference;
            }
        }
        r
    }

    fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
        let n = self.n_time();
        let n_wl = self.data.n_wavelengths();
        let mut jac = DMatrix::zeros(self.n_rows(), self.n_params());
        for i in 0..n {
            let ci = self.c_index(i);
            let (t, c) = (p[i], p[ci]);
            for (k, &l) in self.data.wavelengths.iter().enumerate() {
                let row = i * n_wl + k;
                let s = self.data.sigma[[i, k]];
                jac[(row, i)] = c * self.model.spectral_emission_dt(l, t) / s;
                jac[(row, ci)] = self.model.spectral_emission(l, t) / s;
            }
        }
        if let Scaling::Smooth { weight, reference } = self.scaling {
            for i in 0..n.saturating_sub(1) {
                let row = n * n_wl + i;
                jac[(row, n + i)] = -weight / reference;
                jac[(row, n + i + 1)] = weight / reference;
            }
        }
        jac
    }
}

pub(crate) fn fit_const_mass(model: &SpectroscopicModel, data: &FitData) -> Result<FitOutcome, AppError> {
    let guesses = initial_guesses(model, data);
    let c0 = mean(guesses.iter().map(|g| g.1));
    let problem = JointProblem {
        model,
        data,
        scaling: Scaling::Shared,
    };
    let mut x0: Vec<f64> = guesses.iter().map(|g| g.0).collect();
    x0.push(c0);
    let report = solve(&problem, x0)?;
    Ok(outcome(&problem, report))
}

pub(crate) fn fit_smooth_prior(
    model: &SpectroscopicModel,
    data: &FitData,
    weight: f64,
) -> Result<FitOutcome, AppError> {
    if !(weight.is_finite() && weight >= 0.0) {
        return Err(AppError::config(format!("Prior weight must be non-negative, got {weight}.")));
    }
    let guesses = initial_guesses(model, data);
    let reference = mean(guesses.iter().map(|g| g.1));
    let problem = JointProblem {
        model,
        data,
        scaling: Scaling::Smooth { weight, reference },
    };
    let x0: Vec<f64> = guesses
        .iter()
        .map(|g| g.0)
        .chain(guesses.iter().map(|g| g.1))
        .collect();
    let report = solve(&problem, x0)?;
    Ok(outcome(&problem, report))
}

fn initial_guesses(model: &SpectroscopicModel, data: &FitData) -> Vec<(f64, f64)> {
    (0..data.n_time()).map(|i| data.initial_guess(model, i)).collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 1.0 } else { sum / count as f64 }
}

fn solve(problem: &JointProblem<'_>, x0: Vec<f64>) -> Result<LmReport, AppError> {
    let n = problem.n_time();
    let n_params = problem.n_params();
    let mut lower = DVector::from_element(n_params, 0.0);
    let mut upper = DVector::from_element(n_params, f64::INFINITY);
    for i in 0..n {
        lower[i] = T_MIN;
        upper[i] = T_MAX;
    }
    let bounds = Bounds { lower, upper };
    let report = levenberg_marquardt(problem, DVector::from_vec(x0), Some(&bounds), &lm_options())?;
    debug!(
        params = n_params,
        iterations = report.iterations,
        cost = report.cost,
        converged = report.converged,
        "simultaneous spectral fit finished"
    );
    Ok(report)
}

fn outcome(problem: &JointProblem<'_>, report: LmReport) -> FitOutcome {
    let n = problem.n_time();
    let data = problem.data;
    let se = report
        .standard_errors(data.measured)
        .unwrap_or_else(|| DVector::from_element(report.params.len(), f64::NAN));
    let p = &report.params;

    let mut residuals = Array2::<f64>::zeros((n, data.n_wavelengths()));
    for i in 0..n {
        let (t, c) = (p[i], p[problem.c_index(i)]);
        for (k, &l) in data.wavelengths.iter().enumerate() {
            residuals[[i, k]] = data.mean[[i, k]] - c * problem.model.spectral_emission(l, t);
        }
    }

    FitOutcome {
        temperature: (0..n).map(|i| p[i]).collect::<Array1<f64>>(),
        scaling: (0..n).map(|i| p[problem.c_index(i)]).collect(),
        temperature_std: (0..n).map(|i| se[i]).collect(),
        scaling_std: (0..n).map(|i| se[problem.c_index(i)]).collect(),
        residuals,
        iterations: report.iterations,
        converged: report.converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SyntheticConfig, synthesize};
    use crate::domain::{BlackbodyLaw, PyrometryKind, SignalTensor, TemperatureTrajectory};
    use crate::fit::sequential;
    use crate::math::stats::std_dev;
    use crate::models::SpectroscopicOptions;
    use crate::props::{GasKind, MaterialKind, MaterialProperties};
    use approx::assert_relative_eq;
    use ndarray::array;

    fn model() -> SpectroscopicModel {
        let opts = SpectroscopicOptions {
            wavelengths: vec![500.0, 600.0, 700.0, 800.0],
            pyrometry: PyrometryKind::SpectralFit,
            law: BlackbodyLaw::Planck,
            ..SpectroscopicOptions::default()
        };
        SpectroscopicModel::new(MaterialProperties::build(MaterialKind::Soot, GasKind::Argon), opts).unwrap()
    }

    fn scaled(m: &SpectroscopicModel, truth: &Array2<f64>, c: f64) -> SignalTensor {
        let signal = m.forward(truth);
        SignalTensor {
            wavelengths: signal.wavelengths.clone(),
            data: signal.data * c,
        }
    }

    #[test]
    fn const_mass_recovers_shared_scaling() {
        let m = model();
        let truth = array![[3300.0], [3000.0], [2700.0], [2500.0], [2300.0]];
        let data = FitData::from_signal(&scaled(&m, &truth, 5e-4));
        let out = fit_const_mass(&m, &data).unwrap();
        for i in 0..5 {
            assert_relative_eq!(out.temperature[i], truth[[i, 0]], max_relative = 1e-6);
            assert_relative_eq!(out.scaling[i], 5e-4, max_relative = 1e-5);
        }
        // One shared factor.
        assert!(out.scaling.iter().all(|&c| c == out.scaling[0]));
    }

    #[test]
    fn smooth_prior_is_exact_for_constant_scaling() {
        let m = model();
        let truth = array![[3300.0], [3000.0], [2700.0], [2500.0]];
        let data = FitData::from_signal(&scaled(&m, &truth, 2e-3));
        let out = fit_smooth_prior(&m, &data, 1.0).unwrap();
        for i in 0..4 {
            assert_relative_eq!(out.temperature[i], truth[[i, 0]], max_relative = 1e-6);
            assert_relative_eq!(out.scaling[i], 2e-3, max_relative = 1e-5);
        }
    }

    #[test]
    fn strong_prior_flattens_the_scaling_trajectory() {
        let m = model();
        let temps: Vec<f64> = (0..12).map(|i| 3300.0 - 60.0 * i as f64).collect();
        let traj = TemperatureTrajectory::single((0..12).map(|i| i as f64 * 10.0).collect(), temps, None, None);
        let cfg = SyntheticConfig {
            shots: 10,
            noise: 0.05,
            scaling: 1e-3,
            ..SyntheticConfig::default()
        };
        let synth = synthesize(&m, &traj, &cfg).unwrap();
        let data = FitData::from_signal(&synth.signal);

        let free = sequential::fit(&m, &data).unwrap();
        let smooth = fit_smooth_prior(&m, &data, 1e3).unwrap();
        let spread = |c: &Array1<f64>| std_dev(&c.to_vec()) / (c.sum() / c.len() as f64);
        assert!(spread(&smooth.scaling) < spread(&free.scaling));
    }

    #[test]
    fn negative_prior_weight_is_rejected() {
        let m = model();
        let data = FitData::from_signal(&m.forward(&array![[3000.0], [2900.0]]));
        assert!(matches!(fit_smooth_prior(&m, &data, -1.0), Err(AppError::Config(_))));
    }
}
