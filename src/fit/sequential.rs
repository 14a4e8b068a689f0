//! Independent `(T, C)` fit per time step.
//!
//! Time steps share nothing, so they are fitted in parallel; results are
//! collected in time order.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use tracing::debug;

use crate::error::AppError;
use crate::fit::{FitData, FitOutcome, T_MAX, T_MIN, lm_options};
use crate::math::lm::{Bounds, LeastSquaresProblem, levenberg_marquardt};
use crate::models::SpectroscopicModel;

/// Weighted residuals `(C·E_k(T) − J_k) / σ_k` at one time step; parameters `[T, C]`.
struct PointProblem<'a> {
    model: &'a SpectroscopicModel,
    wavelengths: &'a [f64],
    obs: Vec<f64>,
    sigma: Vec<f64>,
}

impl LeastSquaresProblem for PointProblem<'_> {
    fn n_params(&self) -> usize {
        2
    }

    fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
        let (t, c) = (p[0], p[1]);
        DVector::from_iterator(
            self.obs.len(),
            self.wavelengths
                .iter()
                .enumerate()
                .map(|(k, &l)| (c * self.model.spectral_emission(l, t) - self.obs[k]) / self.sigma[k]),
        )
    }

    fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
        let (t, c) = (p[0], p[1]);
        let mut jac = DMatrix::zeros(self.obs.len(), 2);
        for (k, &l) in self.wavelengths.iter().enumerate() {
            jac[(k, 0)] = c * self.model.spectral_emission_dt(l, t) / self.sigma[k];
            jac[(k, 1)] = self.model.spectral_emission(l, t) / self.sigma[k];
        }
        jac
    }
}

#[derive(Debug, Clone)]
struct PointFit {
    t: f64,
    c: f64,
    t_std: f64,
    c_std: f64,
    residuals: Vec<f64>,
    iterations: usize,
    converged: bool,
}

fn fit_point(model: &SpectroscopicModel, data: &FitData, i: usize) -> Result<PointFit, AppError> {
    let problem = PointProblem {
        model,
        wavelengths: &data.wavelengths,
        obs: data.mean.row(i).to_vec(),
        sigma: data.sigma.row(i).to_vec(),
    };
    let (t0, c0) = data.initial_guess(model, i);
    let bounds = Bounds {
        lower: DVector::from_row_slice(&[T_MIN, 0.0]),
        upper: DVector::from_row_slice(&[T_MAX, f64::INFINITY]),
    };
    let report = levenberg_marquardt(&problem, DVector::from_row_slice(&[t0, c0]), Some(&bounds), &lm_options())?;

    let se = report
        .standard_errors(data.measured)
        .unwrap_or_else(|| DVector::from_element(2, f64::NAN));
    let (t, c) = (report.params[0], report.params[1]);
    let residuals = data
        .wavelengths
        .iter()
        .enumerate()
        .map(|(k, &l)| problem.obs[k] - c * model.spectral_emission(l, t))
        .collect();
    Ok(PointFit {
        t,
        c,
        t_std: se[0],
        c_std: se[1],
        residuals,
        iterations: report.iterations,
        converged: report.converged,
    })
}

pub(crate) fn fit(model: &SpectroscopicModel, data: &FitData) -> Result<FitOutcome, AppError> {
    let n = data.n_time();
    let points = (0..n)
        .into_par_iter()
        .map(|i| fit_point(model, data, i))
        .collect::<Result<Vec<_>, AppError>>()?;

    let iterations = points.iter().map(|p| p.iterations).sum();
    let converged = points.iter().all(|p| p.converged);
    debug!(time_steps = n, iterations, converged, "sequential spectral fit finished");

    let mut residuals = Array2::<f64>::zeros((n, data.n_wavelengths()));
    for (i, p) in points.iter().enumerate() {
        for (k, r) in p.residuals.iter().enumerate() {
            residuals[[i, k]] = *r;
        }
    }
    Ok(FitOutcome {
        temperature: points.iter().map(|p| p.t).collect::<Array1<f64>>(),
        scaling: points.iter().map(|p| p.c).collect(),
        temperature_std: points.iter().map(|p| p.t_std).collect(),
        scaling_std: points.iter().map(|p| p.c_std).collect(),
        residuals,
        iterations,
        converged,
    })
}
