//! Bounded Levenberg–Marquardt for small dense problems.
//!
//! Each iteration solves the damped Gauss–Newton step
//!
//! ```text
//! minimize ‖J δ + r‖² + λ ‖D δ‖²
//! ```
//!
//! as a stacked linear least-squares problem `[J; √λ D] δ = [-r; 0]` with
//! `D = diag(‖J_j‖)` (Marquardt scaling). Parameters are rescaled by their
//! initial magnitude first, so temperature (~10³ K) and scaling factors of any
//! magnitude share one step. Bounds are enforced by projecting the trial point.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;
use crate::math::ols::{pseudo_inverse, solve_least_squares};

/// A residual model `r(p)` with an analytic Jacobian `∂r/∂p`.
pub trait LeastSquaresProblem {
    fn n_params(&self) -> usize;
    fn residuals(&self, p: &DVector<f64>) -> DVector<f64>;
    fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64>;
}

#[derive(Debug, Clone)]
pub struct LmOptions {
    pub max_iterations: usize,
    /// Relative cost decrease below which an accepted step counts as converged.
    pub ftol: f64,
    /// Relative step size below which an accepted step counts as converged.
    pub xtol: f64,
    pub lambda_init: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-12,
            xtol: 1e-10,
            lambda_init: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
        }
    }
}

/// Box constraints `lower <= p <= upper`.
#[derive(Debug, Clone)]
pub struct Bounds {
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

impl Bounds {
    pub fn project(&self, p: &mut DVector<f64>) {
        for i in 0..p.len() {
            p[i] = p[i].clamp(self.lower[i], self.upper[i]);
        }
    }
}

#[derive(Debug, Clone)]
pub struct LmReport {
    pub params: DVector<f64>,
    pub residuals: DVector<f64>,
    pub jacobian: DMatrix<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl LmReport {
    /// Parameter covariance `s² (JᵀJ)⁺` with `s² = cost / (m - n)`.
    ///
    /// Without redundant residuals (`m <= n`) `s²` is 1 when the residuals are
    /// already divided by measured errors (`unit_weights`), otherwise NaN.
    pub fn covariance(&self, unit_weights: bool) -> Option<DMatrix<f64>> {
        let m = self.residuals.len();
        let n = self.params.len();
        let jtj = self.jacobian.transpose() * &self.jacobian;
        let inv = pseudo_inverse(&jtj)?;
        let s2 = if m > n {
            self.cost / (m - n) as f64
        } else if unit_weights {
            1.0
        } else {
            f64::NAN
        };
        Some(inv * s2)
    }

    /// One-sigma standard errors (square roots of the covariance diagonal).
    pub fn standard_errors(&self, unit_weights: bool) -> Option<DVector<f64>> {
        let cov = self.covariance(unit_weights)?;
        Some(cov.diagonal().map(|v| if v.is_nan() { v } else { v.max(0.0).sqrt() }))
    }
}

/// Minimize `‖r(p)‖²` starting from `x0`.
pub fn levenberg_marquardt<P: LeastSquaresProblem>(
    problem: &P,
    x0: DVector<f64>,
    bounds: Option<&Bounds>,
    opts: &LmOptions,
) -> Result<LmReport, AppError> {
    let n = problem.n_params();
    if x0.len() != n {
        return Err(AppError::config(format!(
            "Initial guess has {} entries, problem expects {n}.",
            x0.len()
        )));
    }

    let mut x = x0;
    if let Some(b) = bounds {
        b.project(&mut x);
    }
    let scale: DVector<f64> = x.map(|v| if v.abs() > 1e-300 { v.abs() } else { 1.0 });

    let mut r = problem.residuals(&x);
    if r.iter().any(|v| !v.is_finite()) {
        return Err(AppError::numerical("Non-finite residuals at the initial guess."));
    }
    let mut cost = r.norm_squared();
    let mut jac = problem.jacobian(&x);
    let mut lambda = opts.lambda_init;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < opts.max_iterations {
        iterations += 1;

        // Work in scaled coordinates: p = scale ∘ u.
        let mut js = jac.clone();
        for (j, mut col) in js.column_iter_mut().enumerate() {
            col *= scale[j];
        }
        let m = js.nrows();
        let d: Vec<f64> = js.column_iter().map(|c| c.norm().max(1e-12)).collect();

        let mut a = DMatrix::<f64>::zeros(m + n, n);
        a.view_mut((0, 0), (m, n)).copy_from(&js);
        let mut b = DVector::<f64>::zeros(m + n);
        b.rows_mut(0, m).copy_from(&(-&r));
        for j in 0..n {
            a[(m + j, j)] = lambda.sqrt() * d[j];
        }

        let Some(du) = solve_least_squares(&a, &b) else {
            lambda *= opts.lambda_up;
            if lambda > 1e16 {
                break;
            }
            continue;
        };

        let mut trial = &x + du.component_mul(&scale);
        if let Some(bd) = bounds {
            bd.project(&mut trial);
        }
        let r_trial = problem.residuals(&trial);
        let cost_trial = r_trial.norm_squared();

        if cost_trial.is_finite() && cost_trial < cost {
            let step = (&trial - &x).component_div(&scale).norm();
            let rel_decrease = (cost - cost_trial) / cost.max(1e-300);
            x = trial;
            r = r_trial;
            cost = cost_trial;
            jac = problem.jacobian(&x);
            lambda = (lambda * opts.lambda_down).max(1e-15);

            let x_norm = x.component_div(&scale).norm();
            if rel_decrease < opts.ftol || step < opts.xtol * (x_norm + opts.xtol) || cost == 0.0 {
                converged = true;
                break;
            }
        } else {
            lambda *= opts.lambda_up;
            if lambda > 1e16 {
                // No downhill step exists at any damping: we are at a (bounded) minimum.
                converged = true;
                break;
            }
        }
    }

    Ok(LmReport {
        params: x,
        residuals: r,
        jacobian: jac,
        cost,
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// y = a · exp(-t / tau), parameters [a, tau].
    struct Decay {
        t: Vec<f64>,
        y: Vec<f64>,
    }

    impl LeastSquaresProblem for Decay {
        fn n_params(&self) -> usize {
            2
        }

        fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
            DVector::from_iterator(
                self.t.len(),
                self.t.iter().zip(&self.y).map(|(&t, &y)| y - p[0] * (-t / p[1]).exp()),
            )
        }

        fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
            let mut j = DMatrix::zeros(self.t.len(), 2);
            for (i, &t) in self.t.iter().enumerate() {
                let e = (-t / p[1]).exp();
                j[(i, 0)] = -e;
                j[(i, 1)] = -p[0] * e * t / (p[1] * p[1]);
            }
            j
        }
    }

    fn decay_problem() -> Decay {
        let t: Vec<f64> = (0..30).map(|i| i as f64 * 10.0).collect();
        let y = t.iter().map(|&t| 2.5 * (-t / 80.0).exp()).collect();
        Decay { t, y }
    }

    #[test]
    fn recovers_exponential_decay() {
        let problem = decay_problem();
        let report = levenberg_marquardt(
            &problem,
            DVector::from_row_slice(&[1.0, 30.0]),
            None,
            &LmOptions::default(),
        )
        .unwrap();
        assert!(report.converged);
        assert_relative_eq!(report.params[0], 2.5, max_relative = 1e-6);
        assert_relative_eq!(report.params[1], 80.0, max_relative = 1e-6);
        assert!(report.cost < 1e-12);
    }

    #[test]
    fn bounds_are_respected() {
        let problem = decay_problem();
        let bounds = Bounds {
            lower: DVector::from_row_slice(&[0.0, 10.0]),
            upper: DVector::from_row_slice(&[2.0, 200.0]),
        };
        let report = levenberg_marquardt(
            &problem,
            DVector::from_row_slice(&[1.0, 30.0]),
            Some(&bounds),
            &LmOptions::default(),
        )
        .unwrap();
        assert!(report.params[0] <= 2.0 + 1e-12);
        assert!(report.params[1] >= 10.0 && report.params[1] <= 200.0);
    }

    #[test]
    fn rejects_wrong_initial_length() {
        let problem = decay_problem();
        let err = levenberg_marquardt(&problem, DVector::from_row_slice(&[1.0]), None, &LmOptions::default());
        assert!(matches!(err, Err(AppError::Config(_))));
    }

    #[test]
    fn exactly_determined_fit_has_no_variance_estimate() {
        let problem = Decay {
            t: vec![0.0, 50.0],
            y: vec![2.5, 2.5 * (-50.0f64 / 80.0).exp()],
        };
        let report = levenberg_marquardt(
            &problem,
            DVector::from_row_slice(&[2.0, 60.0]),
            None,
            &LmOptions::default(),
        )
        .unwrap();
        assert_relative_eq!(report.params[1], 80.0, max_relative = 1e-6);
        assert!(report.standard_errors(false).unwrap().iter().all(|s| s.is_nan()));
        assert!(report.standard_errors(true).unwrap().iter().all(|s| s.is_finite()));
    }
}
