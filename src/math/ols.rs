//! Linear least squares via SVD.
//!
//! Every damped Gauss–Newton step of the spectral fit is a small linear
//! least-squares problem of the form:
//!
//! ```text
//! minimize ‖A δ - b‖²
//! ```
//!
//! where `A` stacks the weighted Jacobian on top of the damping rows.
//!
//! Implementation choices:
//! - `A` is always tall (more rows than unknowns), so we solve through SVD.
//!   Nalgebra's `QR::solve` is intended for square systems and panics otherwise.
//! - Temperature and scaling columns differ by many orders of magnitude; the
//!   caller scales columns before solving, and we retry with looser singular
//!   value cut-offs when the strict solve is rejected.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}

/// Moore–Penrose pseudo-inverse of a symmetric matrix (e.g. `JᵀJ`).
///
/// Used to turn the normal matrix at the optimum into a parameter covariance.
pub fn pseudo_inverse(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let inv = m.clone().pseudo_inverse(1e-14).ok()?;
    if inv.iter().all(|v| v.is_finite()) {
        Some(inv)
    } else {
        None
    }
}
