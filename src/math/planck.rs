//! Blackbody spectral radiance in wavelength form.
//!
//! - Planck: `B(λ, T) = 2 h c² / λ⁵ / (exp(x) - 1)`
//! - Wien:   `B(λ, T) = 2 h c² / λ⁵ · exp(-x)`
//!
//! with `x = h c / (λ kb T)`. Wavelengths are passed in nanometres.
//!
//! Numerical notes:
//! - `exp(x) - 1` loses precision for small `x` (long wavelength / hot); we use
//!   `expm1` there.
//! - The temperature derivative is written as `x / (1 - exp(-x))` so it stays
//!   finite for large `x` instead of forming `inf / inf`.

use crate::constants::{C, H, PHI};
use crate::domain::BlackbodyLaw;

/// Nanometres to metres.
pub const NM: f64 = 1e-9;

/// Spectral radiance (W·sr⁻¹·m⁻³) at `lambda_nm` and temperature `t` (K).
pub fn blackbody(lambda_nm: f64, t: f64, law: BlackbodyLaw) -> f64 {
    let l = lambda_nm * NM;
    let x = PHI / (l * t);
    let prefactor = 2.0 * H * C * C / l.powi(5);
    match law {
        BlackbodyLaw::Planck => prefactor / x.exp_m1(),
        BlackbodyLaw::Wien => prefactor * (-x).exp(),
    }
}

/// `∂B/∂T` for the same law.
pub fn blackbody_dt(lambda_nm: f64, t: f64, law: BlackbodyLaw) -> f64 {
    let l = lambda_nm * NM;
    let x = PHI / (l * t);
    let b = blackbody(lambda_nm, t, law);
    match law {
        // B · x·eˣ/(eˣ-1) / T  ==  B · x/(1-e⁻ˣ) / T
        BlackbodyLaw::Planck => b * x / (-(-x).exp_m1()) / t,
        BlackbodyLaw::Wien => b * x / t,
    }
}
