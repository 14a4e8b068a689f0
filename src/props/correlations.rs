//! Named property correlations.
//!
//! Each function is a pure evaluation at a given state; `MaterialProperties`
//! picks which one is active per property family and supplies the coefficients.
//!
//! Units: temperatures in K, diameters in m, pressures in Pa, latent heats in
//! J/mol, molar masses in kg/mol, surface tension in N/m, wavelengths in nm.

use nalgebra::Complex;

use crate::constants::{C, R};
use crate::math::planck::NM;

/// Watson correlation for the latent heat of vaporization.
///
/// `hv(T) = hvb · ((1 - T/Tc) / (1 - Tb/Tc))^n`; zero at and above the critical point.
pub fn watson(t: f64, hvb: f64, tb: f64, tc: f64, n: f64) -> f64 {
    if t >= tc {
        return 0.0;
    }
    hvb * ((1.0 - t / tc) / (1.0 - tb / tc)).powf(n)
}

/// Clausius–Clapeyron vapor pressure referenced to `(t_ref, p_ref)`.
///
/// `pv = p_ref · exp(-hv/R · (1/T - 1/T_ref))`
pub fn clausius_clapeyron(t: f64, p_ref: f64, t_ref: f64, hv: f64) -> f64 {
    p_ref * (-hv / R * (1.0 / t - 1.0 / t_ref)).exp()
}

/// Antoine equation, `log10(pv / Pa) = a - b / (T + c)`.
pub fn antoine(t: f64, a: f64, b: f64, c: f64) -> f64 {
    10f64.powf(a - b / (t + c))
}

/// Kelvin enhancement of the flat-surface vapor pressure over a droplet of diameter `dp`.
///
/// `pv · exp(4 γ M / (dp ρ R T))`
pub fn kelvin(pv: f64, t: f64, dp: f64, gamma: f64, molar_mass: f64, rho: f64) -> f64 {
    pv * (4.0 * gamma * molar_mass / (dp * rho * R * t)).exp()
}

/// Tolman size correction of surface tension, `γ / (1 + 4δ/dp)`.
pub fn tolman(gamma: f64, dp: f64, delta: f64) -> f64 {
    gamma / (1.0 + 4.0 * delta / dp)
}

/// Drude free-electron permittivity at `lambda_nm`.
///
/// `ε(ω) = 1 - ωp² / (ω² + i γ ω)` with `ω = 2πc/λ` (rad/s).
pub fn drude(lambda_nm: f64, omega_p: f64, damping: f64) -> Complex<f64> {
    let omega = 2.0 * std::f64::consts::PI * C / (lambda_nm * NM);
    let denom = Complex::new(omega * omega, damping * omega);
    Complex::new(1.0, 0.0) - Complex::new(omega_p * omega_p, 0.0) / denom
}

/// Rayleigh absorption function `E(m) = Im((m² - 1)/(m² + 2))` from `ε = m²`.
pub fn em_from_permittivity(eps: Complex<f64>) -> f64 {
    let one = Complex::new(1.0, 0.0);
    let two = Complex::new(2.0, 0.0);
    ((eps - one) / (eps + two)).im
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn watson_is_reference_value_at_boiling_point() {
        assert_relative_eq!(watson(3134.0, 3.49e5, 3134.0, 9250.0, 0.38), 3.49e5);
        assert_eq!(watson(9300.0, 3.49e5, 3134.0, 9250.0, 0.38), 0.0);
        assert!(watson(4000.0, 3.49e5, 3134.0, 9250.0, 0.38) < 3.49e5);
    }

    #[test]
    fn clausius_clapeyron_passes_through_reference() {
        assert_relative_eq!(clausius_clapeyron(3134.0, 101_325.0, 3134.0, 3.49e5), 101_325.0);
        let hot = clausius_clapeyron(3500.0, 101_325.0, 3134.0, 3.49e5);
        let cold = clausius_clapeyron(2500.0, 101_325.0, 3134.0, 3.49e5);
        assert!(hot > 101_325.0 && cold < 101_325.0);
    }

    #[test]
    fn antoine_log_form() {
        assert_relative_eq!(antoine(100.0, 5.0, 0.0, 0.0), 1e5);
        assert_relative_eq!(antoine(300.0, 10.0, 3000.0, -100.0), 10f64.powf(-5.0));
    }

    #[test]
    fn kelvin_enhances_small_particles_more() {
        let pv = 1000.0;
        let small = kelvin(pv, 3000.0, 5e-9, 1.8, 0.0558, 7000.0);
        let large = kelvin(pv, 3000.0, 50e-9, 1.8, 0.0558, 7000.0);
        assert!(small > large && large > pv);
    }

    #[test]
    fn tolman_reduces_surface_tension() {
        assert_relative_eq!(tolman(1.8, 10e-9, 0.0), 1.8);
        assert_relative_eq!(tolman(1.8, 10e-9, 2.5e-9), 0.9);
    }

    #[test]
    fn drude_without_free_electrons_is_vacuum() {
        let eps = drude(650.0, 0.0, 1e15);
        assert_relative_eq!(eps.re, 1.0);
        assert_relative_eq!(eps.im, 0.0);
        assert_relative_eq!(em_from_permittivity(eps), 0.0);
    }

    #[test]
    fn drude_metal_absorbs() {
        let em = em_from_permittivity(drude(650.0, 3.0e15, 5.0e15));
        assert!(em > 0.1 && em < 0.3, "E(m) = {em}");
    }
}
