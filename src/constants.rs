//! # Physical Constants
//!
//! SI values (CODATA 2018, exact where the SI defines them). These are the only
//! quantities a `MaterialProperties` override can never touch.

use std::f64::consts::PI;

/// Planck constant (J·s)
pub const H: f64 = 6.626_070_15e-34;

/// Speed of light (m/s)
pub const C: f64 = 299_792_458.0;

/// Boltzmann constant (J/K)
pub const KB: f64 = 1.380_649e-23;

/// Avogadro number (1/mol)
pub const NA: f64 = 6.022_140_76e23;

/// Universal gas constant (J/(mol·K))
pub const R: f64 = KB * NA;

/// Second radiation constant `h·c/kb` (m·K).
pub const PHI: f64 = H * C / KB;

/// Prefactor of the Rayleigh-regime radiative loss, `199 π³ kb⁵ / (h (h c)³)`.
pub const RADIATION_PREFACTOR: f64 =
    199.0 * PI * PI * PI * KB * KB * KB * KB * KB / (H * (H * C) * (H * C) * (H * C));

/// Names reserved for the constants above.
pub const RESERVED_NAMES: [&str; 5] = ["h", "c", "kb", "R", "NA"];

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn second_radiation_constant() {
        assert_relative_eq!(PHI, 0.014_387_768_775, max_relative = 1e-10);
    }

    #[test]
    fn gas_constant_from_kb_na() {
        assert_relative_eq!(R, 8.314_462_618, max_relative = 1e-9);
    }
}
