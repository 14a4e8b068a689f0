//! Energy and mass balance terms of a single nanoparticle.
//!
//! All rates are SI (W, kg/s, 1/s); the caller converts to the nanosecond
//! time axis. Sign convention: `absorption` is a gain, every other heat term is
//! returned as a positive loss.
//!
//! - absorption of the Gaussian laser pulse (Rayleigh cross-section)
//! - free-molecular conduction to the gas
//! - evaporation / sublimation (Hertz–Knudsen mass flux times latent heat)
//! - thermal radiation (Rayleigh grey-body)
//! - first-order Arrhenius annealing

use std::f64::consts::PI;

use nalgebra::Vector3;

use crate::constants::{KB, R, RADIATION_PREFACTOR};
use crate::ht::model::HtOptions;
use crate::math::planck::NM;
use crate::props::MaterialProperties;

/// Seconds per nanosecond.
pub const NS: f64 = 1e-9;

/// Normalized mass below which a particle counts as fully evaporated.
pub const EVAPORATED: f64 = 1e-6;

/// Evaluates the balance terms for one material / option set.
#[derive(Debug, Clone)]
pub struct EnergyBalance<'a> {
    props: &'a MaterialProperties,
    opts: &'a HtOptions,
    /// Initial particle mass (kg).
    m0: f64,
    /// Heat capacity at the gas temperature, used when sensible heat is frozen.
    cp_frozen: f64,
}

impl<'a> EnergyBalance<'a> {
    pub fn new(props: &'a MaterialProperties, opts: &'a HtOptions, m0: f64) -> Self {
        let cp_frozen = props.heat_capacity(props.gas_props.tg);
        Self {
            props,
            opts,
            m0,
            cp_frozen,
        }
    }

    /// Normalized temporal laser profile (1/s), Gaussian with FWHM `tlp`, centred at `t = 0`.
    pub fn pulse(&self, t_ns: f64) -> f64 {
        let sigma = self.props.laser.tlp / (2.0 * (2.0 * 2f64.ln()).sqrt());
        let g = (-t_ns * t_ns / (2.0 * sigma * sigma)).exp() / (sigma * (2.0 * PI).sqrt());
        g / NS
    }

    /// Absorbed laser power (W).
    pub fn absorption(&self, t_ns: f64, dp: f64) -> f64 {
        let laser = &self.props.laser;
        let lambda = laser.llaser * NM;
        let em = self.props.em(laser.llaser, dp / NM);
        // Fluence is configured in J/cm².
        let fluence = laser.f0 * 1e4;
        PI * PI * dp.powi(3) * em / lambda * fluence * self.pulse(t_ns)
    }

    /// Conductive loss to the gas (W), free-molecular regime.
    pub fn conduction(&self, t: f64, dp: f64) -> f64 {
        let g = &self.props.gas_props;
        let alpha = self.props.particle.alpha;
        let ct = self.props.gas_speed();
        alpha * PI * dp * dp * g.pg * ct / (8.0 * g.tg) * (g.gamma_g + 1.0) / (g.gamma_g - 1.0) * (t - g.tg)
    }

    /// Evaporated mass flow (kg/s).
    pub fn evaporation_rate(&self, t: f64, dp: f64) -> f64 {
        let mv = self.props.vapor_molecule_mass(t);
        let pv = self.props.vapor_pressure(t, dp);
        let beta = self.props.particle.beta;
        beta * PI * dp * dp * mv * pv / (KB * t) * (KB * t / (2.0 * PI * mv)).sqrt()
    }

    /// Evaporative heat loss (W).
    pub fn evaporation(&self, t: f64, dp: f64) -> f64 {
        self.props.latent_heat(t) / self.props.molar_mass(t) * self.evaporation_rate(t, dp)
    }

    /// Radiative loss (W). The absorption function is taken at the laser
    /// wavelength as a grey-body value.
    pub fn radiation(&self, t: f64, dp: f64) -> f64 {
        let tg = self.props.gas_props.tg;
        let em = self.props.em(self.props.laser.llaser, dp / NM);
        RADIATION_PREFACTOR * dp.powi(3) * em * (t.powi(5) - tg.powi(5))
    }

    /// Annealing rate `dX/dt` (1/s).
    pub fn annealing_rate(&self, t: f64, x: f64) -> f64 {
        let p = &self.props.particle;
        (1.0 - x) * p.aa * (-p.ea / (R * t)).exp()
    }

    pub fn heat_capacity(&self, t: f64) -> f64 {
        if self.opts.sensible {
            self.props.heat_capacity(t)
        } else {
            self.cp_frozen
        }
    }

    /// Time derivative of `[T, m/m0, X]` per nanosecond.
    pub fn derivatives(&self, t_ns: f64, y: &Vector3<f64>) -> Vector3<f64> {
        let (temp, mass_frac, annealed) = (y[0], y[1], y[2]);
        if mass_frac < EVAPORATED {
            return Vector3::zeros();
        }
        let mass = mass_frac * self.m0;
        let dp = self.props.diameter(mass, temp);

        let mut q = 0.0;
        let mut dmdt = 0.0;
        if self.opts.absorption {
            q += self.absorption(t_ns, dp);
        }
        if self.opts.conduction {
            q -= self.conduction(temp, dp);
        }
        if self.opts.evaporation {
            q -= self.evaporation(temp, dp);
            dmdt = -self.evaporation_rate(temp, dp);
        }
        if self.opts.radiation {
            q -= self.radiation(temp, dp);
        }
        let dxdt = if self.opts.annealing {
            self.annealing_rate(temp, annealed)
        } else {
            0.0
        };

        let dtdt = q / (mass * self.heat_capacity(temp));
        Vector3::new(dtdt * NS, dmdt / self.m0 * NS, dxdt * NS)
    }
}
