//! Built-in material and gas definitions.
//!
//! Values are literature-typical for TiRe-LII work:
//!
//! - soot: Liu et al. heat capacity polynomial, C₃ sublimation, constant E(m)
//! - iron: liquid-iron density/heat capacity, Watson latent heat, Kelvin
//!   correction, Drude absorption
//! - silicon: Antoine vapor pressure, Tolman-corrected surface tension

use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::props::store::{
    AbsorptionModel, DensityModel, GasProps, HeatCapacityModel, LaserProps, LatentHeatModel,
    MaterialProperties, MolarMassModel, ParticleProps, PropertyOptions, SurfaceModel,
    VaporPressureModel,
};

/// Atomic mass unit (kg).
const AMU: f64 = 1.660_539_066_60e-27;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Soot,
    Iron,
    Silicon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GasKind {
    Argon,
    Nitrogen,
    Helium,
}

impl MaterialKind {
    pub fn display_name(self) -> &'static str {
        match self {
            MaterialKind::Soot => "soot",
            MaterialKind::Iron => "iron",
            MaterialKind::Silicon => "silicon",
        }
    }
}

impl GasKind {
    pub fn display_name(self) -> &'static str {
        match self {
            GasKind::Argon => "argon",
            GasKind::Nitrogen => "nitrogen",
            GasKind::Helium => "helium",
        }
    }
}

impl FromStr for MaterialKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "soot" | "carbon" => Ok(MaterialKind::Soot),
            "iron" | "fe" => Ok(MaterialKind::Iron),
            "silicon" | "si" => Ok(MaterialKind::Silicon),
            other => Err(AppError::config(format!("Unknown material '{other}'."))),
        }
    }
}

impl FromStr for GasKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "argon" | "ar" => Ok(GasKind::Argon),
            "nitrogen" | "n2" => Ok(GasKind::Nitrogen),
            "helium" | "he" => Ok(GasKind::Helium),
            other => Err(AppError::config(format!("Unknown gas '{other}'."))),
        }
    }
}

impl MaterialProperties {
    /// Property store for `material` suspended in `gas`.
    pub fn build(material: MaterialKind, gas: GasKind) -> Self {
        let (opts, particle, tg) = match material {
            MaterialKind::Soot => soot(),
            MaterialKind::Iron => iron(),
            MaterialKind::Silicon => silicon(),
        };
        let mut gas_props = gas_props(gas);
        gas_props.tg = tg;
        let laser = LaserProps {
            f0: 0.15,
            tlp: 7.0,
            llaser: 1064.0,
        };
        Self::assemble(material, gas, opts, particle, gas_props, laser)
    }

    /// Build from a sequence of names: one material and at most one gas
    /// (argon when omitted), in any order.
    pub fn from_names(names: &[&str]) -> Result<Self, AppError> {
        let mut material = None;
        let mut gas = None;
        for name in names {
            if let Ok(m) = name.parse::<MaterialKind>() {
                if material.replace(m).is_some() {
                    return Err(AppError::config("More than one particle material given."));
                }
            } else if let Ok(g) = name.parse::<GasKind>() {
                if gas.replace(g).is_some() {
                    return Err(AppError::config("More than one gas given."));
                }
            } else {
                return Err(AppError::config(format!("Unknown material or gas '{name}'.")));
            }
        }
        let material = material.ok_or_else(|| AppError::config("No particle material given."))?;
        Ok(Self::build(material, gas.unwrap_or(GasKind::Argon)))
    }
}

fn gas_props(gas: GasKind) -> GasProps {
    let (mass_amu, gamma_g) = match gas {
        GasKind::Argon => (39.948, 5.0 / 3.0),
        GasKind::Nitrogen => (28.014, 1.4),
        GasKind::Helium => (4.0026, 5.0 / 3.0),
    };
    GasProps {
        tg: 1500.0,
        pg: 101_325.0,
        mg: mass_amu * AMU,
        gamma_g,
    }
}

fn soot() -> (PropertyOptions, ParticleProps, f64) {
    let opts = PropertyOptions {
        density: DensityModel::Constant,
        heat_capacity: HeatCapacityModel::Polynomial,
        vapor_pressure: VaporPressureModel::ClausiusClapeyron,
        latent_heat: LatentHeatModel::Constant,
        surface: SurfaceModel::None,
        absorption: AbsorptionModel::Constant,
        molar_mass: MolarMassModel::Constant,
    };
    let particle = ParticleProps {
        dp0: 30.0,
        ti: 3000.0,
        rho0: 1860.0,
        drho: 0.0,
        cp0: 1878.0,
        cp1: 1.082,
        cp2: -1.5149e8,
        mv0: 0.036,
        dmv: 0.0,
        hvb: 7.9e5,
        tb: 4136.0,
        tc: 6810.0,
        n_watson: 0.38,
        pref: 101_325.0,
        antoine_a: 0.0,
        antoine_b: 0.0,
        antoine_c: 0.0,
        gamma0: 0.0,
        dgamma: 0.0,
        delta: 0.0,
        alpha: 0.37,
        beta: 0.77,
        em: 0.35,
        omega_p: 0.0,
        drude_gamma: 0.0,
        aa: 1e18,
        ea: 6.9e5,
    };
    (opts, particle, 1800.0)
}

fn iron() -> (PropertyOptions, ParticleProps, f64) {
    let opts = PropertyOptions {
        density: DensityModel::Linear,
        heat_capacity: HeatCapacityModel::Constant,
        vapor_pressure: VaporPressureModel::ClausiusClapeyron,
        latent_heat: LatentHeatModel::Watson,
        surface: SurfaceModel::Kelvin,
        absorption: AbsorptionModel::Drude,
        molar_mass: MolarMassModel::Constant,
    };
    let particle = ParticleProps {
        dp0: 50.0,
        ti: 2500.0,
        rho0: 8171.0,
        drho: -0.64985,
        cp0: 835.0,
        cp1: 0.0,
        cp2: 0.0,
        mv0: 0.055_845,
        dmv: 0.0,
        hvb: 3.49e5,
        tb: 3134.0,
        tc: 9250.0,
        n_watson: 0.38,
        pref: 101_325.0,
        antoine_a: 0.0,
        antoine_b: 0.0,
        antoine_c: 0.0,
        gamma0: 2.4989,
        dgamma: -3.5e-4,
        delta: 0.0,
        alpha: 0.1,
        beta: 1.0,
        em: 0.0,
        omega_p: 3.0e15,
        drude_gamma: 5.0e15,
        aa: 0.0,
        ea: 0.0,
    };
    (opts, particle, 1500.0)
}

fn silicon() -> (PropertyOptions, ParticleProps, f64) {
    let opts = PropertyOptions {
        density: DensityModel::Linear,
        heat_capacity: HeatCapacityModel::Constant,
        vapor_pressure: VaporPressureModel::Antoine,
        latent_heat: LatentHeatModel::Watson,
        surface: SurfaceModel::Tolman,
        absorption: AbsorptionModel::Constant,
        molar_mass: MolarMassModel::Constant,
    };
    let particle = ParticleProps {
        dp0: 20.0,
        ti: 2500.0,
        rho0: 2840.0,
        drho: -0.16,
        cp0: 968.0,
        cp1: 0.0,
        cp2: 0.0,
        mv0: 0.028_085,
        dmv: 0.0,
        hvb: 3.59e5,
        tb: 3538.0,
        tc: 7925.0,
        n_watson: 0.38,
        pref: 101_325.0,
        antoine_a: 10.306,
        antoine_b: 18_753.0,
        antoine_c: 0.0,
        gamma0: 1.253,
        dgamma: -2.3e-4,
        delta: 0.3,
        alpha: 0.3,
        beta: 1.0,
        em: 0.3,
        omega_p: 0.0,
        drude_gamma: 0.0,
        aa: 0.0,
        ea: 0.0,
    };
    (opts, particle, 1500.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn from_names_in_any_order() {
        let a = MaterialProperties::from_names(&["iron", "argon"]).unwrap();
        let b = MaterialProperties::from_names(&["Ar", "Fe"]).unwrap();
        assert_eq!(a, b);
        let c = MaterialProperties::from_names(&["soot"]).unwrap();
        assert_eq!(c.gas, GasKind::Argon);
    }

    #[test]
    fn from_names_rejects_bad_input() {
        assert!(MaterialProperties::from_names(&["argon"]).is_err());
        assert!(MaterialProperties::from_names(&["iron", "soot"]).is_err());
        assert!(MaterialProperties::from_names(&["unobtainium"]).is_err());
    }

    #[test]
    fn silicon_antoine_matches_boiling_point() {
        // The Antoine coefficients are fitted so pv(Tb) ≈ 1 atm.
        let si = MaterialProperties::build(MaterialKind::Silicon, GasKind::Argon);
        let mut flat = si.clone();
        flat.opts.surface = SurfaceModel::None;
        assert_relative_eq!(flat.vapor_pressure(3538.0, 1.0), 101_325.0, max_relative = 0.01);
    }

    #[test]
    fn iron_properties_are_physical_at_peak_temperature() {
        let fe = MaterialProperties::build(MaterialKind::Iron, GasKind::Argon);
        let t = 3000.0;
        assert!(fe.density(t) > 5000.0 && fe.density(t) < 8000.0);
        assert!(fe.latent_heat(t) > fe.particle.hvb);
        let em = fe.em(1064.0, 50.0);
        assert!(em > 0.0 && em < 1.0);
    }

    #[test]
    fn soot_heat_capacity_polynomial() {
        let soot = MaterialProperties::build(MaterialKind::Soot, GasKind::Nitrogen);
        let expected = 1878.0 + 1.082 * 2000.0 - 1.5149e8 / 4.0e6;
        assert_relative_eq!(soot.heat_capacity(2000.0), expected);
        assert_eq!(soot.gas_props.tg, 1800.0);
    }
}
