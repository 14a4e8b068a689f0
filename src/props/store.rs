//! Strongly typed material property store.
//!
//! `MaterialProperties` is an owned value. Sensitivity and optimization loops
//! override entries on a clone (see `with_overrides`), never on a shared
//! instance, so parameter sweeps cannot leak into each other.
//!
//! Named access goes through a fixed schema (`SCHEMA`). Callers may attach
//! additional named scalars at runtime with `attach`; those live in a separate
//! map and can be used as free parameters like any schema entry. The physical
//! constants in `crate::constants` are not part of the store and cannot be
//! overridden.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::constants::{KB, NA, RESERVED_NAMES};
use crate::error::AppError;
use crate::math::planck::NM;
use crate::props::correlations::{
    antoine, clausius_clapeyron, drude, em_from_permittivity, kelvin, tolman, watson,
};
use crate::props::materials::{GasKind, MaterialKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DensityModel {
    /// `rho0`
    Constant,
    /// `rho0 + drho·T`
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeatCapacityModel {
    /// `cp0`
    Constant,
    /// `cp0 + cp1·T + cp2/T²`
    Polynomial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaporPressureModel {
    /// Referenced to `(Tb, pref)` with the active latent heat.
    ClausiusClapeyron,
    /// `log10(pv) = antoine_a - antoine_b/(T + antoine_c)`
    Antoine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatentHeatModel {
    /// `hvb`
    Constant,
    /// Watson scaling from `(hvb, Tb)` towards `Tc`.
    Watson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceModel {
    /// Flat-surface vapor pressure.
    None,
    /// Kelvin enhancement with bulk surface tension.
    Kelvin,
    /// Kelvin enhancement with Tolman-corrected surface tension.
    Tolman,
}

/// Absorption function `E(m)` correlation.
///
/// Both models are Rayleigh-regime: `E(m)` never depends on particle diameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbsorptionModel {
    /// `Em`, independent of wavelength.
    Constant,
    /// Drude permittivity from `omega_p`, `drude_gamma`.
    Drude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MolarMassModel {
    /// `Mv0`
    Constant,
    /// `Mv0 + dMv·T`
    Linear,
}

/// Active correlation per property family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyOptions {
    pub density: DensityModel,
    pub heat_capacity: HeatCapacityModel,
    pub vapor_pressure: VaporPressureModel,
    pub latent_heat: LatentHeatModel,
    pub surface: SurfaceModel,
    pub absorption: AbsorptionModel,
    pub molar_mass: MolarMassModel,
}

/// Particle material constants and correlation coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleProps {
    /// Initial diameter (nm).
    pub dp0: f64,
    /// Initial temperature used when absorption is disabled (K).
    pub ti: f64,
    pub rho0: f64,
    pub drho: f64,
    pub cp0: f64,
    pub cp1: f64,
    pub cp2: f64,
    /// Vapor molar mass (kg/mol).
    pub mv0: f64,
    pub dmv: f64,
    /// Latent heat at the boiling point (J/mol).
    pub hvb: f64,
    /// Boiling point (K).
    pub tb: f64,
    /// Critical temperature (K).
    pub tc: f64,
    pub n_watson: f64,
    /// Vapor pressure at `tb` (Pa).
    pub pref: f64,
    pub antoine_a: f64,
    pub antoine_b: f64,
    pub antoine_c: f64,
    /// Surface tension `gamma0 + dgamma·T` (N/m).
    pub gamma0: f64,
    pub dgamma: f64,
    /// Tolman length (nm).
    pub delta: f64,
    /// Thermal accommodation coefficient.
    pub alpha: f64,
    /// Evaporation coefficient.
    pub beta: f64,
    /// Constant absorption function.
    pub em: f64,
    /// Drude plasma frequency (rad/s).
    pub omega_p: f64,
    /// Drude damping rate (rad/s).
    pub drude_gamma: f64,
    /// Annealing pre-exponential factor (1/s).
    pub aa: f64,
    /// Annealing activation energy (J/mol).
    pub ea: f64,
}

/// Surrounding gas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasProps {
    /// Temperature (K).
    pub tg: f64,
    /// Pressure (Pa).
    pub pg: f64,
    /// Molecular mass (kg).
    pub mg: f64,
    /// Heat capacity ratio.
    pub gamma_g: f64,
}

/// Laser pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserProps {
    /// Fluence (J/cm²).
    pub f0: f64,
    /// Pulse FWHM (ns).
    pub tlp: f64,
    /// Wavelength (nm).
    pub llaser: f64,
}

/// Schema of overridable names.
pub const SCHEMA: [&str; 35] = [
    "dp0", "Ti", "rho0", "drho", "cp0", "cp1", "cp2", "Mv0", "dMv", "hvb", "Tb", "Tc",
    "n_watson", "pref", "antoine_a", "antoine_b", "antoine_c", "gamma0", "dgamma", "delta",
    "alpha", "beta", "Em", "omega_p", "drude_gamma", "Aa", "Ea", "Tg", "pg", "mg", "gamma_g",
    "F0", "tlp", "llaser", "dp",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperties {
    pub material: MaterialKind,
    pub gas: GasKind,
    pub opts: PropertyOptions,
    pub particle: ParticleProps,
    pub gas_props: GasProps,
    pub laser: LaserProps,
    extra: BTreeMap<String, f64>,
}

impl MaterialProperties {
    pub(crate) fn assemble(
        material: MaterialKind,
        gas: GasKind,
        opts: PropertyOptions,
        particle: ParticleProps,
        gas_props: GasProps,
        laser: LaserProps,
    ) -> Self {
        Self {
            material,
            gas,
            opts,
            particle,
            gas_props,
            laser,
            extra: BTreeMap::new(),
        }
    }

    /// Look up a named scalar (schema entry or attached property).
    pub fn get(&self, name: &str) -> Option<f64> {
        let p = &self.particle;
        let g = &self.gas_props;
        let l = &self.laser;
        let v = match name {
            "dp0" | "dp" => p.dp0,
            "Ti" => p.ti,
            "rho0" => p.rho0,
            "drho" => p.drho,
            "cp0" => p.cp0,
            "cp1" => p.cp1,
            "cp2" => p.cp2,
            "Mv0" => p.mv0,
            "dMv" => p.dmv,
            "hvb" => p.hvb,
            "Tb" => p.tb,
            "Tc" => p.tc,
            "n_watson" => p.n_watson,
            "pref" => p.pref,
            "antoine_a" => p.antoine_a,
            "antoine_b" => p.antoine_b,
            "antoine_c" => p.antoine_c,
            "gamma0" => p.gamma0,
            "dgamma" => p.dgamma,
            "delta" => p.delta,
            "alpha" => p.alpha,
            "beta" => p.beta,
            "Em" => p.em,
            "omega_p" => p.omega_p,
            "drude_gamma" => p.drude_gamma,
            "Aa" => p.aa,
            "Ea" => p.ea,
            "Tg" => g.tg,
            "pg" => g.pg,
            "mg" => g.mg,
            "gamma_g" => g.gamma_g,
            "F0" => l.f0,
            "tlp" => l.tlp,
            "llaser" => l.llaser,
            other => return self.extra.get(other).copied(),
        };
        Some(v)
    }

    /// Override a named scalar. Unknown names and physical constants are configuration errors.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), AppError> {
        if RESERVED_NAMES.contains(&name) {
            return Err(AppError::config(format!("'{name}' is a physical constant and cannot be overridden.")));
        }
        let p = &mut self.particle;
        let g = &mut self.gas_props;
        let l = &mut self.laser;
        let slot = match name {
            "dp0" | "dp" => &mut p.dp0,
            "Ti" => &mut p.ti,
            "rho0" => &mut p.rho0,
            "drho" => &mut p.drho,
            "cp0" => &mut p.cp0,
            "cp1" => &mut p.cp1,
            "cp2" => &mut p.cp2,
            "Mv0" => &mut p.mv0,
            "dMv" => &mut p.dmv,
            "hvb" => &mut p.hvb,
            "Tb" => &mut p.tb,
            "Tc" => &mut p.tc,
            "n_watson" => &mut p.n_watson,
            "pref" => &mut p.pref,
            "antoine_a" => &mut p.antoine_a,
            "antoine_b" => &mut p.antoine_b,
            "antoine_c" => &mut p.antoine_c,
            "gamma0" => &mut p.gamma0,
            "dgamma" => &mut p.dgamma,
            "delta" => &mut p.delta,
            "alpha" => &mut p.alpha,
            "beta" => &mut p.beta,
            "Em" => &mut p.em,
            "omega_p" => &mut p.omega_p,
            "drude_gamma" => &mut p.drude_gamma,
            "Aa" => &mut p.aa,
            "Ea" => &mut p.ea,
            "Tg" => &mut g.tg,
            "pg" => &mut g.pg,
            "mg" => &mut g.mg,
            "gamma_g" => &mut g.gamma_g,
            "F0" => &mut l.f0,
            "tlp" => &mut l.tlp,
            "llaser" => &mut l.llaser,
            other => match self.extra.get_mut(other) {
                Some(v) => v,
                None => return Err(AppError::config(format!("Unknown material property '{other}'."))),
            },
        };
        *slot = value;
        Ok(())
    }

    /// Introduce a new named scalar property.
    pub fn attach(&mut self, name: &str, value: f64) -> Result<(), AppError> {
        if RESERVED_NAMES.contains(&name) || SCHEMA.contains(&name) {
            return Err(AppError::config(format!("'{name}' is already defined; use `set` to override it.")));
        }
        self.extra.insert(name.to_string(), value);
        Ok(())
    }

    /// Whether `name` can be read and overridden.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All valid property names: the schema followed by attached names.
    pub fn names(&self) -> Vec<String> {
        SCHEMA
            .iter()
            .map(|s| s.to_string())
            .chain(self.extra.keys().cloned())
            .collect()
    }

    /// Owned copy with `values[i]` applied to `names[i]`.
    pub fn with_overrides(&self, names: &[String], values: &[f64]) -> Result<Self, AppError> {
        if names.len() != values.len() {
            return Err(AppError::config(format!(
                "{} parameter names but {} values.",
                names.len(),
                values.len()
            )));
        }
        let mut out = self.clone();
        for (name, &v) in names.iter().zip(values) {
            out.set(name, v)?;
        }
        Ok(out)
    }

    // --- Temperature / size dependent properties -------------------------

    /// Particle density (kg/m³).
    pub fn density(&self, t: f64) -> f64 {
        let p = &self.particle;
        match self.opts.density {
            DensityModel::Constant => p.rho0,
            DensityModel::Linear => p.rho0 + p.drho * t,
        }
    }

    /// Specific heat capacity (J/(kg·K)).
    pub fn heat_capacity(&self, t: f64) -> f64 {
        let p = &self.particle;
        match self.opts.heat_capacity {
            HeatCapacityModel::Constant => p.cp0,
            HeatCapacityModel::Polynomial => p.cp0 + p.cp1 * t + p.cp2 / (t * t),
        }
    }

    /// Molar mass of the evaporating species (kg/mol).
    pub fn molar_mass(&self, t: f64) -> f64 {
        let p = &self.particle;
        match self.opts.molar_mass {
            MolarMassModel::Constant => p.mv0,
            MolarMassModel::Linear => p.mv0 + p.dmv * t,
        }
    }

    /// Latent heat of vaporization (J/mol).
    pub fn latent_heat(&self, t: f64) -> f64 {
        let p = &self.particle;
        match self.opts.latent_heat {
            LatentHeatModel::Constant => p.hvb,
            LatentHeatModel::Watson => watson(t, p.hvb, p.tb, p.tc, p.n_watson),
        }
    }

    /// Surface tension (N/m) at diameter `dp` (m).
    pub fn surface_tension(&self, t: f64, dp: f64) -> f64 {
        let p = &self.particle;
        let flat = p.gamma0 + p.dgamma * t;
        match self.opts.surface {
            SurfaceModel::Tolman => tolman(flat, dp, p.delta * NM),
            _ => flat,
        }
    }

    /// Vapor pressure (Pa) over a particle of diameter `dp` (m).
    pub fn vapor_pressure(&self, t: f64, dp: f64) -> f64 {
        let p = &self.particle;
        let flat = match self.opts.vapor_pressure {
            VaporPressureModel::ClausiusClapeyron => clausius_clapeyron(t, p.pref, p.tb, self.latent_heat(t)),
            VaporPressureModel::Antoine => antoine(t, p.antoine_a, p.antoine_b, p.antoine_c),
        };
        match self.opts.surface {
            SurfaceModel::None => flat,
            SurfaceModel::Kelvin | SurfaceModel::Tolman => kelvin(
                flat,
                t,
                dp,
                self.surface_tension(t, dp),
                self.molar_mass(t),
                self.density(t),
            ),
        }
    }

    /// Absorption function `E(m)` at `lambda_nm` for diameter `dp_nm`.
    ///
    /// Rayleigh regime: no size dependence for the built-in models.
    pub fn em(&self, lambda_nm: f64, _dp_nm: f64) -> f64 {
        let p = &self.particle;
        match self.opts.absorption {
            AbsorptionModel::Constant => p.em,
            AbsorptionModel::Drude => em_from_permittivity(drude(lambda_nm, p.omega_p, p.drude_gamma)),
        }
    }

    /// Absorption function ratio `E(m, λ1) / E(m, λ2)`.
    pub fn emr(&self, l1: f64, l2: f64, dp_nm: f64) -> f64 {
        self.em(l1, dp_nm) / self.em(l2, dp_nm)
    }

    /// Mass (kg) of a sphere of diameter `dp` (m).
    pub fn particle_mass(&self, dp: f64, t: f64) -> f64 {
        self.density(t) * PI * dp * dp * dp / 6.0
    }

    /// Diameter (m) of a sphere of mass `mass` (kg).
    pub fn diameter(&self, mass: f64, t: f64) -> f64 {
        (6.0 * mass.max(0.0) / (PI * self.density(t))).cbrt()
    }

    /// Mass of one vapor molecule (kg).
    pub fn vapor_molecule_mass(&self, t: f64) -> f64 {
        self.molar_mass(t) / NA
    }

    /// Mean thermal speed of gas molecules (m/s).
    pub fn gas_speed(&self) -> f64 {
        let g = &self.gas_props;
        (8.0 * KB * g.tg / (PI * g.mg)).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn iron() -> MaterialProperties {
        MaterialProperties::build(MaterialKind::Iron, GasKind::Argon)
    }

    #[test]
    fn get_and_set_schema_entries() {
        let mut props = iron();
        assert!(props.get("alpha").is_some());
        props.set("alpha", 0.25).unwrap();
        assert_eq!(props.get("alpha"), Some(0.25));
        assert_eq!(props.get("dp"), props.get("dp0"));
    }

    #[test]
    fn every_schema_name_is_readable() {
        let props = iron();
        for name in SCHEMA {
            assert!(props.get(name).is_some(), "{name} missing");
        }
    }

    #[test]
    fn unknown_and_reserved_names_are_rejected() {
        let mut props = iron();
        assert!(matches!(props.set("not_a_property", 1.0), Err(AppError::Config(_))));
        assert!(matches!(props.set("kb", 1.0), Err(AppError::Config(_))));
        assert!(props.attach("h", 1.0).is_err());
        assert!(props.attach("alpha", 1.0).is_err());
    }

    #[test]
    fn attached_properties_behave_like_schema_entries() {
        let mut props = iron();
        props.attach("soot_fraction", 0.1).unwrap();
        assert!(props.contains("soot_fraction"));
        props.set("soot_fraction", 0.2).unwrap();
        assert_eq!(props.get("soot_fraction"), Some(0.2));
        assert!(props.names().iter().any(|n| n == "soot_fraction"));
    }

    #[test]
    fn overrides_operate_on_a_copy() {
        let props = iron();
        let before = props.get("alpha").unwrap();
        let changed = props.with_overrides(&["alpha".to_string()], &[0.9]).unwrap();
        assert_eq!(changed.get("alpha"), Some(0.9));
        assert_eq!(props.get("alpha"), Some(before));
    }

    #[test]
    fn absorption_function_is_size_independent() {
        for kind in [MaterialKind::Soot, MaterialKind::Iron, MaterialKind::Silicon] {
            let props = MaterialProperties::build(kind, GasKind::Argon);
            assert_eq!(props.em(650.0, 10.0), props.em(650.0, 100.0));
        }
    }

    #[test]
    fn mass_and_diameter_are_inverse() {
        let props = iron();
        let dp = 40e-9;
        let m = props.particle_mass(dp, 2500.0);
        assert_relative_eq!(props.diameter(m, 2500.0), dp, max_relative = 1e-12);
    }

    #[test]
    fn kelvin_correction_raises_vapor_pressure() {
        let mut props = iron();
        let with = props.vapor_pressure(3000.0, 10e-9);
        props.opts.surface = SurfaceModel::None;
        let without = props.vapor_pressure(3000.0, 10e-9);
        assert!(with > without);
    }

    #[test]
    fn emissivity_ratio_is_one_for_constant_absorption() {
        let props = MaterialProperties::build(MaterialKind::Soot, GasKind::Nitrogen);
        assert_relative_eq!(props.emr(650.0, 750.0, 30.0), 1.0);
    }
}
