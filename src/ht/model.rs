//! Heat-transfer model: integrates `[T, m/m0, X]` over a pulse-centred time grid.
//!
//! Two entry points share one integration path:
//!
//! - `solve()` uses the stored property values as-is
//! - `evaluate(x)` applies `x` to the configured free parameters on an owned
//!   copy of the property store first (the path used by optimization and
//!   sensitivity loops)
//!
//! `solve_batch` integrates one trajectory per initial diameter and stacks
//! them along the shot axis.

use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::TemperatureTrajectory;
use crate::error::AppError;
use crate::ht::submodels::EnergyBalance;
use crate::math::ode::{OdeOptions, OdeSolution, integrate};
use crate::math::planck::NM;
use crate::props::MaterialProperties;

/// Active submodels and integrator tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtOptions {
    /// Free-molecular conduction to the gas. Default: on.
    pub conduction: bool,
    /// Evaporation / sublimation mass and heat loss. Default: on.
    pub evaporation: bool,
    /// Laser absorption during the pulse. Default: on.
    pub absorption: bool,
    /// Thermal radiation. Default: off (negligible next to conduction at 1 atm).
    pub radiation: bool,
    /// Annealed-fraction state. Default: off.
    pub annealing: bool,
    /// Temperature-dependent heat capacity. When off, `cp` is frozen at `Tg`. Default: on.
    pub sensible: bool,
    /// Relative tolerance. Default: 1e-6.
    pub rtol: f64,
    /// Absolute tolerance. Default: 1e-8.
    pub atol: f64,
    /// Integrator step budget. Default: 200 000.
    pub max_steps: usize,
    /// Initial temperature (K). Defaults to `Tg` with absorption, `Ti` without.
    pub initial_temperature: Option<f64>,
}

impl Default for HtOptions {
    fn default() -> Self {
        Self {
            conduction: true,
            evaporation: true,
            absorption: true,
            radiation: false,
            annealing: false,
            sensible: true,
            rtol: 1e-6,
            atol: 1e-8,
            max_steps: 200_000,
            initial_temperature: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeatTransferModel {
    props: MaterialProperties,
    free_params: Vec<String>,
    time: Vec<f64>,
    opts: HtOptions,
}

impl HeatTransferModel {
    /// Build a model. Every free-parameter name must exist in `props`.
    pub fn new(
        props: MaterialProperties,
        free_params: Vec<String>,
        time: Vec<f64>,
        opts: HtOptions,
    ) -> Result<Self, AppError> {
        if let Some(bad) = free_params.iter().find(|n| !props.contains(n)) {
            return Err(AppError::config(format!(
                "Free parameter '{bad}' is not a property of {}.",
                props.material.display_name()
            )));
        }
        if time.len() < 2 {
            return Err(AppError::config("Time grid needs at least 2 points."));
        }
        if time.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AppError::config("Time grid must be strictly increasing."));
        }
        Ok(Self {
            props,
            free_params,
            time,
            opts,
        })
    }

    pub fn props(&self) -> &MaterialProperties {
        &self.props
    }

    pub fn free_params(&self) -> &[String] {
        &self.free_params
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn options(&self) -> &HtOptions {
        &self.opts
    }

    /// Stored values of the free parameters, in order.
    pub fn defaults(&self) -> Vec<f64> {
        self.free_params
            .iter()
            .map(|n| self.props.get(n).unwrap_or(f64::NAN))
            .collect()
    }

    /// Integrate with the stored property values.
    pub fn solve(&self) -> Result<TemperatureTrajectory, AppError> {
        self.run(&self.props)
    }

    /// Integrate with `x` applied to the free parameters.
    ///
    /// A length mismatch is logged and the stored defaults are used instead.
    pub fn evaluate(&self, x: &[f64]) -> Result<TemperatureTrajectory, AppError> {
        if x.len() != self.free_params.len() {
            warn!(
                expected = self.free_params.len(),
                got = x.len(),
                "parameter vector length mismatch; using stored defaults"
            );
            return self.solve();
        }
        let props = self.props.with_overrides(&self.free_params, x)?;
        self.run(&props)
    }

    /// One trajectory per initial diameter (nm), stacked along the shot axis.
    pub fn solve_batch(&self, diameters: &[f64]) -> Result<TemperatureTrajectory, AppError> {
        if diameters.is_empty() {
            return Err(AppError::config("Batch solve needs at least one diameter."));
        }
        let parts = diameters
            .par_iter()
            .map(|&dp| {
                let mut props = self.props.clone();
                props.set("dp0", dp)?;
                self.run(&props)
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        TemperatureTrajectory::stack(&parts)
    }

    fn run(&self, props: &MaterialProperties) -> Result<TemperatureTrajectory, AppError> {
        let opts = &self.opts;
        let t0 = opts.initial_temperature.unwrap_or(if opts.absorption {
            props.gas_props.tg
        } else {
            props.particle.ti
        });
        if !(t0 > 0.0 && t0.is_finite()) {
            return Err(AppError::config(format!("Initial temperature must be positive, got {t0}.")));
        }
        let dp0 = props.particle.dp0 * NM;
        if !(dp0 > 0.0) {
            return Err(AppError::config("Initial diameter must be positive."));
        }
        let m0 = props.particle_mass(dp0, t0);
        let balance = EnergyBalance::new(props, opts, m0);

        let ode_opts = OdeOptions {
            rtol: opts.rtol,
            atol: opts.atol,
            // Keep the step below the pulse width so the pulse cannot be stepped over.
            max_step: if opts.absorption {
                props.laser.tlp / 4.0
            } else {
                f64::INFINITY
            },
            max_steps: opts.max_steps,
        };

        let outcome = integrate(
            |t, y: &Vector3<f64>| balance.derivatives(t, y),
            &self.time,
            Vector3::new(t0, 1.0, 0.0),
            &ode_opts,
            |y| (y[0] <= 0.0).then(|| format!("non-physical temperature {:.3} K", y[0])),
        );

        match outcome {
            Ok(sol) => {
                debug!(
                    accepted = sol.stats.accepted,
                    rejected = sol.stats.rejected,
                    evaluations = sol.stats.evaluations,
                    "heat-transfer integration finished"
                );
                Ok(self.trajectory(sol))
            }
            Err(failure) => {
                warn!(reason = %failure.reason, points = failure.partial.t.len(), "heat-transfer integration failed");
                Err(AppError::Integration {
                    message: failure.reason.clone(),
                    partial: Box::new(self.trajectory(failure.partial)),
                })
            }
        }
    }

    fn trajectory(&self, sol: OdeSolution<3>) -> TemperatureTrajectory {
        let temperature = sol.y.iter().map(|y| y[0]).collect();
        let mass = self
            .opts
            .evaporation
            .then(|| sol.y.iter().map(|y| y[1]).collect());
        let annealed = self
            .opts
            .annealing
            .then(|| sol.y.iter().map(|y| y[2]).collect());
        TemperatureTrajectory::single(sol.t, temperature, mass, annealed)
    }
}
