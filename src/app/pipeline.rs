//! Shared simulation/inversion pipeline.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! properties -> time grid -> heat transfer -> synthetic shots -> inversion -> comparison
//!
//! The CLI only decides what to print and export.

use std::path::PathBuf;

use tracing::info;

use crate::data::{SyntheticConfig, synthesize};
use crate::domain::{PyrometryResult, SignalTensor, TemperatureTrajectory};
use crate::error::AppError;
use crate::ht::{HeatTransferModel, HtOptions};
use crate::math::grid::pulse_grid;
use crate::models::{SpectroscopicModel, SpectroscopicOptions};
use crate::props::{GasKind, MaterialKind, MaterialProperties};
use crate::report::{Comparison, compare_temperatures};

/// Pulse-centred time grid settings (ns).
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub pre: f64,
    pub post: f64,
    pub n_pre: usize,
    pub n_post: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            pre: 20.0,
            post: 2000.0,
            n_pre: 40,
            n_post: 200,
        }
    }
}

/// Everything a run needs, resolved from CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub material: MaterialKind,
    pub gas: GasKind,
    /// Named property overrides applied after the material preset.
    pub overrides: Vec<(String, f64)>,
    /// Initial diameters (nm), one shot each.
    pub diameters: Vec<f64>,
    pub grid: GridConfig,
    pub ht: HtOptions,
    pub spectroscopic: SpectroscopicOptions,
    pub synthetic: SyntheticConfig,
    pub rows: usize,
    pub export_trajectory: Option<PathBuf>,
    pub export_result: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            material: MaterialKind::Soot,
            gas: GasKind::Argon,
            overrides: Vec::new(),
            diameters: vec![30.0],
            grid: GridConfig::default(),
            ht: HtOptions::default(),
            spectroscopic: SpectroscopicOptions::default(),
            synthetic: SyntheticConfig::default(),
            rows: 20,
            export_trajectory: None,
            export_result: None,
        }
    }
}

/// Outputs of the heat-transfer stage.
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub props: MaterialProperties,
    pub trajectory: TemperatureTrajectory,
}

/// Outputs of a full simulate-then-invert run.
#[derive(Debug, Clone)]
pub struct InversionOutput {
    pub simulation: SimulationOutput,
    pub model: SpectroscopicModel,
    pub signal: SignalTensor,
    pub result: PyrometryResult,
    pub comparison: Comparison,
}

/// Material preset with the configured overrides applied.
pub fn build_properties(config: &RunConfig) -> Result<MaterialProperties, AppError> {
    let mut props = MaterialProperties::build(config.material, config.gas);
    for (name, value) in &config.overrides {
        props.set(name, *value)?;
    }
    Ok(props)
}

/// Solve the heat-transfer model for every configured diameter.
pub fn run_simulation(config: &RunConfig) -> Result<SimulationOutput, AppError> {
    let props = build_properties(config)?;
    let g = &config.grid;
    let time = pulse_grid(g.pre, g.post, g.n_pre, g.n_post)?;
    info!(
        material = props.material.display_name(),
        gas = props.gas.display_name(),
        points = time.len(),
        shots = config.diameters.len(),
        "solving heat transfer"
    );

    let model = HeatTransferModel::new(props.clone(), Vec::new(), time, config.ht.clone())?;
    let trajectory = model.solve_batch(&config.diameters)?;
    if let Some((time, temp)) = trajectory.peak() {
        info!(peak_temperature = temp, peak_time = time, "heat transfer solved");
    }
    Ok(SimulationOutput { props, trajectory })
}

/// Simulate, synthesize noisy shots, and invert them.
pub fn run_inversion(config: &RunConfig) -> Result<InversionOutput, AppError> {
    let simulation = run_simulation(config)?;
    let model = SpectroscopicModel::new(simulation.props.clone(), config.spectroscopic.clone())?;

    let mut synthetic = config.synthetic.clone();
    if simulation.trajectory.n_shots() > 1 {
        synthetic.shots = simulation.trajectory.n_shots();
    }
    info!(
        shots = synthetic.shots,
        noise = synthetic.noise,
        wavelengths = model.wavelengths().len(),
        "synthesizing signal"
    );
    let signal = synthesize(&model, &simulation.trajectory, &synthetic)?.signal;

    info!(strategy = config.spectroscopic.pyrometry.display_name(), "inverting signal");
    let result = model.inverse(&signal)?;

    let comparison = compare_temperatures(
        &simulation.trajectory.time,
        &simulation.trajectory.mean_temperature(),
        &result.mean_temperature(),
    )?;
    info!(rmse = comparison.rmse, bias = comparison.bias, "inversion finished");

    Ok(InversionOutput {
        simulation,
        model,
        signal,
        result,
        comparison,
    })
}
