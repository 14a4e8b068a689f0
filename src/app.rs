//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - builds a `RunConfig`
//! - runs the simulation/inversion pipeline
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Command, InvertArgs, SimulateArgs};
use crate::data::SyntheticConfig;
use crate::error::AppError;
use crate::ht::HtOptions;
use crate::io::{ResultFile, write_result_json, write_trajectory_csv};
use crate::models::SpectroscopicOptions;

pub mod pipeline;

pub use pipeline::{GridConfig, RunConfig};

/// Entry point for the `lii` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init(cli.log_level);

    match cli.command {
        Command::Simulate(args) => handle_simulate(&args),
        Command::Invert(args) => handle_invert(&args),
    }
}

fn handle_simulate(args: &SimulateArgs) -> Result<(), AppError> {
    let config = simulate_config_from_args(args);
    let out = pipeline::run_simulation(&config)?;

    println!(
        "{}",
        crate::report::format_simulation_summary(
            &out.props,
            &config.ht,
            &out.trajectory,
            &config.diameters,
            config.rows
        )
    );

    if let Some(path) = &config.export_trajectory {
        write_trajectory_csv(path, &out.trajectory)?;
        info!(path = %path.display(), "trajectory exported");
    }
    Ok(())
}

fn handle_invert(args: &InvertArgs) -> Result<(), AppError> {
    let config = invert_config_from_args(args);
    let out = pipeline::run_inversion(&config)?;

    println!(
        "{}",
        crate::report::format_inversion_summary(&out.model, &out.result)
    );
    println!(
        "{}",
        crate::report::format_comparison(&out.comparison, &out.result, config.rows)
    );

    if let Some(path) = &config.export_trajectory {
        write_trajectory_csv(path, &out.simulation.trajectory)?;
        info!(path = %path.display(), "trajectory exported");
    }
    if let Some(path) = &config.export_result {
        let file = ResultFile::new(
            config.material,
            config.gas,
            config.spectroscopic.clone(),
            out.simulation.trajectory.time.clone(),
            Some(out.simulation.trajectory.mean_temperature()),
            out.result,
        );
        write_result_json(path, &file)?;
        info!(path = %path.display(), "result exported");
    }
    Ok(())
}

/// Property overrides from the dedicated flags, then from `--set`.
fn overrides_from_args(args: &SimulateArgs) -> Vec<(String, f64)> {
    let named = [
        ("F0", args.fluence),
        ("tlp", args.pulse_width),
        ("Tg", args.gas_temperature),
        ("pg", args.pressure),
    ];
    named
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
        .chain(args.overrides.iter().cloned())
        .collect()
}

pub fn simulate_config_from_args(args: &SimulateArgs) -> RunConfig {
    RunConfig {
        material: args.material,
        gas: args.gas,
        overrides: overrides_from_args(args),
        diameters: args.diameters.clone(),
        grid: GridConfig {
            pre: args.t_pre,
            post: args.t_post,
            n_pre: args.n_pre,
            n_post: args.n_post,
        },
        ht: HtOptions {
            conduction: !args.no_conduction,
            evaporation: !args.no_evaporation,
            absorption: !args.no_absorption,
            radiation: args.radiation,
            annealing: args.annealing,
            sensible: !args.frozen_cp,
            rtol: args.rtol,
            atol: args.atol,
            ..HtOptions::default()
        },
        rows: args.rows,
        export_trajectory: args.export.clone(),
        ..RunConfig::default()
    }
}

pub fn invert_config_from_args(args: &InvertArgs) -> RunConfig {
    RunConfig {
        spectroscopic: SpectroscopicOptions {
            wavelengths: args.wavelengths.clone(),
            pyrometry: args.pyrometry,
            multicolor: args.multicolor,
            mc_samples: args.mc_samples,
            seed: args.seed,
            law: args.law,
            prior_weight: args.prior_weight,
            const_concentration: args.const_concentration,
            ..SpectroscopicOptions::default()
        },
        synthetic: SyntheticConfig {
            shots: args.shots,
            noise: args.noise,
            scaling: args.scaling,
            jitter: args.jitter,
            seed: args.seed,
        },
        export_result: args.export_json.clone(),
        ..simulate_config_from_args(&args.sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PyrometryKind;
    use crate::props::MaterialKind;

    fn invert_args(argv: &[&str]) -> InvertArgs {
        let mut full = vec!["lii", "invert"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Invert(args) => args,
            Command::Simulate(_) => panic!("expected invert"),
        }
    }

    #[test]
    fn dedicated_flags_become_overrides() {
        let args = invert_args(&["--fluence", "0.2", "--set", "alpha=0.3", "--gas-temperature", "300"]);
        let config = invert_config_from_args(&args);
        assert_eq!(
            config.overrides,
            vec![
                ("F0".to_string(), 0.2),
                ("Tg".to_string(), 300.0),
                ("alpha".to_string(), 0.3)
            ]
        );
    }

    #[test]
    fn toggles_map_to_ht_options() {
        let args = invert_args(&["--no-evaporation", "--radiation", "--frozen-cp"]);
        let config = invert_config_from_args(&args);
        assert!(!config.ht.evaporation);
        assert!(config.ht.radiation);
        assert!(!config.ht.sensible);
        assert!(config.ht.absorption && config.ht.conduction);
    }

    #[test]
    fn invert_config_carries_strategy_and_seed() {
        let args = invert_args(&["-m", "silicon", "-p", "advanced", "--seed", "7", "--shots", "5"]);
        let config = invert_config_from_args(&args);
        assert_eq!(config.material, MaterialKind::Silicon);
        assert_eq!(config.spectroscopic.pyrometry, PyrometryKind::Advanced);
        assert_eq!(config.spectroscopic.seed, 7);
        assert_eq!(config.synthetic.seed, 7);
        assert_eq!(config.synthetic.shots, 5);
    }
}
