//! Command-line parsing for the TiRe-LII simulator.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! modeling code. `app` turns the parsed arguments into a `RunConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{BlackbodyLaw, MulticolorKind, PyrometryKind};
use crate::logging::LogLevel;
use crate::props::{GasKind, MaterialKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "lii", version, about = "Time-resolved laser-induced incandescence simulator")]
pub struct Cli {
    /// Log level (overrides RUST_LOG).
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Solve the heat-transfer model and print the temperature history.
    Simulate(SimulateArgs),
    /// Simulate, synthesize noisy shots, and recover the temperature by pyrometry.
    Invert(InvertArgs),
}

/// Particle, gas, laser and integrator options.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    #[arg(short = 'm', long, value_enum, default_value_t = MaterialKind::Soot)]
    pub material: MaterialKind,

    #[arg(short = 'g', long, value_enum, default_value_t = GasKind::Argon)]
    pub gas: GasKind,

    /// Initial particle diameter(s) in nm; several values run one shot per diameter.
    #[arg(short = 'd', long = "diameter", value_delimiter = ',', default_values_t = [30.0])]
    pub diameters: Vec<f64>,

    /// Laser fluence (J/cm²). Defaults to the material preset.
    #[arg(long)]
    pub fluence: Option<f64>,

    /// Laser pulse FWHM (ns).
    #[arg(long)]
    pub pulse_width: Option<f64>,

    /// Gas temperature (K).
    #[arg(long)]
    pub gas_temperature: Option<f64>,

    /// Gas pressure (Pa).
    #[arg(long)]
    pub pressure: Option<f64>,

    /// Override any named property, e.g. `--set alpha=0.3`.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_override)]
    pub overrides: Vec<(String, f64)>,

    /// Span before the pulse centre (ns).
    #[arg(long, default_value_t = 20.0)]
    pub t_pre: f64,

    /// Span after the pulse centre (ns).
    #[arg(long, default_value_t = 2000.0)]
    pub t_post: f64,

    /// Grid points before the pulse centre (uniform).
    #[arg(long, default_value_t = 40)]
    pub n_pre: usize,

    /// Grid points after the pulse centre (log-spaced).
    #[arg(long, default_value_t = 200)]
    pub n_post: usize,

    /// Disable laser absorption (start from Ti instead).
    #[arg(long)]
    pub no_absorption: bool,

    /// Disable conduction to the gas.
    #[arg(long)]
    pub no_conduction: bool,

    /// Disable evaporation.
    #[arg(long)]
    pub no_evaporation: bool,

    /// Enable thermal radiation.
    #[arg(long)]
    pub radiation: bool,

    /// Enable the annealing state.
    #[arg(long)]
    pub annealing: bool,

    /// Freeze the heat capacity at the gas temperature.
    #[arg(long)]
    pub frozen_cp: bool,

    /// Integrator relative tolerance.
    #[arg(long, default_value_t = 1e-6)]
    pub rtol: f64,

    /// Integrator absolute tolerance.
    #[arg(long, default_value_t = 1e-8)]
    pub atol: f64,

    /// Rows printed in the summary tables.
    #[arg(long, default_value_t = 20)]
    pub rows: usize,

    /// Export the trajectory to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// Options for synthetic signals and the inversion.
#[derive(Debug, Args, Clone)]
pub struct InvertArgs {
    #[command(flatten)]
    pub sim: SimulateArgs,

    /// Measurement wavelengths (nm), comma separated.
    #[arg(short = 'w', long, value_delimiter = ',', default_values_t = [650.0, 750.0])]
    pub wavelengths: Vec<f64>,

    /// Pyrometry strategy.
    #[arg(short = 'p', long, value_enum, default_value_t = PyrometryKind::Ratio)]
    pub pyrometry: PyrometryKind,

    /// Spectral-fit mode (with `--pyrometry spectral-fit`).
    #[arg(long, value_enum, default_value_t = MulticolorKind::Sequential)]
    pub multicolor: MulticolorKind,

    /// Blackbody law of the forward model.
    #[arg(long, value_enum, default_value_t = BlackbodyLaw::Planck)]
    pub law: BlackbodyLaw,

    /// Laser shots (ignored when several diameters are given).
    #[arg(long, default_value_t = 20)]
    pub shots: usize,

    /// Relative Gaussian noise per sample.
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    /// True scaling factor of the synthetic signal.
    #[arg(long, default_value_t = 1.0)]
    pub scaling: f64,

    /// Relative per-shot scaling jitter.
    #[arg(long, default_value_t = 0.0)]
    pub jitter: f64,

    /// Random seed for the noise and the Monte-Carlo draws.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Monte-Carlo draws per time step (`--pyrometry advanced`).
    #[arg(long, default_value_t = 500)]
    pub mc_samples: usize,

    /// Smoothness weight (`--multicolor simultaneous-smooth-prior`).
    #[arg(long, default_value_t = 1.0)]
    pub prior_weight: f64,

    /// Fixed scaling factor (`--pyrometry const-concentration`).
    #[arg(long)]
    pub const_concentration: Option<f64>,

    /// Export the inversion result to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Parse `NAME=VALUE`.
fn parse_override(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing property name in '{s}'"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value for '{name}': {e}"))?;
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        assert_eq!(parse_override("alpha=0.3"), Ok(("alpha".to_string(), 0.3)));
        assert_eq!(parse_override(" Tg = 300 "), Ok(("Tg".to_string(), 300.0)));
        assert!(parse_override("alpha").is_err());
        assert!(parse_override("=1").is_err());
        assert!(parse_override("alpha=x").is_err());
    }

    #[test]
    fn invert_defaults() {
        let cli = Cli::try_parse_from(["lii", "invert", "-m", "iron"]).unwrap();
        let Command::Invert(args) = cli.command else {
            panic!("expected invert");
        };
        assert_eq!(args.sim.material, MaterialKind::Iron);
        assert_eq!(args.wavelengths, vec![650.0, 750.0]);
        assert_eq!(args.pyrometry, PyrometryKind::Ratio);
        assert_eq!(args.sim.diameters, vec![30.0]);
    }

    #[test]
    fn lists_and_global_flags() {
        let cli = Cli::try_parse_from([
            "lii",
            "simulate",
            "--diameter",
            "20,40",
            "--set",
            "alpha=0.3",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.diameters, vec![20.0, 40.0]);
        assert_eq!(args.overrides, vec![("alpha".to_string(), 0.3)]);
    }

    #[test]
    fn spectral_fit_flags() {
        let cli = Cli::try_parse_from([
            "lii",
            "invert",
            "-w",
            "500,600,700,800",
            "-p",
            "spectral-fit",
            "--multicolor",
            "simultaneous-smooth-prior",
        ])
        .unwrap();
        let Command::Invert(args) = cli.command else {
            panic!("expected invert");
        };
        assert_eq!(args.wavelengths.len(), 4);
        assert_eq!(args.pyrometry, PyrometryKind::SpectralFit);
        assert_eq!(args.multicolor, MulticolorKind::SimultaneousSmoothPrior);
    }
}
