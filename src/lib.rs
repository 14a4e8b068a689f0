//! `tire-lii` library crate.
//!
//! Time-resolved laser-induced incandescence (TiRe-LII) of nanoparticles:
//!
//! - `ht`: heat-transfer model (temperature, mass and annealing histories)
//! - `models`: spectroscopic forward model and inverse dispatch
//! - `pyrometry`, `fit`: two-color and spectral-fit inversion strategies
//! - `props`: material/gas property store and correlations
//!
//! The binary (`lii`) is a thin wrapper around this library so that core logic
//! is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod constants;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod ht;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod props;
pub mod pyrometry;
pub mod report;
