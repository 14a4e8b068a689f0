//! Particle heat-transfer model.
//!
//! - `submodels`: absorption, conduction, evaporation, radiation, annealing terms
//! - `model`: `HeatTransferModel` (option set, parameter overrides, integration)

pub mod model;
pub mod submodels;

pub use model::{HeatTransferModel, HtOptions};
