//! Domain types used throughout the models.
//!
//! This module defines:
//!
//! - strategy selectors (`PyrometryKind`, `MulticolorKind`, `BlackbodyLaw`)
//! - model state containers (`TemperatureTrajectory`, `SignalTensor`)
//! - inversion outputs (`PyrometryResult`, `Diagnostics`)

pub mod types;

pub use types::*;
