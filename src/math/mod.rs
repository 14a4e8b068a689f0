//! Numerical building blocks: radiance, least squares, ODE integration, grids.

pub mod grid;
pub mod lm;
pub mod ode;
pub mod ols;
pub mod planck;
pub mod stats;

pub use grid::*;
pub use lm::*;
pub use ode::*;
pub use ols::*;
pub use planck::*;
