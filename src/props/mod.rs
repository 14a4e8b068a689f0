//! Material property store and the correlations it evaluates.
//!
//! - `store`: `MaterialProperties`, the owned, name-addressable parameter set
//! - `correlations`: Watson, Clausius–Clapeyron, Antoine, Kelvin, Tolman, Drude
//! - `materials`: built-in soot / iron / silicon and gas definitions

pub mod correlations;
pub mod materials;
pub mod store;

pub use materials::{GasKind, MaterialKind};
pub use store::*;
