//! Data sources.
//!
//! Experimental data ingestion is out of scope; signals come from the forward
//! model with seeded noise.

pub mod synthetic;

pub use synthetic::{SyntheticConfig, SyntheticSignal, synthesize};
