//! Spectroscopic forward/inverse model.
//!
//! The forward path is a pure function of temperature; inversion strategies
//! live in `crate::pyrometry` and `crate::fit` and only see the model through
//! its emission helpers.

pub mod spectroscopic;

pub use spectroscopic::*;
