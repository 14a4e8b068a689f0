//! Crate-wide error type.
//!
//! Every fallible operation returns `Result<_, AppError>`. The variants follow the
//! failure classes of the model:
//!
//! - `Config`: missing or unsupported options, unknown parameter names (fatal)
//! - `Integration`: the heat-transfer integrator gave up; the partial trajectory
//!   is kept so callers can inspect how far it got
//! - `Numerical`: degenerate linear algebra inside the spectral fit
//! - `Io`: export/read failures in the CLI layer
//!
//! Parameter-vector length mismatches are *not* errors; they are logged and skipped.

use thiserror::Error;

use crate::domain::TemperatureTrajectory;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("integration failed: {message}")]
    Integration {
        message: String,
        partial: Box<TemperatureTrajectory>,
    },

    #[error("numerical error: {0}")]
    Numerical(String),

    #[error("{0}")]
    Io(String),
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn numerical(message: impl Into<String>) -> Self {
        Self::Numerical(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Process exit code for the `lii` binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::Io(_) => 2,
            AppError::Integration { .. } | AppError::Numerical(_) => 4,
        }
    }

    /// Partial trajectory attached to an integration failure, if any.
    pub fn partial_trajectory(&self) -> Option<&TemperatureTrajectory> {
        match self {
            AppError::Integration { partial, .. } => Some(partial),
            _ => None,
        }
    }
}
