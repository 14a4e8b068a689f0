//! Read/write inversion result JSON files.
//!
//! A result file is the portable record of one inversion run:
//! - material/gas and the spectroscopic options used
//! - the time grid and, for synthetic runs, the true mean temperature
//! - the full `PyrometryResult` including diagnostics
//!
//! Non-finite values serialize as `null`, so files carrying NaN uncertainties
//! are write-only.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::PyrometryResult;
use crate::error::AppError;
use crate::models::SpectroscopicOptions;
use crate::props::{GasKind, MaterialKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub material: MaterialKind,
    pub gas: GasKind,
    pub options: SpectroscopicOptions,
    /// Time grid (ns).
    pub time: Vec<f64>,
    /// Shot-averaged temperature the signal was synthesized from, if known.
    pub true_temperature: Option<Vec<f64>>,
    pub result: PyrometryResult,
}

impl ResultFile {
    pub fn new(
        material: MaterialKind,
        gas: GasKind,
        options: SpectroscopicOptions,
        time: Vec<f64>,
        true_temperature: Option<Vec<f64>>,
        result: PyrometryResult,
    ) -> Self {
        Self {
            tool: "lii".to_string(),
            generated_at: Utc::now(),
            material,
            gas,
            options,
            time,
            true_temperature,
            result,
        }
    }
}

/// Write a result JSON file.
pub fn write_result_json(path: &Path, file: &ResultFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create result JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(out, file).map_err(|e| AppError::io(format!("Failed to write result JSON: {e}")))?;
    Ok(())
}

/// Read a result JSON file.
pub fn read_result_json(path: &Path) -> Result<ResultFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open result JSON '{}': {e}", path.display())))?;
    let parsed: ResultFile =
        serde_json::from_reader(file).map_err(|e| AppError::io(format!("Invalid result JSON: {e}")))?;
    Ok(parsed)
}
