//! Archival table and result-record writers.
//!
//! The export layout mirrors the survey convention: the full per-region
//! table under `tables/`, the filtered profile under `tables_criterions/`
//! named by criterion and calibrator. Writers create their directories on
//! demand and are only invoked when the corresponding run flag is set.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use crate::domain::{Calibrator, Criterion, GradientRecord, RegionRecord, SelectionOutcome};
use crate::error::AppError;
use crate::filter::ProfilePoints;

/// Write the per-region corrected-flux/abundance table.
///
/// Returns the path written: `<root>/tables/<galaxy>.csv`.
pub fn write_region_table(
    root: &Path,
    galaxy: &str,
    records: &[RegionRecord],
) -> Result<PathBuf, AppError> {
    let dir = root.join("tables");
    create_dir_all(&dir)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", dir.display())))?;
    let path = dir.join(format!("{galaxy}.csv"));

    let mut writer = csv::Writer::from_path(&path)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", path.display())))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::io(format!("Failed to write region table row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush region table: {e}")))?;

    Ok(path)
}

/// Write the filtered (r, OH, eOH) profile table.
///
/// Returns the path written:
/// `<root>/tables_criterions/<galaxy>_<criterion>_<calibrator>.csv`.
pub fn write_profile_table(
    root: &Path,
    galaxy: &str,
    criterion: Criterion,
    calibrator: Calibrator,
    points: &ProfilePoints,
) -> Result<PathBuf, AppError> {
    let dir = root.join("tables_criterions");
    create_dir_all(&dir)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", dir.display())))?;
    let path = dir.join(format!(
        "{galaxy}_{}_{}.csv",
        criterion.label(),
        calibrator.table_label()
    ));

    let mut writer = csv::Writer::from_path(&path)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", path.display())))?;
    writer
        .write_record(["r", "OH", "eOH"])
        .map_err(|e| AppError::io(format!("Failed to write profile header: {e}")))?;
    for i in 0..points.len() {
        writer
            .write_record([
                format!("{:.10}", points.r[i]),
                format!("{:.10}", points.oh[i]),
                format!("{:.10}", points.oh_err[i]),
            ])
            .map_err(|e| AppError::io(format!("Failed to write profile row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush profile table: {e}")))?;

    Ok(path)
}

/// Write the final result record as pretty JSON.
///
/// An insufficient-data outcome is written as an explicit sentinel object so
/// batch consumers can distinguish it from a missing file.
pub fn write_gradient_json(
    path: &Path,
    galaxy: &str,
    outcome: &SelectionOutcome,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", path.display())))?;

    match outcome {
        SelectionOutcome::Fit(fit) => {
            let record = GradientRecord {
                galaxy: galaxy.to_string(),
                params: fit.params.clone(),
            };
            serde_json::to_writer_pretty(file, &record)
                .map_err(|e| AppError::io(format!("Failed to write gradient JSON: {e}")))?;
        }
        SelectionOutcome::InsufficientData { n } => {
            let sentinel = serde_json::json!({
                "galaxy": galaxy,
                "status": "insufficient data",
                "n": n,
            });
            serde_json::to_writer_pretty(file, &sentinel)
                .map_err(|e| AppError::io(format!("Failed to write gradient JSON: {e}")))?;
        }
    }

    Ok(())
}
