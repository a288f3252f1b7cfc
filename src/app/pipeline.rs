//! The fit pipeline shared by the CLI and by library callers.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> deproject -> calibrate -> filter -> model selection
//!
//! Each stage fully consumes its input arrays and returns fresh outputs; no
//! stage mutates another's result.

use crate::abundance;
use crate::domain::{RegionRecord, RunConfig, SelectionOutcome};
use crate::error::AppError;
use crate::filter::{self, ProfilePoints};
use crate::fit;
use crate::geometry;
use crate::io::ingest;

/// All computed outputs of a single `ohgrad fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub geometry: crate::domain::GalaxyGeometry,
    /// Regions ingested from the flux table.
    pub n_regions: usize,
    /// Archival rows, one per ingested region.
    pub records: Vec<RegionRecord>,
    /// The filtered profile the selector saw.
    pub profile: ProfilePoints,
    pub outcome: SelectionOutcome,
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    let geom = ingest::read_galaxy_csv(&config.galaxy_csv)?;
    let regions = ingest::read_flux_csv(&config.flux_csv)?;

    let ra: Vec<f64> = regions.iter().map(|r| r.ra).collect();
    let dec: Vec<f64> = regions.iter().map(|r| r.dec).collect();
    let radii = geometry::project(&ra, &dec, &geom);

    let calibration = abundance::calibrate(&regions, &radii, config.calibrator);

    let ew: Vec<f64> = regions.iter().map(|r| r.ew_ha).collect();
    let profile = filter::profile_points(
        config.criterion,
        &radii,
        &calibration.abundances,
        &ew,
    );

    let outcome = fit::select_model(
        &profile.r,
        &profile.oh,
        &profile.oh_err,
        config.n_boot,
        config.seed,
    );

    Ok(RunOutput {
        geometry: geom,
        n_regions: regions.len(),
        records: calibration.records,
        profile,
        outcome,
    })
}
