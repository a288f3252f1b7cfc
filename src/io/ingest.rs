//! CSV ingest for the galaxy geometry record and the per-region flux table.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Lenient cells**: unparsable flux values become NaN and flow into the
//!   downstream quality masks instead of aborting the run
//! - **No science here**: ingest only shapes data, the pipeline derives

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{GalaxyGeometry, LineFlux, Region};
use crate::error::AppError;

/// Column names of the per-region flux table.
const FLUX_COLUMNS: [&str; 16] = [
    "HIIREGID",
    "RA",
    "DEC",
    "EWHa6562",
    "fluxHb4861",
    "e_fluxHb4861",
    "fluxOIII5006",
    "e_fluxOIII5006",
    "fluxHa6562",
    "e_fluxHa6562",
    "fluxNII6583",
    "e_fluxNII6583",
    "fluxSII6716",
    "e_fluxSII6716",
    "fluxSII6730",
    "e_fluxSII6730",
];

/// Column names of the galaxy geometry record.
const GALAXY_COLUMNS: [&str; 7] = ["galaxy", "ra0", "dec0", "pa", "ba", "re", "dist"];

/// Read the single-row galaxy geometry CSV.
pub fn read_galaxy_csv(path: &Path) -> Result<GalaxyGeometry, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::invalid(format!("Failed to open galaxy CSV '{}': {e}", path.display())))?;
    parse_galaxy(csv::Reader::from_reader(file))
}

/// Read the per-region flux table CSV.
pub fn read_flux_csv(path: &Path) -> Result<Vec<Region>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::invalid(format!("Failed to open flux CSV '{}': {e}", path.display())))?;
    parse_flux(csv::Reader::from_reader(file))
}

fn parse_galaxy<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<GalaxyGeometry, AppError> {
    let columns = column_index(&mut reader, &GALAXY_COLUMNS, "galaxy CSV")?;

    let mut records = reader.records();
    let record = records
        .next()
        .ok_or_else(|| AppError::invalid("Galaxy CSV contains no data row."))?
        .map_err(|e| AppError::invalid(format!("Malformed galaxy CSV: {e}")))?;

    let field = |name: &str| -> String {
        record.get(columns[name]).unwrap_or("").trim().to_string()
    };
    let number = |name: &str| -> Result<f64, AppError> {
        let raw = field(name);
        raw.parse::<f64>().map_err(|_| {
            AppError::invalid(format!("Galaxy CSV column '{name}' is not numeric: '{raw}'"))
        })
    };

    let geom = GalaxyGeometry {
        name: field("galaxy"),
        ra0: number("ra0")?,
        dec0: number("dec0")?,
        pa: number("pa")?,
        ba: number("ba")?,
        re_kpc: number("re")?,
        dist_mpc: number("dist")?,
    };
    if geom.name.is_empty() {
        return Err(AppError::invalid("Galaxy CSV has an empty galaxy name."));
    }
    Ok(geom)
}

fn parse_flux<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<Region>, AppError> {
    let columns = column_index(&mut reader, &FLUX_COLUMNS, "flux CSV")?;

    let mut regions = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| AppError::invalid(format!("Malformed flux CSV row {}: {e}", line + 2)))?;

        let cell = |name: &str| -> f64 { lenient_f64(&record, columns[name]) };
        let pair = |flux: &str, err: &str| LineFlux {
            flux: cell(flux),
            err: cell(err),
        };

        regions.push(Region {
            id: record
                .get(columns["HIIREGID"])
                .unwrap_or("")
                .trim()
                .to_string(),
            ra: cell("RA"),
            dec: cell("DEC"),
            ew_ha: cell("EWHa6562"),
            hb4861: pair("fluxHb4861", "e_fluxHb4861"),
            ha6562: pair("fluxHa6562", "e_fluxHa6562"),
            oiii5006: pair("fluxOIII5006", "e_fluxOIII5006"),
            nii6583: pair("fluxNII6583", "e_fluxNII6583"),
            sii6716: pair("fluxSII6716", "e_fluxSII6716"),
            sii6730: pair("fluxSII6730", "e_fluxSII6730"),
        });
    }

    Ok(regions)
}

/// Resolve required column names to indices, failing with the missing name.
fn column_index<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    required: &[&'static str],
    what: &str,
) -> Result<HashMap<&'static str, usize>, AppError> {
    let headers = reader
        .headers()
        .map_err(|e| AppError::invalid(format!("Failed to read {what} header: {e}")))?
        .clone();

    let mut columns = HashMap::new();
    for &name in required {
        let idx = headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| AppError::invalid(format!("Missing column '{name}' in {what}.")))?;
        columns.insert(name, idx);
    }
    Ok(columns)
}

/// Parse a numeric cell; anything unparsable becomes NaN so the quality masks
/// decide the region's fate.
fn lenient_f64(record: &StringRecord, idx: usize) -> f64 {
    record
        .get(idx)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}
