//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during the pipeline
//! - exported to CSV/JSON
//! - reloaded later for plotting or comparisons

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One emission-line flux measurement with its 1-sigma uncertainty.
///
/// Fluxes are extinction-uncorrected as read from the input table; the
/// abundance stage derives corrected log ratios from them.
#[derive(Debug, Clone, Copy)]
pub struct LineFlux {
    pub flux: f64,
    pub err: f64,
}

impl LineFlux {
    /// A line is reliable when its uncertainty is strictly below 0.997 of the
    /// flux and the flux itself is strictly positive.
    pub fn is_reliable(&self) -> bool {
        self.err < 0.997 * self.flux && self.flux > 0.0
    }
}

/// One spatial sample (an HII region) as ingested. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: String,
    /// Right ascension in degrees.
    pub ra: f64,
    /// Declination in degrees.
    pub dec: f64,
    /// Hα equivalent width.
    pub ew_ha: f64,
    pub hb4861: LineFlux,
    pub ha6562: LineFlux,
    pub oiii5006: LineFlux,
    pub nii6583: LineFlux,
    pub sii6716: LineFlux,
    pub sii6730: LineFlux,
}

/// Fixed per-galaxy geometry consumed by the radius projector.
///
/// Invariant: `ba` must satisfy `ba^2 >= 0.13^2` for the deprojection to be
/// real-valued; smaller values propagate NaN radii instead of failing.
#[derive(Debug, Clone)]
pub struct GalaxyGeometry {
    pub name: String,
    /// Center right ascension in degrees.
    pub ra0: f64,
    /// Center declination in degrees.
    pub dec0: f64,
    /// Position angle in degrees.
    pub pa: f64,
    /// Projected minor-to-major axis ratio.
    pub ba: f64,
    /// Distance in Mpc.
    pub dist_mpc: f64,
    /// Effective radius in kpc.
    pub re_kpc: f64,
}

/// A base-10 logarithmic flux ratio relative to Hβ, with propagated
/// uncertainty. Always derived, never mutated.
#[derive(Debug, Clone, Copy)]
pub struct CorrectedFlux {
    pub value: f64,
    pub err: f64,
}

/// Which published calibration maps a diagnostic index to 12+log(O/H).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Calibrator {
    /// Pettini & Pagel (2004), O3N2 index.
    Pp04O3n2,
    /// Pettini & Pagel (2004), N2 index.
    Pp04N2,
    /// Marino et al. (2013), O3N2 index.
    M13O3n2,
    /// Marino et al. (2013), N2 index.
    M13N2,
    /// Dopita et al. (2016), NII/SII + NII/Hα.
    D16,
}

impl Calibrator {
    pub const ALL: [Calibrator; 5] = [
        Calibrator::Pp04O3n2,
        Calibrator::Pp04N2,
        Calibrator::M13O3n2,
        Calibrator::M13N2,
        Calibrator::D16,
    ];

    /// Parse the CLI selector: the classic integer ids 1..=5 or a name.
    pub fn from_selector(s: &str) -> Result<Self, AppError> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "1" | "pp04_o3n2" | "pp04-o3n2" => Ok(Calibrator::Pp04O3n2),
            "2" | "pp04_n2" | "pp04-n2" => Ok(Calibrator::Pp04N2),
            "3" | "m13_o3n2" | "m13-o3n2" => Ok(Calibrator::M13O3n2),
            "4" | "m13_n2" | "m13-n2" => Ok(Calibrator::M13N2),
            "5" | "d16" => Ok(Calibrator::D16),
            _ => Err(AppError::invalid(format!(
                "Invalid calibrator '{s}'. Use 1=PP04_O3N2, 2=PP04_N2, 3=M13_O3N2, 4=M13_N2, 5=D16."
            ))),
        }
    }

    /// Label used in archival file names.
    pub fn table_label(self) -> &'static str {
        match self {
            Calibrator::Pp04O3n2 => "PP04_O3N2",
            Calibrator::Pp04N2 => "PP04_N2",
            Calibrator::M13O3n2 => "M13_O3N2",
            Calibrator::M13N2 => "M13_N2",
            Calibrator::D16 => "D16",
        }
    }
}

/// Emission-mechanism cut applied after the quality filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// No contamination cut.
    None,
    /// Stasińska et al. (2006) dividing curve.
    St06,
    /// Kauffmann et al. (2003) dividing curve.
    Ka03,
    /// Kewley et al. (2001) dividing curve.
    Ke01,
    /// KE01 plus an Hα equivalent-width floor of 6 Å.
    Ke6a,
    /// Cid Fernandes et al. (2011) WHAN-style cut.
    Cf11,
}

impl Criterion {
    /// Parse the CLI/ingest selector. Unknown names are rejected up front.
    pub fn from_name(s: &str) -> Result<Self, AppError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "NONE" => Ok(Criterion::None),
            "ST06" => Ok(Criterion::St06),
            "KA03" => Ok(Criterion::Ka03),
            "KE01" => Ok(Criterion::Ke01),
            "KE6A" => Ok(Criterion::Ke6a),
            "CF11" => Ok(Criterion::Cf11),
            _ => Err(AppError::invalid(format!("Criterion '{s}' not recognized."))),
        }
    }

    /// Label used in archival file names.
    pub fn label(self) -> &'static str {
        match self {
            Criterion::None => "none",
            Criterion::St06 => "ST06",
            Criterion::Ka03 => "KA03",
            Criterion::Ke01 => "KE01",
            Criterion::Ke6a => "KE6A",
            Criterion::Cf11 => "CF11",
        }
    }
}

/// Per-region calibration output consumed by the filter stage.
#[derive(Debug, Clone)]
pub struct RegionAbundance {
    /// 12+log(O/H) from the chosen calibrator (NaN when gated or out of range).
    pub oh: f64,
    pub oh_err: f64,
    pub ha_cor: f64,
    pub oiii_cor: f64,
    pub nii_cor: f64,
}

/// Archival row: every corrected flux and every calibration output for one
/// region, regardless of which calibrator the run selected.
///
/// Serialized column names follow the long-standing survey table layout so
/// existing reduction notebooks keep working.
#[derive(Debug, Clone, Serialize)]
pub struct RegionRecord {
    #[serde(rename = "HIIREGID")]
    pub id: String,
    pub r: f64,
    #[serde(rename = "EWHa6562")]
    pub ew_ha: f64,
    #[serde(rename = "Ha6562_cor")]
    pub ha_cor: f64,
    #[serde(rename = "eHa6562_cor")]
    pub e_ha_cor: f64,
    #[serde(rename = "OIII5006_cor")]
    pub oiii_cor: f64,
    #[serde(rename = "eOIII5006_cor")]
    pub e_oiii_cor: f64,
    #[serde(rename = "NII6583_cor")]
    pub nii_cor: f64,
    #[serde(rename = "eNII6583_cor")]
    pub e_nii_cor: f64,
    #[serde(rename = "SII6716_cor")]
    pub sii6716_cor: f64,
    #[serde(rename = "eSII6716_cor")]
    pub e_sii6716_cor: f64,
    #[serde(rename = "SII6730_cor")]
    pub sii6730_cor: f64,
    #[serde(rename = "eSII6730_cor")]
    pub e_sii6730_cor: f64,
    #[serde(rename = "OH_PP04_O3N2")]
    pub oh_pp04_o3n2: f64,
    #[serde(rename = "eOH_PP04_O3N2")]
    pub e_oh_pp04_o3n2: f64,
    #[serde(rename = "OH_PP04_N2")]
    pub oh_pp04_n2: f64,
    #[serde(rename = "eOH_PP04_N2")]
    pub e_oh_pp04_n2: f64,
    #[serde(rename = "OH_M13_O3N2")]
    pub oh_m13_o3n2: f64,
    #[serde(rename = "eOH_M13_O3N2")]
    pub e_oh_m13_o3n2: f64,
    #[serde(rename = "OH_M13_N2")]
    pub oh_m13_n2: f64,
    #[serde(rename = "eOH_M13_N2")]
    pub e_oh_m13_n2: f64,
    #[serde(rename = "OH_D16")]
    pub oh_d16: f64,
    #[serde(rename = "eOH_D16")]
    pub e_oh_d16: f64,
}

/// The three competing regression shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelCase {
    /// Single slope over the whole radial range.
    Linear,
    /// Continuous piecewise-linear with one breakpoint.
    OneBreak,
    /// Continuous piecewise-linear with two breakpoints.
    TwoBreak,
}

impl ModelCase {
    pub const ALL: [ModelCase; 3] = [ModelCase::Linear, ModelCase::OneBreak, ModelCase::TwoBreak];

    /// Parameter count used by the information criterion.
    ///
    /// Point estimates only: const + slopes + breakpoints.
    pub fn param_count(self) -> usize {
        match self {
            ModelCase::Linear => 2,
            ModelCase::OneBreak => 4,
            ModelCase::TwoBreak => 6,
        }
    }

    /// Number of unknown breakpoints.
    pub fn n_breakpoints(self) -> usize {
        match self {
            ModelCase::Linear => 0,
            ModelCase::OneBreak => 1,
            ModelCase::TwoBreak => 2,
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelCase::Linear => "single slope",
            ModelCase::OneBreak => "1 breakpoint",
            ModelCase::TwoBreak => "2 breakpoints",
        }
    }
}

/// A point estimate with its standard error.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Estimate {
    pub value: f64,
    pub se: f64,
}

/// Fit output for one piecewise-linear candidate.
///
/// `alphas` holds the segment slopes (one more than `breakpoints`); both keep
/// ascending radial order. `converged` is false when no restart produced a
/// valid optimum, in which case the selector applies the rss penalty.
#[derive(Debug, Clone)]
pub struct BrokenFit {
    pub intercept: Estimate,
    pub alphas: Vec<Estimate>,
    pub breakpoints: Vec<Estimate>,
    pub rss: f64,
    pub converged: bool,
}

/// The uniform parameter record of the winning model.
///
/// Slots not used by the winning shape are zero, not absent, so downstream
/// consumers see a fixed schema. The single-slope winner stores its slope in
/// `a1`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradientParams {
    pub b0: f64,
    pub eb0: f64,
    pub a1: f64,
    pub ea1: f64,
    pub h1: f64,
    pub eh1: f64,
    pub a2: f64,
    pub ea2: f64,
    pub h2: f64,
    pub eh2: f64,
    pub a3: f64,
    pub ea3: f64,
}

/// Everything the selector reports for a successful competition.
#[derive(Debug, Clone)]
pub struct ProfileFit {
    pub case: ModelCase,
    pub params: GradientParams,
    /// Information criterion value per candidate, in `ModelCase::ALL` order.
    pub aic: [f64; 3],
    /// The finite samples actually used by the fits.
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub yerr: Vec<f64>,
}

/// Terminal output of the model competition.
#[derive(Debug, Clone)]
pub enum SelectionOutcome {
    Fit(Box<ProfileFit>),
    /// Fewer than the minimum usable samples; a recognized state, not an error.
    InsufficientData { n: usize },
}

/// The final serializable result record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientRecord {
    pub galaxy: String,
    #[serde(flatten)]
    pub params: GradientParams,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub galaxy_csv: PathBuf,
    pub flux_csv: PathBuf,
    pub calibrator: Calibrator,
    pub criterion: Criterion,
    /// Bootstrap restarts per breakpoint candidate.
    pub n_boot: usize,
    /// Seed for the restart resampler.
    pub seed: u64,
    /// Write the per-region corrected-flux/abundance table.
    pub save_table: bool,
    /// Write the filtered radius/abundance/uncertainty table.
    pub save_profile: bool,
    /// Render the profile plot PNG.
    pub save_plot: bool,
    pub export_json: Option<PathBuf>,
    pub plot_width: u32,
    pub plot_height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibrator_selector_accepts_ids_and_names() {
        assert_eq!(Calibrator::from_selector("1").unwrap(), Calibrator::Pp04O3n2);
        assert_eq!(Calibrator::from_selector("5").unwrap(), Calibrator::D16);
        assert_eq!(
            Calibrator::from_selector("m13_n2").unwrap(),
            Calibrator::M13N2
        );
        assert_eq!(
            Calibrator::from_selector("PP04-O3N2").unwrap(),
            Calibrator::Pp04O3n2
        );
    }

    #[test]
    fn calibrator_selector_rejects_unknown() {
        let err = Calibrator::from_selector("6").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn criterion_names_round_trip() {
        for c in [
            Criterion::None,
            Criterion::St06,
            Criterion::Ka03,
            Criterion::Ke01,
            Criterion::Ke6a,
            Criterion::Cf11,
        ] {
            assert_eq!(Criterion::from_name(c.label()).unwrap(), c);
        }
    }

    #[test]
    fn criterion_rejects_unknown_name() {
        let err = Criterion::from_name("BPT99").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn reliability_requires_positive_flux_and_small_error() {
        assert!(LineFlux { flux: 10.0, err: 1.0 }.is_reliable());
        assert!(!LineFlux { flux: 10.0, err: 9.97 }.is_reliable());
        assert!(!LineFlux { flux: -1.0, err: 0.1 }.is_reliable());
        assert!(!LineFlux { flux: 0.0, err: 0.0 }.is_reliable());
    }
}
