//! Command-line parsing for the gradient fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the modeling/math code. Calibrator and criterion
//! selectors stay strings here and are validated into enums when the run
//! configuration is built, so unknown values fail fast with exit code 2.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ohgrad", version, about = "Radial metallicity gradient fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full pipeline: deproject, calibrate, filter, fit, report.
    Fit(FitArgs),
}

/// Options for a fit run.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Galaxy geometry CSV (galaxy, ra0, dec0, pa, ba, re, dist).
    #[arg(long, value_name = "CSV")]
    pub galaxy: PathBuf,

    /// Per-region emission-line flux CSV.
    #[arg(long, value_name = "CSV")]
    pub flux: PathBuf,

    /// Abundance calibrator: 1=PP04_O3N2, 2=PP04_N2, 3=M13_O3N2, 4=M13_N2,
    /// 5=D16 (names accepted too).
    #[arg(short = 'c', long, default_value = "1")]
    pub calibrator: String,

    /// Contamination criterion: none, ST06, KA03, KE01, KE6A, CF11.
    #[arg(short = 'k', long, default_value = "none")]
    pub criterion: String,

    /// Bootstrap restarts per breakpoint candidate.
    #[arg(long, default_value_t = 200)]
    pub boot: usize,

    /// Seed for the restart resampler.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Write the per-region corrected-flux/abundance table (tables/).
    #[arg(long)]
    pub save_table: bool,

    /// Write the filtered profile table (tables_criterions/).
    #[arg(long)]
    pub save_profile: bool,

    /// Render the profile plot PNG (graphs/).
    #[arg(long)]
    pub save_plot: bool,

    /// Export the final result record as JSON.
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Plot width (pixels).
    #[arg(long, default_value_t = 800)]
    pub plot_width: u32,

    /// Plot height (pixels).
    #[arg(long, default_value_t = 600)]
    pub plot_height: u32,
}
