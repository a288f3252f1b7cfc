//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs the pipeline (deproject -> calibrate -> filter -> select)
//! - prints the run summary
//! - writes optional archival outputs

use std::path::Path;

use clap::Parser;

use crate::cli::{Command, FitArgs};
use crate::domain::{Calibrator, Criterion, RunConfig, SelectionOutcome};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `ohgrad` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(
            &run.geometry,
            &config,
            run.n_regions,
            run.profile.len(),
            &run.outcome,
        )
    );

    let root = Path::new(".");
    if config.save_table {
        let path = crate::io::export::write_region_table(root, &run.geometry.name, &run.records)?;
        println!("Wrote region table: {}", path.display());
    }
    if config.save_profile {
        let path = crate::io::export::write_profile_table(
            root,
            &run.geometry.name,
            config.criterion,
            config.calibrator,
            &run.profile,
        )?;
        println!("Wrote profile table: {}", path.display());
    }
    if config.save_plot {
        if let SelectionOutcome::Fit(fit) = &run.outcome {
            let dir = root.join("graphs");
            std::fs::create_dir_all(&dir)
                .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", dir.display())))?;
            let path = dir.join(format!(
                "{}_{}_{}.png",
                run.geometry.name,
                config.criterion.label(),
                config.calibrator.table_label()
            ));
            crate::plot::render_profile_png(&path, fit, config.plot_width, config.plot_height)?;
            println!("Wrote profile plot: {}", path.display());
        }
    }
    if let Some(path) = &config.export_json {
        crate::io::export::write_gradient_json(path, &run.geometry.name, &run.outcome)?;
        println!("Wrote gradient JSON: {}", path.display());
    }

    Ok(())
}

fn run_config_from_args(args: &FitArgs) -> Result<RunConfig, AppError> {
    Ok(RunConfig {
        galaxy_csv: args.galaxy.clone(),
        flux_csv: args.flux.clone(),
        calibrator: Calibrator::from_selector(&args.calibrator)?,
        criterion: Criterion::from_name(&args.criterion)?,
        n_boot: args.boot,
        seed: args.seed,
        save_table: args.save_table,
        save_profile: args.save_profile,
        save_plot: args.save_plot,
        export_json: args.export_json.clone(),
        plot_width: args.plot_width,
        plot_height: args.plot_height,
    })
}
