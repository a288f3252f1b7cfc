//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{GalaxyGeometry, ModelCase, ProfileFit, RunConfig, SelectionOutcome};

/// Format the full run summary (inputs, counts, AIC table, chosen model).
pub fn format_run_summary(
    geom: &GalaxyGeometry,
    config: &RunConfig,
    n_regions: usize,
    n_filtered: usize,
    outcome: &SelectionOutcome,
) -> String {
    let mut out = String::new();

    out.push_str("=== ohgrad - radial metallicity profile ===\n");
    out.push_str(&format!("Galaxy: {}\n", geom.name));
    out.push_str(&format!(
        "Geometry: pa={:.1} deg | ba={:.3} | d={:.1} Mpc | re={:.2} kpc\n",
        geom.pa, geom.ba, geom.dist_mpc, geom.re_kpc
    ));
    out.push_str(&format!(
        "Calibrator: {} | Criterion: {}\n",
        config.calibrator.table_label(),
        config.criterion.label()
    ));
    out.push_str(&format!(
        "Regions: {n_regions} ingested | {n_filtered} kept after filtering\n"
    ));

    match outcome {
        SelectionOutcome::InsufficientData { n } => {
            out.push('\n');
            out.push_str(&format_insufficient(&geom.name, *n));
            out.push('\n');
        }
        SelectionOutcome::Fit(fit) => {
            out.push_str("\nModel comparison (AIC):\n");
            for (case, aic) in ModelCase::ALL.iter().zip(fit.aic.iter()) {
                let chosen = if *case == fit.case { "*" } else { " " };
                out.push_str(&format!(
                    "{chosen} {:<13} AIC={aic:.3}\n",
                    case.display_name()
                ));
            }

            out.push_str("\nChosen model:\n");
            out.push_str(&format_params(fit));
        }
    }

    out
}

/// The per-galaxy terminal line for a degenerate dataset.
pub fn format_insufficient(galaxy: &str, n: usize) -> String {
    format!("Insufficient data for fitting the galaxy {galaxy} ({n} usable regions).")
}

fn format_params(fit: &ProfileFit) -> String {
    let p = &fit.params;
    let mut out = String::new();

    out.push_str(&format!("- b0 = {:.3} ± {:.3}\n", p.b0, p.eb0));
    out.push_str(&format!("- a1 = {:.3} ± {:.3}\n", p.a1, p.ea1));
    match fit.case {
        ModelCase::Linear => {}
        ModelCase::OneBreak => {
            out.push_str(&format!("- h1 = {:.2} ± {:.2}\n", p.h1, p.eh1));
            out.push_str(&format!("- a2 = {:.3} ± {:.3}\n", p.a2, p.ea2));
        }
        ModelCase::TwoBreak => {
            out.push_str(&format!("- h1 = {:.2} ± {:.2}\n", p.h1, p.eh1));
            out.push_str(&format!("- a2 = {:.3} ± {:.3}\n", p.a2, p.ea2));
            out.push_str(&format!("- h2 = {:.2} ± {:.2}\n", p.h2, p.eh2));
            out.push_str(&format!("- a3 = {:.3} ± {:.3}\n", p.a3, p.ea3));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Calibrator, Criterion, GradientParams};
    use std::path::PathBuf;

    fn geometry() -> GalaxyGeometry {
        GalaxyGeometry {
            name: "NGC0309".to_string(),
            ra0: 14.177,
            dec0: -9.914,
            pa: 115.0,
            ba: 0.89,
            dist_mpc: 82.7,
            re_kpc: 7.5,
        }
    }

    fn config() -> RunConfig {
        RunConfig {
            galaxy_csv: PathBuf::new(),
            flux_csv: PathBuf::new(),
            calibrator: Calibrator::Pp04O3n2,
            criterion: Criterion::Ka03,
            n_boot: 200,
            seed: 42,
            save_table: false,
            save_profile: false,
            save_plot: false,
            export_json: None,
            plot_width: 800,
            plot_height: 600,
        }
    }

    #[test]
    fn summary_stars_the_chosen_model() {
        let fit = ProfileFit {
            case: ModelCase::OneBreak,
            params: GradientParams {
                b0: 8.8,
                eb0: 0.02,
                a1: -0.3,
                ea1: 0.03,
                h1: 1.2,
                eh1: 0.1,
                a2: 0.05,
                ea2: 0.02,
                ..Default::default()
            },
            aic: [-50.0, -60.0, -55.0],
            x: vec![0.5],
            y: vec![8.6],
            yerr: vec![0.05],
        };
        let text = format_run_summary(
            &geometry(),
            &config(),
            40,
            32,
            &SelectionOutcome::Fit(Box::new(fit)),
        );

        assert!(text.contains("* 1 breakpoint"));
        assert!(text.contains("  single slope"));
        assert!(text.contains("h1 = 1.20"));
        assert!(text.contains("PP04_O3N2"));
        assert!(text.contains("KA03"));
    }

    #[test]
    fn summary_reports_insufficient_data() {
        let text = format_run_summary(
            &geometry(),
            &config(),
            8,
            4,
            &SelectionOutcome::InsufficientData { n: 4 },
        );
        assert!(text.contains("Insufficient data for fitting the galaxy NGC0309"));
    }
}
