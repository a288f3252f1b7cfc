//! Profile plot rendering.
//!
//! Draws the filtered abundance profile (error bars), the winning model
//! curve, and dashed vertical markers at fitted breakpoints, then encodes
//! the canvas as PNG. The plot is deliberately text-free so the bitmap
//! backend needs no system font stack.

use std::path::Path;

use plotters::prelude::*;

use crate::domain::{ModelCase, ProfileFit};
use crate::error::AppError;
use crate::fit::predict;

/// Render the profile plot to `path` as a `width`x`height` PNG.
pub fn render_profile_png(
    path: &Path,
    fit: &ProfileFit,
    width: u32,
    height: u32,
) -> Result<(), AppError> {
    if fit.x.is_empty() {
        return Err(AppError::io("Cannot render an empty profile."));
    }

    let x_max = fit.x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let y_min = fit.y.iter().copied().fold(f64::INFINITY, f64::min);
    let y_max = fit.y.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut x_hi = x_max * 1.05;
    if !(x_hi > 0.0) {
        x_hi = 1.0;
    }
    let (mut y_lo, mut y_hi) = (0.97 * y_min, 1.03 * y_max);
    if !(y_hi > y_lo) {
        y_lo -= 0.1;
        y_hi += 0.1;
    }

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| AppError::io(format!("Failed to render profile plot: {e}")))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(0.0..x_hi, y_lo..y_hi)
        .map_err(|e| AppError::io(format!("Failed to render profile plot: {e}")))?;

    // Breakpoint markers go first so data points draw on top of them.
    for h in breakpoints(fit) {
        chart
            .draw_series(DashedLineSeries::new(
                [(h, y_lo), (h, y_hi)],
                6,
                4,
                RGBColor(128, 128, 128).stroke_width(1),
            ))
            .map_err(|e| AppError::io(format!("Failed to render profile plot: {e}")))?;
    }

    chart
        .draw_series(fit.x.iter().zip(fit.y.iter()).zip(fit.yerr.iter()).map(
            |((&x, &y), &e)| {
                ErrorBar::new_vertical(x, y - e, y, y + e, BLACK.filled(), 4)
            },
        ))
        .map_err(|e| AppError::io(format!("Failed to render profile plot: {e}")))?;

    chart
        .draw_series(
            fit.x
                .iter()
                .zip(fit.y.iter())
                .map(|(&x, &y)| Circle::new((x, y), 3, RGBColor(123, 104, 238).filled())),
        )
        .map_err(|e| AppError::io(format!("Failed to render profile plot: {e}")))?;

    let n_grid = 200;
    chart
        .draw_series(LineSeries::new(
            (0..n_grid).map(|i| {
                let x = x_hi * i as f64 / (n_grid - 1) as f64;
                (x, predict(fit.case, &fit.params, x))
            }),
            RED.stroke_width(2),
        ))
        .map_err(|e| AppError::io(format!("Failed to render profile plot: {e}")))?;

    root.present()
        .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", path.display())))?;
    Ok(())
}

fn breakpoints(fit: &ProfileFit) -> Vec<f64> {
    match fit.case {
        ModelCase::Linear => Vec::new(),
        ModelCase::OneBreak => vec![fit.params.h1],
        ModelCase::TwoBreak => vec![fit.params.h1, fit.params.h2],
    }
}
