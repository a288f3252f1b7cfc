//! Radial-profile regression: the three competing model shapes and their
//! information-criterion competition.

pub mod breakpoint;
pub mod linear;
pub mod selection;

pub use selection::select_model;

use crate::domain::{GradientParams, ModelCase};

/// Evaluate the winning model at radius `r`.
///
/// The piecewise shapes are continuous: each later segment adds a hinge term
/// `(slope_change) · max(r − h, 0)` on top of the inner segment.
pub fn predict(case: ModelCase, params: &GradientParams, r: f64) -> f64 {
    match case {
        ModelCase::Linear => params.b0 + params.a1 * r,
        ModelCase::OneBreak => {
            params.b0 + params.a1 * r + (params.a2 - params.a1) * (r - params.h1).max(0.0)
        }
        ModelCase::TwoBreak => {
            params.b0
                + params.a1 * r
                + (params.a2 - params.a1) * (r - params.h1).max(0.0)
                + (params.a3 - params.a2) * (r - params.h2).max(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piecewise_prediction_is_continuous_at_breakpoints() {
        let params = GradientParams {
            b0: 8.8,
            a1: -0.3,
            h1: 1.0,
            a2: 0.1,
            h2: 2.0,
            a3: -0.5,
            ..Default::default()
        };

        for case in [ModelCase::OneBreak, ModelCase::TwoBreak] {
            for h in [params.h1, params.h2] {
                let below = predict(case, &params, h - 1e-9);
                let above = predict(case, &params, h + 1e-9);
                assert!((below - above).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn one_break_slopes_apply_per_segment() {
        let params = GradientParams {
            b0: 8.8,
            a1: -0.3,
            h1: 1.0,
            a2: 0.1,
            ..Default::default()
        };

        let inner = predict(ModelCase::OneBreak, &params, 0.5);
        assert!((inner - (8.8 - 0.3 * 0.5)).abs() < 1e-12);

        // Past the breakpoint the outer slope takes over.
        let at_break = predict(ModelCase::OneBreak, &params, 1.0);
        let outer = predict(ModelCase::OneBreak, &params, 1.5);
        assert!((outer - (at_break + 0.1 * 0.5)).abs() < 1e-12);
    }
}
