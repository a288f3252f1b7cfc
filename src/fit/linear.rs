//! The flat-slope candidate: abundance regressed on radius with intercept.

use nalgebra::{DMatrix, DVector};

use crate::domain::Estimate;
use crate::math::ols_with_covariance;

/// Result of the single-slope fit.
#[derive(Debug, Clone)]
pub struct LinearFit {
    pub intercept: Estimate,
    pub slope: Estimate,
    pub rss: f64,
}

/// Ordinary least squares of `y` on `[1, x]`.
///
/// Returns `None` for degenerate inputs (fewer than 3 points or constant x).
pub fn fit_linear(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len();
    if n != y.len() || n < 3 {
        return None;
    }

    let mut rows = Vec::with_capacity(2 * n);
    for &v in x {
        rows.push(1.0);
        rows.push(v);
    }
    let design = DMatrix::from_row_slice(n, 2, &rows);
    let obs = DVector::from_column_slice(y);

    let sol = ols_with_covariance(&design, &obs)?;
    Some(LinearFit {
        intercept: Estimate {
            value: sol.beta[0],
            se: sol.se[0],
        },
        slope: Estimate {
            value: sol.beta[1],
            se: sol.se[1],
        },
        rss: sol.rss,
    })
}
