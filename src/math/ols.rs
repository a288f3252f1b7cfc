//! Ordinary least squares with parameter covariance.
//!
//! Both the single-slope candidate and every Muggeo iteration of the
//! breakpoint candidates reduce to a small linear regression
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! whose parameter covariance we need for the reported standard errors.
//!
//! Implementation choices:
//! - SVD solve for β, robust even when the design matrix is tall or the
//!   hinge columns are nearly collinear (breakpoints close to a data edge).
//! - Covariance from `(XᵀX)⁻¹ · rss/(n−p)`; if the normal matrix is singular
//!   the whole solution is rejected rather than returning garbage errors.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// A solved regression with the diagnostics the fit layer needs.
#[derive(Debug, Clone)]
pub struct OlsSolution {
    pub beta: DVector<f64>,
    /// Standard error per coefficient.
    pub se: DVector<f64>,
    /// Parameter covariance matrix, `(XᵀX)⁻¹ σ̂²`.
    pub cov: DMatrix<f64>,
    /// Residual sum of squares.
    pub rss: f64,
}

/// Solve an OLS problem and derive the parameter covariance.
///
/// Returns `None` when the solve fails, the normal matrix is singular, or
/// there are no residual degrees of freedom (`n <= p`).
pub fn ols_with_covariance(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<OlsSolution> {
    let n = x.nrows();
    let p = x.ncols();
    if n <= p {
        return None;
    }

    let beta = solve_least_squares(x, y)?;

    let fitted = x * &beta;
    let mut rss = 0.0;
    for i in 0..n {
        let r = y[i] - fitted[i];
        rss += r * r;
    }
    if !rss.is_finite() {
        return None;
    }

    let sigma2 = rss / (n - p) as f64;
    let xtx = x.transpose() * x;
    let cov = xtx.try_inverse()? * sigma2;

    let se = DVector::from_iterator(p, (0..p).map(|j| cov[(j, j)].max(0.0).sqrt()));
    if se.iter().any(|v| !v.is_finite()) {
        return None;
    }

    Some(OlsSolution { beta, se, cov, rss })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn covariance_on_exact_data_gives_zero_errors() {
        // Four exact points on y = 1 + 2x: rss = 0, so every se must be 0.
        let xs = [0.0, 1.0, 2.0, 3.0];
        let mut rows = Vec::new();
        for &v in &xs {
            rows.push(1.0);
            rows.push(v);
        }
        let x = DMatrix::from_row_slice(4, 2, &rows);
        let y = DVector::from_iterator(4, xs.iter().map(|&v| 1.0 + 2.0 * v));

        let sol = ols_with_covariance(&x, &y).unwrap();
        assert!((sol.beta[0] - 1.0).abs() < 1e-10);
        assert!((sol.beta[1] - 2.0).abs() < 1e-10);
        assert!(sol.rss.abs() < 1e-18);
        assert!(sol.se[0].abs() < 1e-9);
        assert!(sol.se[1].abs() < 1e-9);
    }

    #[test]
    fn covariance_requires_residual_dof() {
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 1.0]);
        let y = DVector::from_row_slice(&[0.0, 1.0]);
        assert!(ols_with_covariance(&x, &y).is_none());
    }
}
