//! Piecewise-linear fitting with unknown breakpoint locations.
//!
//! Each candidate is fit by Muggeo's iterative linearization: given trial
//! breakpoints ψ we regress
//!
//! ```text
//! y ~ 1 + x + Σ_k U_k + Σ_k V_k,   U_k = max(x − ψ_k, 0),  V_k = −1{x > ψ_k}
//! ```
//!
//! and move each ψ_k by γ_k/β_k (the V over U coefficient ratio) until the
//! step vanishes. The linearization only finds a local optimum, so the fit is
//! restarted from bootstrap-resampled starting points and the best-scoring
//! converged restart is kept.
//!
//! Restarts are independent tasks evaluated in parallel; the winner is the
//! minimum (rss, restart index) pair, so the reported optimum does not depend
//! on restart execution order.

use nalgebra::{DMatrix, DVector};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::{BrokenFit, Estimate};
use crate::math::{OlsSolution, ols_with_covariance, solve_least_squares};

/// Iteration cap for one Muggeo refinement.
const MAX_ITER: usize = 30;

/// Breakpoints may not sit closer to a data edge than this fraction of the
/// radius range.
const EDGE_FRACTION: f64 = 0.05;

/// Two breakpoints may not sit closer together than this fraction of the
/// radius range.
const SEPARATION_FRACTION: f64 = 0.20;

/// Configuration of one breakpoint candidate.
#[derive(Debug, Clone)]
pub struct BreakpointConfig {
    pub n_breakpoints: usize,
    /// Bootstrap restarts on top of the direct fit.
    pub n_boot: usize,
    pub seed: u64,
    /// Fixed starting guesses in radius units; quantile-based defaults when
    /// absent.
    pub start_values: Option<Vec<f64>>,
}

/// A converged Muggeo refinement before validation.
struct RawFit {
    psis: Vec<f64>,
    sol: OlsSolution,
}

/// Fit a piecewise-linear model with `config.n_breakpoints` breakpoints.
///
/// Never fails: when no restart converges to a valid optimum the returned
/// fit has `converged = false` and carries no usable parameters, which the
/// selector turns into the rss penalty.
pub fn fit_breakpoints(x: &[f64], y: &[f64], config: &BreakpointConfig) -> BrokenFit {
    let k = config.n_breakpoints;
    let n = x.len();

    let not_converged = BrokenFit {
        intercept: Estimate::default(),
        alphas: vec![Estimate::default(); k + 1],
        breakpoints: vec![Estimate::default(); k],
        rss: f64::NAN,
        converged: false,
    };

    // Need residual degrees of freedom for the 2+2k column design.
    if k == 0 || n < 2 * k + 3 || n != y.len() {
        return not_converged;
    }

    let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = x_max - x_min;
    if !(range.is_finite() && range > 0.0) {
        return not_converged;
    }

    let lo = x_min + EDGE_FRACTION * range;
    let hi = x_max - EDGE_FRACTION * range;
    let min_sep = SEPARATION_FRACTION * range;

    let default_start = match &config.start_values {
        Some(values) if values.len() == k => values.clone(),
        _ => quantile_starts(x, k),
    };

    // Restart 0 is the direct fit; restarts 1..=n_boot perturb the starting
    // point by fitting a bootstrap resample first.
    let best = (0..=config.n_boot)
        .into_par_iter()
        .filter_map(|restart| {
            let starts = if restart == 0 {
                default_start.clone()
            } else {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(restart as u64));
                bootstrap_starts(x, y, &default_start, lo, hi, min_sep, &mut rng)
            };

            let fit = muggeo_converge(x, y, &starts, x_min, x_max)?;
            if !breakpoints_valid(&fit.psis, lo, hi, min_sep) {
                return None;
            }
            if !fit.sol.rss.is_finite() {
                return None;
            }
            Some((restart, fit))
        })
        .min_by(|(ia, fa), (ib, fb)| {
            fa.sol
                .rss
                .partial_cmp(&fb.sol.rss)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(ia.cmp(ib))
        });

    match best {
        Some((_, fit)) => finalize(&fit, k),
        None => not_converged,
    }
}

/// One full Muggeo refinement from the given starting breakpoints.
///
/// Fails when the design becomes singular, a hinge coefficient degenerates,
/// a breakpoint leaves the data range, or the iteration cap is reached.
fn muggeo_converge(x: &[f64], y: &[f64], starts: &[f64], x_min: f64, x_max: f64) -> Option<RawFit> {
    let k = starts.len();
    let tol = 1e-8 * (x_max - x_min);

    let mut psis = starts.to_vec();
    psis.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if psis.iter().any(|&p| !(x_min < p && p < x_max)) {
        return None;
    }

    let obs = DVector::from_column_slice(y);

    for _ in 0..MAX_ITER {
        let design = build_design(x, &psis);
        let beta = solve_least_squares(&design, &obs)?;

        let mut max_step = 0.0f64;
        for j in 0..k {
            let b = beta[2 + j];
            let g = beta[2 + k + j];
            if b.abs() < 1e-12 {
                return None;
            }
            let step = g / b;
            psis[j] += step;
            max_step = max_step.max(step.abs());
        }

        psis.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if psis.iter().any(|&p| !(x_min < p && p < x_max)) {
            return None;
        }

        if max_step <= tol {
            let design = build_design(x, &psis);
            let sol = ols_with_covariance(&design, &obs)?;
            return Some(RawFit { psis, sol });
        }
    }

    None
}

/// The Muggeo design matrix: `[1, x, U_1.., V_1..]`.
fn build_design(x: &[f64], psis: &[f64]) -> DMatrix<f64> {
    let k = psis.len();
    let n = x.len();
    let mut m = DMatrix::<f64>::zeros(n, 2 + 2 * k);
    for i in 0..n {
        m[(i, 0)] = 1.0;
        m[(i, 1)] = x[i];
        for (j, &psi) in psis.iter().enumerate() {
            m[(i, 2 + j)] = (x[i] - psi).max(0.0);
            m[(i, 2 + k + j)] = if x[i] > psi { -1.0 } else { 0.0 };
        }
    }
    m
}

fn breakpoints_valid(psis: &[f64], lo: f64, hi: f64, min_sep: f64) -> bool {
    if psis.iter().any(|&p| p < lo || p > hi) {
        return false;
    }
    psis.windows(2).all(|w| w[1] - w[0] >= min_sep)
}

/// Evenly spread quantile starting points.
fn quantile_starts(x: &[f64], k: usize) -> Vec<f64> {
    let mut sorted = x.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    (1..=k)
        .map(|j| {
            let q = j as f64 / (k + 1) as f64;
            let idx = ((sorted.len() - 1) as f64 * q).round() as usize;
            sorted[idx]
        })
        .collect()
}

/// Derive restart starting points from a fit to a bootstrap resample.
///
/// When the pilot fit fails, fall back to a random draw inside the allowed
/// breakpoint interval.
fn bootstrap_starts(
    x: &[f64],
    y: &[f64],
    default_start: &[f64],
    lo: f64,
    hi: f64,
    min_sep: f64,
    rng: &mut StdRng,
) -> Vec<f64> {
    let n = x.len();
    let k = default_start.len();

    let mut xb = Vec::with_capacity(n);
    let mut yb = Vec::with_capacity(n);
    for _ in 0..n {
        let i = rng.gen_range(0..n);
        xb.push(x[i]);
        yb.push(y[i]);
    }

    let xb_min = xb.iter().copied().fold(f64::INFINITY, f64::min);
    let xb_max = xb.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if xb_max > xb_min {
        if let Some(pilot) = muggeo_converge(&xb, &yb, default_start, xb_min, xb_max) {
            if pilot.psis.iter().all(|&p| lo < p && p < hi) {
                return pilot.psis;
            }
        }
    }

    random_starts(k, lo, hi, min_sep, rng)
}

fn random_starts(k: usize, lo: f64, hi: f64, min_sep: f64, rng: &mut StdRng) -> Vec<f64> {
    for _ in 0..20 {
        let mut draw: Vec<f64> = (0..k).map(|_| rng.gen_range(lo..hi)).collect();
        draw.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        if draw.windows(2).all(|w| w[1] - w[0] >= min_sep) {
            return draw;
        }
    }
    // Evenly spaced fallback keeps the restart usable even in narrow ranges.
    (1..=k)
        .map(|j| lo + (hi - lo) * j as f64 / (k + 1) as f64)
        .collect()
}

/// Turn the winning refinement into reported estimates.
///
/// Segment slopes accumulate the hinge coefficients; their variances come
/// from the full covariance of the involved coefficients. Breakpoint
/// standard errors use the delta method on γ/β (γ ≈ 0 at convergence).
fn finalize(fit: &RawFit, k: usize) -> BrokenFit {
    let beta = &fit.sol.beta;
    let cov = &fit.sol.cov;

    let intercept = Estimate {
        value: beta[0],
        se: fit.sol.se[0],
    };

    let mut alphas = Vec::with_capacity(k + 1);
    for j in 0..=k {
        // Coefficient indices contributing to segment slope j.
        let mut idx = vec![1usize];
        idx.extend((0..j).map(|i| 2 + i));

        let value = idx.iter().map(|&p| beta[p]).sum::<f64>();
        let mut var = 0.0;
        for &p in &idx {
            for &q in &idx {
                var += cov[(p, q)];
            }
        }
        alphas.push(Estimate {
            value,
            se: var.max(0.0).sqrt(),
        });
    }

    let mut breakpoints = Vec::with_capacity(k);
    for j in 0..k {
        let b = beta[2 + j];
        let g = beta[2 + k + j];
        let ratio = g / b;
        let var_b = cov[(2 + j, 2 + j)];
        let var_g = cov[(2 + k + j, 2 + k + j)];
        let cov_gb = cov[(2 + k + j, 2 + j)];
        let var = (var_g + ratio * ratio * var_b - 2.0 * ratio * cov_gb) / (b * b);
        breakpoints.push(Estimate {
            value: fit.psis[j],
            se: var.max(0.0).sqrt(),
        });
    }

    BrokenFit {
        intercept,
        alphas,
        breakpoints,
        rss: fit.sol.rss,
        converged: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_segment_data(n: usize, h: f64, noise: f64, seed: u64) -> (Vec<f64>, Vec<f64>) {
        use rand_distr::{Distribution, Normal};
        let normal = Normal::new(0.0, noise.max(1e-12)).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);

        let x: Vec<f64> = (0..n).map(|i| 3.0 * i as f64 / (n - 1) as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&v| {
                let base = 8.8 - 0.35 * v + 0.45 * (v - h).max(0.0);
                if noise > 0.0 { base + normal.sample(&mut rng) } else { base }
            })
            .collect();
        (x, y)
    }

    fn config(k: usize, n_boot: usize) -> BreakpointConfig {
        BreakpointConfig {
            n_breakpoints: k,
            n_boot,
            seed: 42,
            start_values: None,
        }
    }

    #[test]
    fn recovers_known_breakpoint_on_clean_data() {
        let (x, y) = two_segment_data(50, 1.4, 0.0, 1);
        let fit = fit_breakpoints(&x, &y, &config(1, 10));

        assert!(fit.converged);
        assert!((fit.breakpoints[0].value - 1.4).abs() < 0.05, "h={}", fit.breakpoints[0].value);
        assert!((fit.alphas[0].value + 0.35).abs() < 1e-6);
        assert!((fit.alphas[1].value - 0.10).abs() < 1e-6);
        assert!((fit.intercept.value - 8.8).abs() < 1e-6);
        assert!(fit.rss < 1e-12);
    }

    #[test]
    fn recovers_breakpoint_under_noise() {
        let (x, y) = two_segment_data(80, 1.5, 0.01, 7);
        let fit = fit_breakpoints(&x, &y, &config(1, 30));

        assert!(fit.converged);
        assert!((fit.breakpoints[0].value - 1.5).abs() < 0.1);
        assert!(fit.breakpoints[0].se.is_finite());
        assert!(fit.alphas[0].se > 0.0);
    }

    #[test]
    fn recovers_two_breakpoints() {
        let x: Vec<f64> = (0..90).map(|i| 3.0 * i as f64 / 89.0).collect();
        let y: Vec<f64> = x
            .iter()
            .map(|&v| {
                8.9 - 0.5 * v + 0.6 * (v - 0.8f64).max(0.0) - 0.7 * (v - 2.0f64).max(0.0)
            })
            .collect();

        let fit = fit_breakpoints(
            &x,
            &y,
            &BreakpointConfig {
                n_breakpoints: 2,
                n_boot: 30,
                seed: 42,
                start_values: Some(vec![0.5, 1.5]),
            },
        );

        assert!(fit.converged);
        assert!((fit.breakpoints[0].value - 0.8).abs() < 0.1);
        assert!((fit.breakpoints[1].value - 2.0).abs() < 0.1);
        assert!((fit.alphas[2].value + 0.6).abs() < 1e-6);
    }

    #[test]
    fn restart_result_is_thread_count_independent() {
        let (x, y) = two_segment_data(60, 1.2, 0.02, 3);
        let cfg = config(1, 40);

        let serial = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(|| fit_breakpoints(&x, &y, &cfg));
        let parallel = fit_breakpoints(&x, &y, &cfg);

        assert_eq!(serial.converged, parallel.converged);
        assert_eq!(serial.rss, parallel.rss);
        assert_eq!(serial.breakpoints[0].value, parallel.breakpoints[0].value);
    }

    #[test]
    fn degenerate_data_reports_non_convergence() {
        // Straight line: hinge coefficient collapses, no valid breakpoint.
        let x: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|&v| 8.7 - 0.2 * v).collect();

        let fit = fit_breakpoints(&x, &y, &config(1, 5));
        assert!(!fit.converged);
        assert!(fit.rss.is_nan());
    }

    #[test]
    fn too_few_points_report_non_convergence() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [8.0, 8.1, 8.2, 8.3];
        let fit = fit_breakpoints(&x, &y, &config(2, 5));
        assert!(!fit.converged);
    }
}
