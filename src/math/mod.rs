//! Mathematical utilities: least squares with parameter covariance.

pub mod ols;

pub use ols::*;
