//! Utility functions for forecasting models.

pub mod metrics;
pub mod ols;
pub mod optimization;
pub mod stats;

pub use metrics::{mae, mase, mse, owa, smape};
pub use ols::least_squares;
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{interval_z, quantile_normal};
