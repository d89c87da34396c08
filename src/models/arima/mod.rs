//! ARIMA models with automatic differencing and order selection.

mod auto;
mod diff;
mod model;

pub use auto::{AutoARIMA, AutoARIMAConfig, SEASONAL_STRENGTH_THRESHOLD};
pub use diff::{
    difference, kpss_statistic, seasonal_difference, suggest_differencing, DifferenceStack,
};
pub use model::{ARIMASpec, ARIMA};
