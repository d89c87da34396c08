//! Forecaster trait defining the common interface for all models.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::utils::stats::interval_z;

/// Common interface for all forecasting models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to the time series data.
    fn fit(&mut self, series: &TimeSeries) -> Result<()>;

    /// Generate predictions for the specified horizon.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// Generate predictions with prediction intervals.
    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let _ = level;
        self.predict(horizon)
    }

    /// Get the fitted values (in-sample predictions).
    fn fitted_values(&self) -> Option<&[f64]>;

    /// Get the residuals (actual - fitted).
    fn residuals(&self) -> Option<&[f64]>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Type alias for boxed forecaster trait objects.
///
/// # Example
///
/// ```
/// use anofox_meta::models::{BoxedForecaster, Forecaster};
/// use anofox_meta::models::baseline::Naive;
///
/// let model: BoxedForecaster = Box::new(Naive::new());
/// assert_eq!(model.name(), "Naive");
/// assert!(!model.is_fitted());
/// ```
pub type BoxedForecaster = Box<dyn Forecaster>;

/// Root mean square of the finite residuals, if there are any.
pub(crate) fn residual_sigma(residuals: &[f64]) -> Option<f64> {
    let valid: Vec<f64> = residuals.iter().copied().filter(|r| r.is_finite()).collect();
    if valid.is_empty() {
        return None;
    }
    Some((valid.iter().map(|r| r * r).sum::<f64>() / valid.len() as f64).sqrt())
}

/// Symmetric normal intervals `point ± z * se[h]`.
pub(crate) fn normal_intervals(point: Vec<f64>, se: &[f64], level: f64) -> Result<Forecast> {
    if !(level > 0.0 && level < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "interval level must be in (0, 1), got {}",
            level
        )));
    }
    let z = interval_z(level);
    let lower = point.iter().zip(se).map(|(p, s)| p - z * s).collect();
    let upper = point.iter().zip(se).map(|(p, s)| p + z * s).collect();
    Forecast::from_values_with_intervals(point, lower, upper, level)
}
