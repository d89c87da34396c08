//! Seasonal Naive forecasting model.
//!
//! Forecasts by repeating the value from the same season in the previous cycle.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::traits::{normal_intervals, residual_sigma};
use crate::models::Forecaster;

/// Seasonal Naive forecaster.
///
/// Each forecast is equal to the observation from the same season in the
/// last observed cycle. With period 1 this is the naive method.
#[derive(Debug, Clone)]
pub struct SeasonalNaive {
    period: usize,
    last_cycle: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl SeasonalNaive {
    /// Create a new SeasonalNaive model with the given seasonal period.
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            last_cycle: None,
            fitted: None,
            residuals: None,
        }
    }

    /// Get the seasonal period.
    pub fn period(&self) -> usize {
        self.period
    }
}

impl Default for SeasonalNaive {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Forecaster for SeasonalNaive {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        let p = self.period;
        if values.len() < p {
            return Err(ForecastError::InsufficientData {
                needed: p,
                got: values.len(),
            });
        }

        // y_hat[t] = y[t - period]
        let fitted: Vec<f64> = (0..values.len())
            .map(|i| if i < p { f64::NAN } else { values[i - p] })
            .collect();
        let residuals = values
            .iter()
            .zip(&fitted)
            .map(|(y, f)| y - f)
            .collect();

        self.last_cycle = Some(values[values.len() - p..].to_vec());
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let cycle = self.last_cycle.as_ref().ok_or(ForecastError::FitRequired)?;
        let predictions = (0..horizon).map(|h| cycle[h % self.period]).collect();
        Ok(Forecast::from_values(predictions))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let forecast = self.predict(horizon)?;
        let residuals = self.residuals.as_ref().ok_or(ForecastError::FitRequired)?;
        let sigma = residual_sigma(residuals).unwrap_or(0.0);

        // Variance grows with the number of completed cycles ahead.
        let se: Vec<f64> = (0..horizon)
            .map(|h| sigma * ((h / self.period + 1) as f64).sqrt())
            .collect();
        normal_intervals(forecast.point().to_vec(), &se, level)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "SeasonalNaive"
    }
}
