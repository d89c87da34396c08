//! Random Walk with Drift model.
//!
//! Forecasts based on the last value plus a drift term estimated from historical data.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::traits::{normal_intervals, residual_sigma};
use crate::models::Forecaster;

/// Random walk with drift forecaster.
///
/// The forecast is: y_hat\[t+h\] = y\[t\] + h * drift
/// where drift is the average change in the series.
#[derive(Debug, Clone, Default)]
pub struct RandomWalkDrift {
    last_value: Option<f64>,
    drift: Option<f64>,
    n: usize,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl RandomWalkDrift {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the estimated drift parameter.
    pub fn drift(&self) -> Option<f64> {
        self.drift
    }
}

impl Forecaster for RandomWalkDrift {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        let n = values.len();
        if n < 2 {
            return Err(ForecastError::InsufficientData { needed: 2, got: n });
        }

        let drift = (values[n - 1] - values[0]) / (n - 1) as f64;

        let mut fitted = Vec::with_capacity(n);
        fitted.push(f64::NAN);
        fitted.extend(values[..n - 1].iter().map(|y| y + drift));
        let residuals = values
            .iter()
            .zip(&fitted)
            .map(|(y, f)| y - f)
            .collect();

        self.last_value = Some(values[n - 1]);
        self.drift = Some(drift);
        self.n = n;
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let last = self.last_value.ok_or(ForecastError::FitRequired)?;
        let drift = self.drift.ok_or(ForecastError::FitRequired)?;
        let predictions = (1..=horizon).map(|h| last + h as f64 * drift).collect();
        Ok(Forecast::from_values(predictions))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let forecast = self.predict(horizon)?;
        let residuals = self.residuals.as_ref().ok_or(ForecastError::FitRequired)?;
        let sigma = residual_sigma(residuals).unwrap_or(0.0);

        // Random-walk variance plus the uncertainty of the drift estimate.
        let t = (self.n - 1) as f64;
        let se: Vec<f64> = (1..=horizon)
            .map(|h| {
                let h = h as f64;
                sigma * (h * (1.0 + h / t)).sqrt()
            })
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
        "RandomWalkDrift"
    }
}
