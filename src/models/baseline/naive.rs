//! Naive forecasting model.
//!
//! The naive method simply forecasts the last observed value for all future periods.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::traits::{normal_intervals, residual_sigma};
use crate::models::Forecaster;

/// Naive forecaster that repeats the last value.
#[derive(Debug, Clone, Default)]
pub struct Naive {
    last_value: Option<f64>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl Naive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Forecaster for Naive {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        let last = *values.last().ok_or(ForecastError::EmptyData)?;
        self.last_value = Some(last);

        // y_hat[t] = y[t-1]
        let mut fitted = Vec::with_capacity(values.len());
        fitted.push(f64::NAN);
        fitted.extend_from_slice(&values[..values.len() - 1]);

        let residuals = values
            .iter()
            .zip(&fitted)
            .map(|(y, f)| y - f)
            .collect();

        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let last = self.last_value.ok_or(ForecastError::FitRequired)?;
        Ok(Forecast::from_values(vec![last; horizon]))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let forecast = self.predict(horizon)?;
        let residuals = self.residuals.as_ref().ok_or(ForecastError::FitRequired)?;
        let sigma = residual_sigma(residuals).unwrap_or(0.0);

        // Interval widens with sqrt(horizon)
        let se: Vec<f64> = (1..=horizon).map(|h| sigma * (h as f64).sqrt()).collect();
        normal_intervals(forecast.point().to_vec(), &se, level)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "Naive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn naive_repeats_last_value() {
        let ts = TimeSeries::new(vec![1.0, 2.0, 3.0, 4.0, 5.0], 1).unwrap();
        let mut model = Naive::new();
        model.fit(&ts).unwrap();
        assert_eq!(model.predict(3).unwrap().point(), &[5.0, 5.0, 5.0]);
    }

    #[test]
    fn naive_fitted_values_are_shifted_history() {
        let ts = TimeSeries::new(vec![1.0, 3.0, 6.0, 10.0, 15.0], 1).unwrap();
        let mut model = Naive::new();
        model.fit(&ts).unwrap();

        let fitted = model.fitted_values().unwrap();
        assert!(fitted[0].is_nan());
        assert_eq!(&fitted[1..], &[1.0, 3.0, 6.0, 10.0]);
        assert_eq!(&model.residuals().unwrap()[1..], &[2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn naive_intervals_widen() {
        let ts = TimeSeries::new(vec![1.0, 2.0, 1.0, 2.0, 1.0], 1).unwrap();
        let mut model = Naive::new();
        model.fit(&ts).unwrap();

        let f = model.predict_with_intervals(4, 0.95).unwrap();
        let width = |h: usize| f.upper().unwrap()[h] - f.lower().unwrap()[h];
        assert_relative_eq!(width(3), 2.0 * width(0), epsilon = 1e-10);
    }

    #[test]
    fn naive_requires_fit() {
        assert_eq!(Naive::new().predict(1), Err(ForecastError::FitRequired));
    }
}
