//! Naive2: the naive method applied to a seasonally adjusted series.
//!
//! The series is adjusted with a classical multiplicative decomposition when
//! a 90% autocorrelation test finds seasonality, otherwise it is left as is.
//! This is the benchmark against which OWA is measured.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::traits::{normal_intervals, residual_sigma};
use crate::models::Forecaster;
use crate::seasonality::{
    classical_decompose, seasonality_test, ClassicalDecomposition, DecompositionType,
};

/// Seasonally adjusted naive forecaster.
#[derive(Debug, Clone)]
pub struct Naive2 {
    period: usize,
    decomposition: Option<ClassicalDecomposition>,
    last_adjusted: Option<f64>,
    n: usize,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl Naive2 {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            decomposition: None,
            last_adjusted: None,
            n: 0,
            fitted: None,
            residuals: None,
        }
    }

    /// Whether the fitted series was found seasonal.
    pub fn is_seasonal(&self) -> bool {
        self.decomposition.is_some()
    }
}

impl Forecaster for Naive2 {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        let n = values.len();
        if n == 0 {
            return Err(ForecastError::EmptyData);
        }

        let positive = values.iter().all(|&y| y > 0.0);
        self.decomposition = if positive && seasonality_test(values, self.period) {
            classical_decompose(values, self.period, DecompositionType::Multiplicative).ok()
        } else {
            None
        };

        let adjusted = match &self.decomposition {
            Some(d) => d.adjust(values),
            None => values.to_vec(),
        };

        let mut fitted_adjusted = Vec::with_capacity(n);
        fitted_adjusted.push(f64::NAN);
        fitted_adjusted.extend_from_slice(&adjusted[..n - 1]);
        let fitted = match &self.decomposition {
            Some(d) => d.reseasonalize(&fitted_adjusted, 0),
            None => fitted_adjusted,
        };
        let residuals = values.iter().zip(&fitted).map(|(y, f)| y - f).collect();

        self.last_adjusted = Some(adjusted[n - 1]);
        self.n = n;
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let last = self.last_adjusted.ok_or(ForecastError::FitRequired)?;
        let flat = vec![last; horizon];
        let predictions = match &self.decomposition {
            Some(d) => d.reseasonalize(&flat, self.n),
            None => flat,
        };
        Ok(Forecast::from_values(predictions))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let forecast = self.predict(horizon)?;
        let residuals = self.residuals.as_ref().ok_or(ForecastError::FitRequired)?;
        let sigma = residual_sigma(residuals).unwrap_or(0.0);
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
        "Naive2"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn multiplicative(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 * (1.0 + 0.4 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin()))
            .collect()
    }

    #[test]
    fn seasonal_series_is_reseasonalized() {
        let ts = TimeSeries::new(multiplicative(60), 12).unwrap();
        let mut model = Naive2::new(12);
        model.fit(&ts).unwrap();
        assert!(model.is_seasonal());

        let f = model.predict(12).unwrap();
        // Repeats the seasonal shape of a level series.
        for (h, &v) in f.point().iter().enumerate() {
            assert_relative_eq!(v, multiplicative(72)[60 + h], max_relative = 0.05);
        }
    }

    #[test]
    fn non_seasonal_series_matches_naive() {
        let values: Vec<f64> = (0..30).map(|i| 5.0 + i as f64).collect();
        let ts = TimeSeries::new(values, 12).unwrap();
        let mut model = Naive2::new(12);
        model.fit(&ts).unwrap();
        assert!(!model.is_seasonal());
        assert_eq!(model.predict(2).unwrap().point(), &[34.0, 34.0]);
    }

    #[test]
    fn non_positive_series_skips_adjustment() {
        let values: Vec<f64> = multiplicative(48).iter().map(|v| v - 100.0).collect();
        let ts = TimeSeries::new(values, 12).unwrap();
        let mut model = Naive2::new(12);
        model.fit(&ts).unwrap();
        assert!(!model.is_seasonal());
    }
}
