//! Automatic ARIMA order selection.

use tracing::debug;

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{seasonal_difference, suggest_differencing};
use crate::models::arima::model::{ARIMASpec, ARIMA};
use crate::models::Forecaster;
use crate::seasonality::STL;

/// Seasonal strength above which one seasonal difference is taken.
pub const SEASONAL_STRENGTH_THRESHOLD: f64 = 0.64;

/// Configuration for AutoARIMA.
#[derive(Debug, Clone)]
pub struct AutoARIMAConfig {
    /// Maximum AR order to consider.
    pub max_p: usize,
    /// Maximum MA order to consider.
    pub max_q: usize,
    /// Maximum regular differencing order.
    pub max_d: usize,
    /// Seasonal period (1 for non-seasonal).
    pub seasonal_period: usize,
}

impl Default for AutoARIMAConfig {
    fn default() -> Self {
        Self {
            max_p: 3,
            max_q: 3,
            max_d: 2,
            seasonal_period: 1,
        }
    }
}

impl AutoARIMAConfig {
    pub fn with_max_orders(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_d = max_d;
        self.max_q = max_q;
        self
    }

    pub fn with_seasonal_period(mut self, period: usize) -> Self {
        self.seasonal_period = period.max(1);
        self
    }
}

/// Automatic ARIMA selection.
///
/// The seasonal difference is chosen from the STL seasonal strength, the
/// regular differences by repeated KPSS tests, and the ARMA orders by AICc
/// over the full `(p, q)` grid.
#[derive(Debug, Clone)]
pub struct AutoARIMA {
    config: AutoARIMAConfig,
    selected: Option<ARIMA>,
    scores: Vec<(ARIMASpec, f64)>,
}

impl AutoARIMA {
    pub fn new() -> Self {
        Self::with_config(AutoARIMAConfig::default())
    }

    pub fn with_config(config: AutoARIMAConfig) -> Self {
        Self {
            config,
            selected: None,
            scores: Vec::new(),
        }
    }

    /// AutoARIMA for a series with the given seasonal period.
    pub fn seasonal(period: usize) -> Self {
        Self::with_config(AutoARIMAConfig::default().with_seasonal_period(period))
    }

    /// Specification of the selected model.
    pub fn selected_spec(&self) -> Option<ARIMASpec> {
        self.selected.as_ref().map(ARIMA::spec)
    }

    /// AICc of every successfully fitted candidate, best first.
    pub fn model_scores(&self) -> &[(ARIMASpec, f64)] {
        &self.scores
    }

    fn seasonal_differences(&self, values: &[f64]) -> usize {
        let period = self.config.seasonal_period;
        if period < 2 {
            return 0;
        }
        let stl = STL::new(period);
        if values.len() < stl.min_length().max(3 * period) {
            return 0;
        }
        match stl.decompose(values) {
            Ok(result) if result.seasonal_strength() > SEASONAL_STRENGTH_THRESHOLD => 1,
            _ => 0,
        }
    }

    fn model(&self) -> Result<&ARIMA> {
        self.selected.as_ref().ok_or(ForecastError::FitRequired)
    }
}

impl Default for AutoARIMA {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for AutoARIMA {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        let period = self.config.seasonal_period;
        let seasonal_d = self.seasonal_differences(values);
        let d = suggest_differencing(
            &seasonal_difference(values, seasonal_d, period),
            self.config.max_d,
        );

        let mut scores = Vec::new();
        let mut best: Option<(ARIMA, f64)> = None;
        let mut last_error = None;
        for p in 0..=self.config.max_p {
            for q in 0..=self.config.max_q {
                let spec = ARIMASpec::new(p, d, q).with_seasonal_difference(seasonal_d, period);
                let mut model = ARIMA::from_spec(spec);
                if values.len() < model.min_length() {
                    continue;
                }
                match model.fit(series) {
                    Ok(()) => {
                        let aicc = model.aicc().unwrap_or(f64::INFINITY);
                        scores.push((spec, aicc));
                        if best.as_ref().map_or(true, |(_, b)| aicc < *b) {
                            best = Some((model, aicc));
                        }
                    }
                    Err(e) => last_error = Some(e),
                }
            }
        }

        let (model, aicc) = best.ok_or_else(|| {
            last_error.unwrap_or(ForecastError::InsufficientData {
                needed: ARIMA::from_spec(
                    ARIMASpec::new(0, d, 0).with_seasonal_difference(seasonal_d, period),
                )
                .min_length(),
                got: values.len(),
            })
        })?;
        debug!(model = %model.spec(), aicc, "selected ARIMA order");

        scores.sort_by(|a, b| a.1.total_cmp(&b.1));
        self.scores = scores;
        self.selected = Some(model);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        self.model()?.predict(horizon)
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        self.model()?.predict_with_intervals(horizon, level)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.selected.as_ref().and_then(|m| m.fitted_values())
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.selected.as_ref().and_then(|m| m.residuals())
    }

    fn name(&self) -> &str {
        "AutoARIMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(i: usize) -> f64 {
        ((i as f64 * 12.9898).sin() * 43758.5453).fract() - 0.5
    }

    #[test]
    fn trending_series_is_differenced() {
        let values: Vec<f64> = (0..60).map(|i| 3.0 * i as f64 + noise(i)).collect();
        let ts = TimeSeries::new(values, 1).unwrap();
        let mut model = AutoARIMA::new();
        model.fit(&ts).unwrap();
        assert!(model.selected_spec().unwrap().d >= 1);

        let f = model.predict(5).unwrap();
        assert!(f.point()[4] > 180.0);
    }

    #[test]
    fn strong_seasonality_takes_seasonal_difference() {
        let values: Vec<f64> = (0..72)
            .map(|i| 50.0 + 10.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin() + 0.3 * noise(i))
            .collect();
        let ts = TimeSeries::new(values, 12).unwrap();
        let mut model = AutoARIMA::seasonal(12);
        model.fit(&ts).unwrap();
        assert_eq!(model.selected_spec().unwrap().seasonal_d, 1);
    }

    #[test]
    fn scores_are_sorted() {
        let values: Vec<f64> = (0..50).map(|i| (i as f64 * 0.3).sin() + noise(i)).collect();
        let ts = TimeSeries::new(values, 1).unwrap();
        let mut model = AutoARIMA::new();
        model.fit(&ts).unwrap();
        let scores = model.model_scores();
        assert!(!scores.is_empty());
        assert!(scores.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn requires_fit() {
        assert_eq!(AutoARIMA::new().predict(3), Err(ForecastError::FitRequired));
    }
}
