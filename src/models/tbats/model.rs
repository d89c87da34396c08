//! TBATS model implementation.
//!
//! - Box-Cox transformation with Guerrero's lambda (positive data only)
//! - Trigonometric (Fourier) seasonal representation, harmonics chosen by AIC
//! - Damped-trend exponential smoothing of the seasonally adjusted series

use std::f64::consts::PI;

use tracing::debug;

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::exponential::{ETSSpec, ETS};
use crate::models::Forecaster;
use crate::transform::boxcox::{boxcox, inv_boxcox_value, select_lambda, LambdaMethod};
use crate::utils::ols::{dot, least_squares, residuals};

/// Upper bound on the number of Fourier harmonics.
pub const MAX_HARMONICS: usize = 5;

/// TBATS forecasting model.
///
/// # Example
/// ```
/// use anofox_meta::core::TimeSeries;
/// use anofox_meta::models::tbats::TBATS;
/// use anofox_meta::models::Forecaster;
///
/// let values: Vec<f64> = (0..96)
///     .map(|i| 50.0 + 0.2 * i as f64 + 10.0 * (2.0 * std::f64::consts::PI * i as f64 / 24.0).sin())
///     .collect();
/// let ts = TimeSeries::new(values, 24).unwrap();
///
/// let mut model = TBATS::new(24);
/// model.fit(&ts).unwrap();
/// let forecast = model.predict(24).unwrap();
/// assert_eq!(forecast.horizon(), 24);
/// ```
#[derive(Debug, Clone)]
pub struct TBATS {
    seasonal_period: usize,
    /// Box-Cox lambda (None = no transformation).
    lambda: Option<f64>,
    /// Number of harmonics (0 = no seasonal component).
    harmonics: usize,
    /// Fourier coefficients, `[cos_1, sin_1, cos_2, sin_2, ...]`.
    fourier: Vec<f64>,
    trend_model: Option<ETS>,
    n: usize,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl TBATS {
    pub fn new(seasonal_period: usize) -> Self {
        Self {
            seasonal_period: seasonal_period.max(1),
            lambda: None,
            harmonics: 0,
            fourier: Vec::new(),
            trend_model: None,
            n: 0,
            fitted: None,
            residuals: None,
        }
    }

    /// Box-Cox lambda, if a transform was applied.
    pub fn lambda(&self) -> Option<f64> {
        self.lambda
    }

    /// Selected number of harmonics.
    pub fn harmonics(&self) -> usize {
        self.harmonics
    }

    fn max_harmonics(&self) -> usize {
        ((self.seasonal_period - 1) / 2).clamp(1, MAX_HARMONICS)
    }

    fn fourier_terms(&self, t: usize, k: usize) -> Vec<f64> {
        let m = self.seasonal_period as f64;
        (1..=k)
            .flat_map(|j| {
                let angle = 2.0 * PI * j as f64 * t as f64 / m;
                [angle.cos(), angle.sin()]
            })
            .collect()
    }

    fn seasonal_at(&self, t: usize) -> f64 {
        if self.harmonics == 0 {
            return 0.0;
        }
        dot(&self.fourier_terms(t, self.harmonics), &self.fourier)
    }

    /// Regress on intercept, time and `k` harmonics; returns the Fourier
    /// coefficients and the AIC.
    fn fit_harmonics(&self, y: &[f64], k: usize) -> Result<(Vec<f64>, f64)> {
        let rows: Vec<Vec<f64>> = (0..y.len())
            .map(|t| {
                let mut row = vec![1.0, t as f64];
                row.extend(self.fourier_terms(t, k));
                row
            })
            .collect();
        let beta = least_squares(&rows, y)?;
        let rss: f64 = residuals(&rows, y, &beta).iter().map(|r| r * r).sum();
        let n = y.len() as f64;
        let params = (2 * k + 2) as f64;
        let aic = n * (rss / n).max(f64::MIN_POSITIVE).ln() + 2.0 * params;
        Ok((beta[2..].to_vec(), aic))
    }

    fn inverse(&self, value: f64) -> f64 {
        match self.lambda {
            Some(lambda) => inv_boxcox_value(value, lambda),
            None => value,
        }
    }

    fn forecast_transformed(&self, base: Forecast) -> Result<Forecast> {
        let shift = |values: &[f64]| -> Vec<f64> {
            values
                .iter()
                .enumerate()
                .map(|(h, v)| self.inverse(v + self.seasonal_at(self.n + h)))
                .collect()
        };
        let point = shift(base.point());
        match (base.lower(), base.upper(), base.level()) {
            (Some(lower), Some(upper), Some(level)) => {
                Forecast::from_values_with_intervals(point, shift(lower), shift(upper), level)
            }
            _ => Ok(Forecast::from_values(point)),
        }
    }
}

impl Forecaster for TBATS {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        let n = values.len();
        let m = self.seasonal_period;

        self.lambda = select_lambda(values, m, LambdaMethod::Guerrero);
        let y = match self.lambda {
            Some(lambda) => boxcox(values, lambda),
            None => values.to_vec(),
        };

        self.harmonics = 0;
        self.fourier = Vec::new();
        if m > 1 && n >= 2 * m {
            let mut best: Option<(usize, Vec<f64>, f64)> = None;
            for k in 1..=self.max_harmonics() {
                let (coef, aic) = self.fit_harmonics(&y, k)?;
                if best.as_ref().map_or(true, |b| aic < b.2) {
                    best = Some((k, coef, aic));
                }
            }
            if let Some((k, coef, _)) = best {
                self.harmonics = k;
                self.fourier = coef;
            }
        }

        let adjusted: Vec<f64> = y
            .iter()
            .enumerate()
            .map(|(t, v)| v - self.seasonal_at(t))
            .collect();
        let mut trend_model = ETS::new(ETSSpec::aadn(), 1);
        trend_model.fit(&TimeSeries::new(adjusted, 1)?)?;

        let fitted: Vec<f64> = trend_model
            .fitted_values()
            .ok_or(ForecastError::FitRequired)?
            .iter()
            .enumerate()
            .map(|(t, f)| self.inverse(f + self.seasonal_at(t)))
            .collect();
        let residuals = values.iter().zip(&fitted).map(|(y, f)| y - f).collect();

        debug!(
            lambda = ?self.lambda,
            harmonics = self.harmonics,
            "fitted TBATS"
        );
        self.trend_model = Some(trend_model);
        self.n = n;
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let model = self.trend_model.as_ref().ok_or(ForecastError::FitRequired)?;
        self.forecast_transformed(model.predict(horizon)?)
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let model = self.trend_model.as_ref().ok_or(ForecastError::FitRequired)?;
        self.forecast_transformed(model.predict_with_intervals(horizon, level)?)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "TBATS"
    }
}
