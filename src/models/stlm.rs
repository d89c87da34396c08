//! STLM forecaster - STL decomposition followed by an autoregression.
//!
//! The series is seasonally adjusted with STL, an AR(p) model chosen by AIC
//! forecasts the adjusted series, and the last seasonal cycle is repeated and
//! added back.

use tracing::debug;

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::traits::{normal_intervals, residual_sigma};
use crate::models::Forecaster;
use crate::seasonality::STL;
use crate::utils::ols::{dot, least_squares, residuals};

/// Largest autoregressive order considered.
pub const MAX_AR_ORDER: usize = 5;

/// STL + AR forecaster.
///
/// # Example
/// ```
/// use anofox_meta::core::TimeSeries;
/// use anofox_meta::models::stlm::STLM;
/// use anofox_meta::models::Forecaster;
///
/// let values: Vec<f64> = (0..72)
///     .map(|i| 50.0 + 0.1 * i as f64 + 5.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin())
///     .collect();
/// let ts = TimeSeries::new(values, 12).unwrap();
///
/// let mut model = STLM::new(12);
/// model.fit(&ts).unwrap();
/// assert_eq!(model.predict(12).unwrap().horizon(), 12);
/// ```
#[derive(Debug, Clone)]
pub struct STLM {
    seasonal_period: usize,
    /// Last seasonal cycle, empty when no decomposition was used.
    seasonal_cycle: Vec<f64>,
    /// `[intercept, phi_1, ..., phi_p]`.
    ar: Vec<f64>,
    adjusted: Option<Vec<f64>>,
    sigma: Option<f64>,
    n: usize,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl STLM {
    pub fn new(seasonal_period: usize) -> Self {
        Self {
            seasonal_period: seasonal_period.max(1),
            seasonal_cycle: Vec::new(),
            ar: Vec::new(),
            adjusted: None,
            sigma: None,
            n: 0,
            fitted: None,
            residuals: None,
        }
    }

    /// Selected AR order.
    pub fn ar_order(&self) -> usize {
        self.ar.len().saturating_sub(1)
    }

    /// Whether a seasonal component was removed.
    pub fn is_seasonal(&self) -> bool {
        !self.seasonal_cycle.is_empty()
    }

    fn design(series: &[f64], p: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let rows = (p..series.len())
            .map(|t| {
                let mut row = Vec::with_capacity(p + 1);
                row.push(1.0);
                row.extend((1..=p).map(|i| series[t - i]));
                row
            })
            .collect();
        (rows, series[p..].to_vec())
    }

    /// AR(p) coefficients with the lowest AIC, estimated on a common sample.
    fn select_ar(series: &[f64]) -> Result<Vec<f64>> {
        let max_p = MAX_AR_ORDER.min(series.len().saturating_sub(3) / 2);
        let mut best: Option<(Vec<f64>, f64)> = None;
        for p in 0..=max_p {
            let (rows, y) = Self::design(&series[max_p - p..], p);
            let beta = least_squares(&rows, &y)?;
            let rss: f64 = residuals(&rows, &y, &beta).iter().map(|r| r * r).sum();
            let n = y.len() as f64;
            let aic = n * (rss / n).max(f64::MIN_POSITIVE).ln() + 2.0 * (p + 1) as f64;
            if best.as_ref().map_or(true, |b| aic < b.1) {
                best = Some((beta, aic));
            }
        }
        best.map(|b| b.0).ok_or(ForecastError::EmptyData)
    }

    fn seasonal_forecast(&self, h: usize) -> f64 {
        if self.seasonal_cycle.is_empty() {
            0.0
        } else {
            self.seasonal_cycle[h % self.seasonal_period]
        }
    }

    /// Standard errors from the AR psi weights.
    fn standard_errors(&self, horizon: usize) -> Result<Vec<f64>> {
        let sigma = self.sigma.ok_or(ForecastError::FitRequired)?;
        let phi = self.ar.get(1..).unwrap_or(&[]);
        let mut psi = vec![1.0; horizon];
        for j in 1..horizon {
            psi[j] = (1..=j.min(phi.len())).map(|i| phi[i - 1] * psi[j - i]).sum();
        }
        let mut acc = 0.0;
        Ok(psi
            .iter()
            .map(|p| {
                acc += p * p;
                sigma * acc.sqrt()
            })
            .collect())
    }
}

impl Forecaster for STLM {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        let n = values.len();
        if n < 4 {
            return Err(ForecastError::InsufficientData { needed: 4, got: n });
        }

        let m = self.seasonal_period;
        let stl = STL::new(m);
        let (adjusted, seasonal) = if m > 1 && n >= stl.min_length() {
            let decomposition = stl.decompose(values)?;
            (decomposition.seasonally_adjusted(), decomposition.seasonal)
        } else {
            (values.to_vec(), Vec::new())
        };

        let ar = Self::select_ar(&adjusted)?;
        let p = ar.len() - 1;

        let mut fitted = vec![f64::NAN; n];
        for t in p..n {
            let lags: Vec<f64> = (1..=p).map(|i| adjusted[t - i]).collect();
            let season = seasonal.get(t).copied().unwrap_or(0.0);
            fitted[t] = ar[0] + dot(&ar[1..], &lags) + season;
        }
        let residuals: Vec<f64> = values.iter().zip(&fitted).map(|(y, f)| y - f).collect();

        self.seasonal_cycle = if seasonal.is_empty() {
            Vec::new()
        } else {
            seasonal[n - m..].to_vec()
        };
        self.sigma = residual_sigma(&residuals);
        debug!(ar_order = p, seasonal = !seasonal.is_empty(), "fitted STLM");
        self.ar = ar;
        self.adjusted = Some(adjusted);
        self.n = n;
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let adjusted = self.adjusted.as_ref().ok_or(ForecastError::FitRequired)?;
        let p = self.ar_order();

        let mut history = adjusted.clone();
        let mut predictions = Vec::with_capacity(horizon);
        for h in 0..horizon {
            let t = history.len();
            let next = self.ar[0] + (1..=p).map(|i| self.ar[i] * history[t - i]).sum::<f64>();
            history.push(next);
            predictions.push(next + self.seasonal_forecast(h));
        }
        Ok(Forecast::from_values(predictions))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let point = self.predict(horizon)?.point().to_vec();
        let se = self.standard_errors(horizon)?;
        normal_intervals(point, &se, level)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "STLM"
    }
}
