//! Standard Theta model.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::traits::{normal_intervals, residual_sigma};
use crate::models::Forecaster;
use crate::seasonality::{
    classical_decompose, seasonality_test, ClassicalDecomposition, DecompositionType,
};
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};

/// Standard Theta model (theta = 2).
///
/// Forecast: `level + b/2 * (h - 1 + (1 - (1 - alpha)^n) / alpha)` on the
/// seasonally adjusted scale, where `b` is the least-squares slope and
/// `level` the final SES state with optimized `alpha`.
#[derive(Debug, Clone)]
pub struct Theta {
    /// Seasonal period (1 for non-seasonal).
    seasonal_period: usize,
    /// SES smoothing parameter.
    alpha: Option<f64>,
    /// Linear regression slope (B coefficient).
    b: Option<f64>,
    /// Final SES level.
    level: Option<f64>,
    decomposition: Option<ClassicalDecomposition>,
    n: usize,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl Theta {
    /// Non-seasonal Theta model.
    pub fn new() -> Self {
        Self::seasonal(1)
    }

    /// Theta model that tests for and removes seasonality of the given period.
    pub fn seasonal(period: usize) -> Self {
        Self {
            seasonal_period: period.max(1),
            alpha: None,
            b: None,
            level: None,
            decomposition: None,
            n: 0,
            fitted: None,
            residuals: None,
        }
    }

    /// Get the alpha parameter.
    pub fn alpha(&self) -> Option<f64> {
        self.alpha
    }

    /// Get the regression slope (B coefficient).
    pub fn slope(&self) -> Option<f64> {
        self.b
    }

    /// Whether a seasonal adjustment was applied during fitting.
    pub fn is_seasonal(&self) -> bool {
        self.decomposition.is_some()
    }

    /// Calculate SSE for SES started at the first observation.
    fn calculate_sse(series: &[f64], alpha: f64) -> f64 {
        let mut level = series[0];
        let mut sse = 0.0;
        for &y in &series[1..] {
            let error = y - level;
            sse += error * error;
            level += alpha * error;
        }
        sse
    }

    fn optimize_alpha(series: &[f64]) -> f64 {
        let config = NelderMeadConfig {
            max_iter: 500,
            tolerance: 1e-10,
            ..Default::default()
        };
        let result = nelder_mead(
            |params| Self::calculate_sse(series, params[0]),
            &[0.5],
            Some(&[(0.0001, 0.9999)]),
            &config,
        );
        result.optimal_point[0].clamp(0.0001, 0.9999)
    }
}

impl Default for Theta {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for Theta {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        let n = values.len();
        if n < 4 {
            return Err(ForecastError::InsufficientData { needed: 4, got: n });
        }

        let positive = values.iter().all(|&y| y > 0.0);
        self.decomposition = if positive && seasonality_test(values, self.seasonal_period) {
            classical_decompose(values, self.seasonal_period, DecompositionType::Multiplicative)
                .ok()
        } else {
            None
        };
        let adjusted = match &self.decomposition {
            Some(d) => d.adjust(values),
            None => values.to_vec(),
        };

        let x_mean = (n - 1) as f64 / 2.0;
        let y_mean = adjusted.iter().sum::<f64>() / n as f64;
        let (ss_xy, ss_xx) = adjusted.iter().enumerate().fold((0.0, 0.0), |(xy, xx), (i, y)| {
            let dx = i as f64 - x_mean;
            (xy + dx * (y - y_mean), xx + dx * dx)
        });
        let b = if ss_xx > 0.0 { ss_xy / ss_xx } else { 0.0 };

        let alpha = Self::optimize_alpha(&adjusted);

        // One-step fits on the adjusted scale include the drift term.
        let mut level = adjusted[0];
        let mut fitted_adjusted = Vec::with_capacity(n);
        fitted_adjusted.push(f64::NAN);
        for t in 1..n {
            let drift = 0.5 * b * (1.0 - (1.0 - alpha).powi(t as i32)) / alpha;
            fitted_adjusted.push(level + drift);
            level += alpha * (adjusted[t] - level);
        }

        let fitted = match &self.decomposition {
            Some(d) => d.reseasonalize(&fitted_adjusted, 0),
            None => fitted_adjusted,
        };
        let residuals = values.iter().zip(&fitted).map(|(y, f)| y - f).collect();

        self.alpha = Some(alpha);
        self.b = Some(b);
        self.level = Some(level);
        self.n = n;
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let level = self.level.ok_or(ForecastError::FitRequired)?;
        let alpha = self.alpha.ok_or(ForecastError::FitRequired)?;
        let b = self.b.ok_or(ForecastError::FitRequired)?;

        let offset = (1.0 - (1.0 - alpha).powi(self.n as i32)) / alpha;
        let adjusted: Vec<f64> = (0..horizon)
            .map(|h| level + 0.5 * b * (h as f64 + offset))
            .collect();

        let predictions = match &self.decomposition {
            Some(d) => d.reseasonalize(&adjusted, self.n),
            None => adjusted,
        };
        Ok(Forecast::from_values(predictions))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let forecast = self.predict(horizon)?;
        let alpha = self.alpha.ok_or(ForecastError::FitRequired)?;
        let residuals = self.residuals.as_ref().ok_or(ForecastError::FitRequired)?;
        let sigma = residual_sigma(residuals).unwrap_or(0.0);

        // SES forecast variance: sigma^2 * (1 + (h - 1) * alpha^2)
        let se: Vec<f64> = (1..=horizon)
            .map(|h| sigma * (1.0 + (h as f64 - 1.0) * alpha * alpha).sqrt())
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
        "Theta"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn theta_with_trend_continues_upwards() {
        let values: Vec<f64> = (0..50).map(|i| 10.0 + 2.0 * i as f64).collect();
        let ts = TimeSeries::new(values.clone(), 1).unwrap();

        let mut model = Theta::new();
        model.fit(&ts).unwrap();
        assert_relative_eq!(model.slope().unwrap(), 2.0, epsilon = 1e-9);

        let preds = model.predict(5).unwrap();
        let last = *values.last().unwrap();
        assert!(preds.point()[0] > last);
        assert!(preds.point()[4] > preds.point()[0]);
    }

    #[test]
    fn alpha_is_optimized_within_bounds() {
        let values: Vec<f64> = (0..40)
            .map(|i| 10.0 + (i as f64 * 0.9).sin() + 0.1 * i as f64)
            .collect();
        let ts = TimeSeries::new(values, 1).unwrap();
        let mut model = Theta::new();
        model.fit(&ts).unwrap();
        let alpha = model.alpha().unwrap();
        assert!((0.0001..=0.9999).contains(&alpha));
    }

    #[test]
    fn seasonal_series_is_adjusted() {
        let values: Vec<f64> = (0..48)
            .map(|i| 10.0 + 5.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin())
            .collect();
        let ts = TimeSeries::new(values.clone(), 12).unwrap();

        let mut model = Theta::seasonal(12);
        model.fit(&ts).unwrap();
        assert!(model.is_seasonal());

        let forecast = model.predict(12).unwrap();
        for (h, &v) in forecast.point().iter().enumerate() {
            assert_relative_eq!(v, values[36 + h], max_relative = 0.1);
        }
    }

    #[test]
    fn intervals_widen_with_horizon() {
        let values: Vec<f64> = (0..30).map(|i| 5.0 + (i as f64 * 1.3).cos()).collect();
        let ts = TimeSeries::new(values, 1).unwrap();
        let mut model = Theta::new();
        model.fit(&ts).unwrap();
        let f = model.predict_with_intervals(5, 0.95).unwrap();
        let w0 = f.upper().unwrap()[0] - f.lower().unwrap()[0];
        let w4 = f.upper().unwrap()[4] - f.lower().unwrap()[4];
        assert!(w4 >= w0);
    }

    #[test]
    fn too_short_is_rejected() {
        let ts = TimeSeries::new(vec![1.0, 2.0, 3.0], 1).unwrap();
        assert!(Theta::new().fit(&ts).is_err());
    }
}
