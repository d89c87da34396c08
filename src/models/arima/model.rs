//! ARIMA (Autoregressive Integrated Moving Average) model.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::DifferenceStack;
use crate::models::traits::normal_intervals;
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::mean;

/// ARIMA model specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ARIMASpec {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
    /// Seasonal differencing order (D)
    pub seasonal_d: usize,
    /// Seasonal period used by the seasonal difference.
    pub period: usize,
}

impl ARIMASpec {
    /// Create a non-seasonal specification.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            p,
            d,
            q,
            seasonal_d: 0,
            period: 1,
        }
    }

    /// Add `seasonal_d` seasonal differences at `period`.
    pub fn with_seasonal_difference(mut self, seasonal_d: usize, period: usize) -> Self {
        self.seasonal_d = if period > 1 { seasonal_d } else { 0 };
        self.period = period.max(1);
        self
    }

    /// Whether a constant is estimated. Dropped after two or more
    /// differences, where it would imply a polynomial trend.
    pub fn has_intercept(&self) -> bool {
        self.d + self.seasonal_d < 2
    }

    /// Number of estimated coefficients including the intercept.
    pub fn num_params(&self) -> usize {
        self.p + self.q + usize::from(self.has_intercept())
    }
}

impl Default for ARIMASpec {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl std::fmt::Display for ARIMASpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.seasonal_d > 0 {
            write!(f, "(0,{},0)[{}]", self.seasonal_d, self.period)?;
        }
        Ok(())
    }
}

/// Estimated ARMA coefficients on the differenced scale.
#[derive(Debug, Clone, Default, PartialEq)]
struct Coefficients {
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
}

impl Coefficients {
    fn from_params(spec: ARIMASpec, params: &[f64]) -> Self {
        let offset = usize::from(spec.has_intercept());
        Self {
            intercept: if offset == 1 { params[0] } else { 0.0 },
            ar: params[offset..offset + spec.p].to_vec(),
            ma: params[offset + spec.p..offset + spec.p + spec.q].to_vec(),
        }
    }

    /// One-step prediction at `t` given history and past errors.
    fn predict_at(&self, w: &[f64], errors: &[f64], t: usize) -> f64 {
        let mut pred = self.intercept;
        for (i, a) in self.ar.iter().enumerate() {
            if t > i {
                pred += a * (w[t - 1 - i] - self.intercept);
            }
        }
        for (i, m) in self.ma.iter().enumerate() {
            if t > i {
                pred += m * errors[t - 1 - i];
            }
        }
        pred
    }
}

/// Conditional one-step errors, starting after `max(p, q)` observations.
fn css_errors(w: &[f64], spec: ARIMASpec, coef: &Coefficients) -> Vec<f64> {
    let start = spec.p.max(spec.q);
    let mut errors = vec![0.0; w.len()];
    for t in start..w.len() {
        errors[t] = w[t] - coef.predict_at(w, &errors, t);
    }
    errors
}

fn css(w: &[f64], spec: ARIMASpec, coef: &Coefficients) -> f64 {
    let start = spec.p.max(spec.q);
    css_errors(w, spec, coef)[start..].iter().map(|e| e * e).sum()
}

/// ARIMA forecasting model fitted by conditional sum of squares.
#[derive(Debug, Clone)]
pub struct ARIMA {
    spec: ARIMASpec,
    coefficients: Coefficients,
    stack: Option<DifferenceStack>,
    errors: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    sigma2: Option<f64>,
    aicc: Option<f64>,
}

impl ARIMA {
    /// Create a new ARIMA(p, d, q) model.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::from_spec(ARIMASpec::new(p, d, q))
    }

    pub fn from_spec(spec: ARIMASpec) -> Self {
        Self {
            spec,
            coefficients: Coefficients::default(),
            stack: None,
            errors: None,
            fitted: None,
            residuals: None,
            sigma2: None,
            aicc: None,
        }
    }

    pub fn spec(&self) -> ARIMASpec {
        self.spec
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.coefficients.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.coefficients.ma
    }

    pub fn intercept(&self) -> f64 {
        self.coefficients.intercept
    }

    pub fn aicc(&self) -> Option<f64> {
        self.aicc
    }

    /// Minimum series length for this specification.
    pub fn min_length(&self) -> usize {
        let differencing = self.spec.d + self.spec.seasonal_d * self.spec.period;
        differencing + self.spec.p.max(self.spec.q) + self.spec.num_params() + 3
    }

    fn estimate(&self, w: &[f64]) -> Coefficients {
        let spec = self.spec;
        let mut initial = Vec::with_capacity(spec.num_params());
        let mut bounds = Vec::with_capacity(spec.num_params());
        if spec.has_intercept() {
            initial.push(mean(w));
            bounds.push((f64::NEG_INFINITY, f64::INFINITY));
        }
        for i in 0..spec.p + spec.q {
            let lag = if i < spec.p { i } else { i - spec.p };
            initial.push(0.1 / (lag + 1) as f64);
            bounds.push((-0.99, 0.99));
        }
        if initial.is_empty() {
            return Coefficients::default();
        }

        let config = NelderMeadConfig {
            max_iter: 1000,
            tolerance: 1e-8,
            ..Default::default()
        };
        let result = nelder_mead(
            |params| css(w, spec, &Coefficients::from_params(spec, params)),
            &initial,
            Some(&bounds),
            &config,
        );
        Coefficients::from_params(spec, &result.optimal_point)
    }

    /// MA(infinity) weights of the full (integrated) model.
    fn psi_weights(&self, horizon: usize) -> Result<Vec<f64>> {
        let stack = self.stack.as_ref().ok_or(ForecastError::FitRequired)?;

        // phi(B) * prod(1 - B^lag) = 1 - sum a_i B^i
        let mut ar_poly = vec![1.0];
        ar_poly.extend(self.coefficients.ar.iter().map(|a| -a));
        let diff_poly = stack.polynomial();
        let mut full = vec![0.0; ar_poly.len() + diff_poly.len() - 1];
        for (i, a) in ar_poly.iter().enumerate() {
            for (j, d) in diff_poly.iter().enumerate() {
                full[i + j] += a * d;
            }
        }
        let a: Vec<f64> = full[1..].iter().map(|c| -c).collect();

        let mut psi = vec![1.0; horizon.max(1)];
        for j in 1..psi.len() {
            let mut value = self.coefficients.ma.get(j - 1).copied().unwrap_or(0.0);
            for i in 1..=j.min(a.len()) {
                value += a[i - 1] * psi[j - i];
            }
            psi[j] = value;
        }
        Ok(psi)
    }
}

impl Default for ARIMA {
    fn default() -> Self {
        Self::from_spec(ARIMASpec::default())
    }
}

impl Forecaster for ARIMA {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        let needed = self.min_length();
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let spec = self.spec;
        let stack = DifferenceStack::new(values, spec.d, spec.seasonal_d, spec.period);
        let w = stack.differenced();
        let coefficients = self.estimate(w);
        let errors = css_errors(w, spec, &coefficients);

        let start = spec.p.max(spec.q);
        let n_eff = (w.len() - start) as f64;
        let sse: f64 = errors[start..].iter().map(|e| e * e).sum();
        if !sse.is_finite() {
            return Err(ForecastError::ComputationError(format!(
                "{} produced a non-finite variance",
                spec
            )));
        }
        let scale = w.iter().map(|v| v * v).sum::<f64>() / w.len() as f64;
        let sigma2 = (sse / n_eff).max(1e-12 * scale.max(f64::MIN_POSITIVE));
        let k = spec.num_params() as f64 + 1.0;
        let loglik = -0.5 * n_eff * (1.0 + sigma2.ln() + (2.0 * std::f64::consts::PI).ln());
        let aicc = -2.0 * loglik + 2.0 * k + 2.0 * k * (k + 1.0) / (n_eff - k - 1.0);

        // Residuals on the original scale coincide with the one-step errors
        // once the differencing window is past.
        let offset = values.len() - w.len();
        let mut fitted = vec![f64::NAN; values.len()];
        let mut residuals = vec![f64::NAN; values.len()];
        for t in start..w.len() {
            residuals[offset + t] = errors[t];
            fitted[offset + t] = values[offset + t] - errors[t];
        }

        self.coefficients = coefficients;
        self.errors = Some(errors);
        self.stack = Some(stack);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        self.sigma2 = Some(sigma2);
        self.aicc = Some(aicc);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let stack = self.stack.as_ref().ok_or(ForecastError::FitRequired)?;
        let errors = self.errors.as_ref().ok_or(ForecastError::FitRequired)?;

        let mut w = stack.differenced().to_vec();
        let mut e = errors.clone();
        for _ in 0..horizon {
            let t = w.len();
            w.push(self.coefficients.predict_at(&w, &e, t));
            e.push(0.0);
        }
        let forecast_diff = &w[w.len() - horizon..];
        Ok(Forecast::from_values(stack.integrate(forecast_diff)))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let point = self.predict(horizon)?.point().to_vec();
        let sigma2 = self.sigma2.ok_or(ForecastError::FitRequired)?;
        let psi = self.psi_weights(horizon)?;

        let mut acc = 0.0;
        let se: Vec<f64> = psi
            .iter()
            .take(horizon)
            .map(|p| {
                acc += p * p;
                (sigma2 * acc).sqrt()
            })
            .collect();
        normal_intervals(point, &se, level)
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "ARIMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn noise(i: usize) -> f64 {
        ((i as f64 * 12.9898).sin() * 43758.5453).fract() - 0.5
    }

    #[test]
    fn spec_display() {
        assert_eq!(ARIMASpec::new(1, 1, 0).to_string(), "ARIMA(1,1,0)");
        let s = ARIMASpec::new(0, 1, 1).with_seasonal_difference(1, 12);
        assert_eq!(s.to_string(), "ARIMA(0,1,1)(0,1,0)[12]");
        assert!(!s.has_intercept());
    }

    #[test]
    fn ar1_coefficient_is_recovered() {
        let mut x = vec![0.0; 300];
        for t in 1..300 {
            x[t] = 0.7 * x[t - 1] + noise(t);
        }
        let ts = TimeSeries::new(x, 1).unwrap();
        let mut model = ARIMA::new(1, 0, 0);
        model.fit(&ts).unwrap();
        assert_relative_eq!(model.ar_coefficients()[0], 0.7, epsilon = 0.1);
    }

    #[test]
    fn random_walk_with_drift_extrapolates() {
        let values: Vec<f64> = (0..50).map(|i| 10.0 + 2.0 * i as f64 + 0.1 * noise(i)).collect();
        let ts = TimeSeries::new(values, 1).unwrap();
        let mut model = ARIMA::new(0, 1, 0);
        model.fit(&ts).unwrap();
        let f = model.predict(3).unwrap();
        assert_relative_eq!(f.point()[0], 10.0 + 2.0 * 50.0, epsilon = 0.5);
        assert_relative_eq!(f.point()[2] - f.point()[1], 2.0, epsilon = 0.05);
    }

    #[test]
    fn seasonal_difference_repeats_pattern() {
        let pattern = [5.0, 1.0, -2.0, -4.0];
        let values: Vec<f64> = (0..40).map(|i| 20.0 + pattern[i % 4] + 0.01 * noise(i)).collect();
        let ts = TimeSeries::new(values, 4).unwrap();
        let mut model = ARIMA::from_spec(ARIMASpec::new(0, 0, 0).with_seasonal_difference(1, 4));
        model.fit(&ts).unwrap();
        let f = model.predict(4).unwrap();
        for h in 0..4 {
            assert_relative_eq!(f.point()[h], 20.0 + pattern[h], epsilon = 0.1);
        }
    }

    #[test]
    fn random_walk_intervals_grow_like_sqrt_h() {
        let values: Vec<f64> = (0..60).map(|i| (0..=i).map(noise).sum()).collect();
        let ts = TimeSeries::new(values, 1).unwrap();
        let mut model = ARIMA::new(0, 1, 0);
        model.fit(&ts).unwrap();
        let f = model.predict_with_intervals(4, 0.9).unwrap();
        let width = |h: usize| f.upper().unwrap()[h] - f.lower().unwrap()[h];
        assert_relative_eq!(width(3) / width(0), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn short_series_is_rejected() {
        let ts = TimeSeries::new(vec![1.0, 2.0, 3.0], 1).unwrap();
        let mut model = ARIMA::new(2, 1, 2);
        assert!(matches!(
            model.fit(&ts),
            Err(ForecastError::InsufficientData { .. })
        ));
        assert_eq!(ARIMA::default().predict(2), Err(ForecastError::FitRequired));
    }
}
