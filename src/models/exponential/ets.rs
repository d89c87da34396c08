//! ETS (Error-Trend-Seasonal) state-space forecasting model.
//!
//! Errors are additive. The trend is none, additive or damped and the
//! seasonality none or additive, giving six models. Smoothing parameters and
//! initial level/trend are estimated by Nelder-Mead on the sum of squared
//! one-step errors; the model is chosen by AICc.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::traits::normal_intervals;
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};

/// Trend component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendType {
    /// No trend
    #[default]
    None,
    /// Additive trend
    Additive,
    /// Additive damped trend
    AdditiveDamped,
}

/// Seasonal component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeasonalType {
    /// No seasonality
    #[default]
    None,
    /// Additive seasonality
    Additive,
}

/// ETS model specification (additive errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ETSSpec {
    pub trend: TrendType,
    pub seasonal: SeasonalType,
}

impl ETSSpec {
    pub fn new(trend: TrendType, seasonal: SeasonalType) -> Self {
        Self { trend, seasonal }
    }

    /// ETS(A,N,N) - simple exponential smoothing.
    pub fn ann() -> Self {
        Self::new(TrendType::None, SeasonalType::None)
    }

    /// ETS(A,A,N) - Holt's linear method.
    pub fn aan() -> Self {
        Self::new(TrendType::Additive, SeasonalType::None)
    }

    /// ETS(A,Ad,N) - damped trend.
    pub fn aadn() -> Self {
        Self::new(TrendType::AdditiveDamped, SeasonalType::None)
    }

    /// ETS(A,N,A) - seasonal level model.
    pub fn ana() -> Self {
        Self::new(TrendType::None, SeasonalType::Additive)
    }

    /// ETS(A,A,A) - additive Holt-Winters.
    pub fn aaa() -> Self {
        Self::new(TrendType::Additive, SeasonalType::Additive)
    }

    /// ETS(A,Ad,A) - damped additive Holt-Winters.
    pub fn aada() -> Self {
        Self::new(TrendType::AdditiveDamped, SeasonalType::Additive)
    }

    /// Get a short name for this specification.
    pub fn short_name(&self) -> String {
        let t = match self.trend {
            TrendType::None => "N",
            TrendType::Additive => "A",
            TrendType::AdditiveDamped => "Ad",
        };
        let s = match self.seasonal {
            SeasonalType::None => "N",
            SeasonalType::Additive => "A",
        };
        format!("ETS(A,{},{})", t, s)
    }

    pub fn has_trend(&self) -> bool {
        !matches!(self.trend, TrendType::None)
    }

    pub fn has_seasonal(&self) -> bool {
        !matches!(self.seasonal, SeasonalType::None)
    }

    pub fn is_damped(&self) -> bool {
        matches!(self.trend, TrendType::AdditiveDamped)
    }
}

/// Smoothing parameters and initial states of a fitted model.
#[derive(Debug, Clone, PartialEq)]
struct Params {
    alpha: f64,
    beta: f64,
    gamma: f64,
    phi: f64,
    level0: f64,
    trend0: f64,
    seasonals0: Vec<f64>,
}

/// State after filtering a series.
#[derive(Debug, Clone)]
struct State {
    level: f64,
    trend: f64,
    /// Seasonal state for each cycle position (`t % period`).
    seasonals: Vec<f64>,
}

/// Outcome of running the recursions over a series.
struct Filtered {
    state: State,
    fitted: Vec<f64>,
    sse: f64,
}

/// ETS state-space model.
#[derive(Debug, Clone)]
pub struct ETS {
    /// Fixed specification, or `None` to select by AICc.
    requested: Option<ETSSpec>,
    seasonal_period: usize,
    spec: Option<ETSSpec>,
    params: Option<Params>,
    state: Option<State>,
    sigma2: Option<f64>,
    aicc: Option<f64>,
    n: usize,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl ETS {
    /// ETS with automatic model selection.
    pub fn auto(seasonal_period: usize) -> Self {
        Self::build(None, seasonal_period)
    }

    /// ETS with a fixed specification.
    pub fn new(spec: ETSSpec, seasonal_period: usize) -> Self {
        Self::build(Some(spec), seasonal_period)
    }

    fn build(requested: Option<ETSSpec>, seasonal_period: usize) -> Self {
        Self {
            requested,
            seasonal_period: seasonal_period.max(1),
            spec: None,
            params: None,
            state: None,
            sigma2: None,
            aicc: None,
            n: 0,
            fitted: None,
            residuals: None,
        }
    }

    /// Specification of the fitted model.
    pub fn spec(&self) -> Option<ETSSpec> {
        self.spec
    }

    pub fn alpha(&self) -> Option<f64> {
        self.params.as_ref().map(|p| p.alpha)
    }

    pub fn aicc(&self) -> Option<f64> {
        self.aicc
    }

    /// Residual standard deviation.
    pub fn sigma(&self) -> Option<f64> {
        self.sigma2.map(f64::sqrt)
    }

    fn candidate_specs(&self, n: usize) -> Vec<ETSSpec> {
        if let Some(spec) = self.requested {
            return vec![spec];
        }
        let mut specs = vec![ETSSpec::ann(), ETSSpec::aan(), ETSSpec::aadn()];
        if self.seasonal_period > 1 && n >= 2 * self.seasonal_period {
            specs.extend([ETSSpec::ana(), ETSSpec::aaa(), ETSSpec::aada()]);
        }
        specs
    }

    fn fit_spec(&self, spec: ETSSpec, values: &[f64]) -> Result<(Params, Filtered, f64, f64)> {
        let n = values.len();
        let m = self.seasonal_period;
        if spec.has_seasonal() && (m < 2 || n < 2 * m) {
            return Err(ForecastError::InsufficientData {
                needed: 2 * m,
                got: n,
            });
        }

        let init = initial_params(spec, values, m);
        let (start, bounds) = encode(spec, &init);
        let objective = |x: &[f64]| match decode(spec, x, &init) {
            Some(p) => filter(spec, &p, values, m).sse,
            None => f64::INFINITY,
        };

        let config = NelderMeadConfig {
            max_iter: 2000,
            tolerance: 1e-10,
            ..Default::default()
        };
        let result = nelder_mead(objective, &start, Some(&bounds), &config);
        let params = decode(spec, &result.optimal_point, &init).ok_or_else(|| {
            ForecastError::ComputationError("ETS parameters left the admissible region".to_string())
        })?;
        let filtered = filter(spec, &params, values, m);

        // Number of parameters including initial states and sigma.
        let k = start.len() + if spec.has_seasonal() { m - 1 } else { 0 } + 1;
        if n <= k + 1 {
            return Err(ForecastError::InsufficientData {
                needed: k + 2,
                got: n,
            });
        }
        let scale = values.iter().map(|y| y * y).sum::<f64>() / n as f64;
        let sigma2 = (filtered.sse / n as f64).max(1e-12 * scale.max(f64::MIN_POSITIVE));
        let loglik = -0.5 * n as f64 * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        let k = k as f64;
        let aicc = -2.0 * loglik + 2.0 * k + 2.0 * k * (k + 1.0) / (n as f64 - k - 1.0);

        if !aicc.is_finite() {
            return Err(ForecastError::ComputationError(format!(
                "{} produced a non-finite AICc",
                spec.short_name()
            )));
        }
        Ok((params, filtered, sigma2, aicc))
    }

    /// Point forecasts from the final state.
    fn point_forecasts(&self, horizon: usize) -> Result<Vec<f64>> {
        let spec = self.spec.ok_or(ForecastError::FitRequired)?;
        let params = self.params.as_ref().ok_or(ForecastError::FitRequired)?;
        let state = self.state.as_ref().ok_or(ForecastError::FitRequired)?;
        let m = self.seasonal_period;

        Ok((1..=horizon)
            .map(|h| {
                let mut value = state.level + damped_sum(spec, params.phi, h) * state.trend;
                if spec.has_seasonal() {
                    value += state.seasonals[(self.n + h - 1) % m];
                }
                value
            })
            .collect())
    }

    /// Simulate one future sample path of `horizon` steps with Gaussian
    /// errors of the fitted variance.
    pub fn simulate<R: Rng + ?Sized>(&self, horizon: usize, rng: &mut R) -> Result<Vec<f64>> {
        let spec = self.spec.ok_or(ForecastError::FitRequired)?;
        let params = self.params.as_ref().ok_or(ForecastError::FitRequired)?;
        let sigma = self.sigma().ok_or(ForecastError::FitRequired)?;
        let mut state = self.state.clone().ok_or(ForecastError::FitRequired)?;
        let noise = Normal::new(0.0, sigma)
            .map_err(|e| ForecastError::ComputationError(e.to_string()))?;
        let m = self.seasonal_period;

        let mut path = Vec::with_capacity(horizon);
        for t in self.n..self.n + horizon {
            let e = noise.sample(rng);
            let y = step(spec, &params_view(params), &mut state, t, m, |_| e);
            path.push(y);
        }
        Ok(path)
    }
}

/// Borrowed smoothing parameters for a single recursion step.
struct Smoothing {
    alpha: f64,
    beta: f64,
    gamma: f64,
    phi: f64,
}

fn params_view(p: &Params) -> Smoothing {
    Smoothing {
        alpha: p.alpha,
        beta: p.beta,
        gamma: p.gamma,
        phi: p.phi,
    }
}

/// Advance the state one step at time `t`. `observe` maps the one-step
/// forecast to the error; the observation `forecast + error` is returned.
fn step<F>(spec: ETSSpec, s: &Smoothing, state: &mut State, t: usize, m: usize, observe: F) -> f64
where
    F: FnOnce(f64) -> f64,
{
    let phi = if spec.is_damped() { s.phi } else { 1.0 };
    let trend = if spec.has_trend() { state.trend } else { 0.0 };
    let season = if spec.has_seasonal() {
        state.seasonals[t % m]
    } else {
        0.0
    };

    let forecast = state.level + phi * trend + season;
    let e = observe(forecast);

    state.level = state.level + phi * trend + s.alpha * e;
    if spec.has_trend() {
        state.trend = phi * trend + s.beta * e;
    }
    if spec.has_seasonal() {
        state.seasonals[t % m] = season + s.gamma * e;
    }
    forecast + e
}

fn filter(spec: ETSSpec, params: &Params, values: &[f64], m: usize) -> Filtered {
    let mut state = State {
        level: params.level0,
        trend: params.trend0,
        seasonals: params.seasonals0.clone(),
    };
    let smoothing = params_view(params);
    let mut fitted = Vec::with_capacity(values.len());
    let mut sse = 0.0;

    for (t, &y) in values.iter().enumerate() {
        step(spec, &smoothing, &mut state, t, m, |forecast| {
            fitted.push(forecast);
            let e = y - forecast;
            sse += e * e;
            e
        });
    }

    Filtered { state, fitted, sse }
}

/// `phi + phi^2 + ... + phi^h` (or `h` for an undamped trend, 0 without trend).
fn damped_sum(spec: ETSSpec, phi: f64, h: usize) -> f64 {
    match spec.trend {
        TrendType::None => 0.0,
        TrendType::Additive => h as f64,
        TrendType::AdditiveDamped => (1..=h).map(|i| phi.powi(i as i32)).sum(),
    }
}

fn initial_params(spec: ETSSpec, values: &[f64], m: usize) -> Params {
    let n = values.len();
    let (level0, trend0, seasonals0) = if spec.has_seasonal() {
        let first: f64 = values[..m].iter().sum::<f64>() / m as f64;
        let second: f64 = values[m..2 * m].iter().sum::<f64>() / m as f64;
        let slope = if spec.has_trend() {
            (second - first) / m as f64
        } else {
            0.0
        };
        let centre = (m as f64 - 1.0) / 2.0;
        let seasonals: Vec<f64> = values[..m]
            .iter()
            .enumerate()
            .map(|(i, y)| y - (first + slope * (i as f64 - centre)))
            .collect();
        (first - slope * (centre + 1.0), slope, seasonals)
    } else {
        let span = (n - 1).clamp(1, 3);
        let slope = if spec.has_trend() && n > 1 {
            (values[span] - values[0]) / span as f64
        } else {
            0.0
        };
        (values[0] - slope, slope, Vec::new())
    };

    Params {
        alpha: 0.3,
        beta: 0.05,
        gamma: 0.05,
        phi: 0.95,
        level0,
        trend0,
        seasonals0,
    }
}

/// Optimizer coordinates: alpha, [beta], [gamma], [phi], level0, [trend0].
fn encode(spec: ETSSpec, p: &Params) -> (Vec<f64>, Vec<(f64, f64)>) {
    let unit = (1e-4, 0.9999);
    let free = (f64::NEG_INFINITY, f64::INFINITY);
    let mut x = vec![p.alpha];
    let mut bounds = vec![unit];
    if spec.has_trend() {
        x.push(p.beta);
        bounds.push(unit);
    }
    if spec.has_seasonal() {
        x.push(p.gamma);
        bounds.push(unit);
    }
    if spec.is_damped() {
        x.push(p.phi);
        bounds.push((0.8, 0.98));
    }
    x.push(p.level0);
    bounds.push(free);
    if spec.has_trend() {
        x.push(p.trend0);
        bounds.push(free);
    }
    (x, bounds)
}

/// Inverse of [`encode`]; `None` outside the usual region
/// (`beta <= alpha`, `gamma <= 1 - alpha`).
fn decode(spec: ETSSpec, x: &[f64], init: &Params) -> Option<Params> {
    let mut it = x.iter().copied();
    let alpha = it.next()?;
    let beta = if spec.has_trend() { it.next()? } else { 0.0 };
    let gamma = if spec.has_seasonal() { it.next()? } else { 0.0 };
    let phi = if spec.is_damped() { it.next()? } else { 1.0 };
    let level0 = it.next()?;
    let trend0 = if spec.has_trend() { it.next()? } else { 0.0 };

    if beta > alpha || gamma > 1.0 - alpha {
        return None;
    }
    Some(Params {
        alpha,
        beta,
        gamma,
        phi,
        level0,
        trend0,
        seasonals0: init.seasonals0.clone(),
    })
}

impl Forecaster for ETS {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        let n = values.len();
        if n < 3 {
            return Err(ForecastError::InsufficientData { needed: 3, got: n });
        }

        let mut best: Option<(ETSSpec, Params, Filtered, f64, f64)> = None;
        let mut last_error = None;
        for spec in self.candidate_specs(n) {
            match self.fit_spec(spec, values) {
                Ok((params, filtered, sigma2, aicc)) => {
                    debug!(model = %spec.short_name(), aicc, "fitted ETS candidate");
                    if best.as_ref().map_or(true, |b| aicc < b.4) {
                        best = Some((spec, params, filtered, sigma2, aicc));
                    }
                }
                Err(e) => last_error = Some(e),
            }
        }

        let (spec, params, filtered, sigma2, aicc) = best.ok_or_else(|| {
            last_error.unwrap_or_else(|| {
                ForecastError::ComputationError("no ETS model could be fitted".to_string())
            })
        })?;

        let residuals = values
            .iter()
            .zip(&filtered.fitted)
            .map(|(y, f)| y - f)
            .collect();
        self.spec = Some(spec);
        self.params = Some(params);
        self.state = Some(filtered.state);
        self.sigma2 = Some(sigma2);
        self.aicc = Some(aicc);
        self.n = n;
        self.fitted = Some(filtered.fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        Ok(Forecast::from_values(self.point_forecasts(horizon)?))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let point = self.point_forecasts(horizon)?;
        let spec = self.spec.ok_or(ForecastError::FitRequired)?;
        let params = self.params.as_ref().ok_or(ForecastError::FitRequired)?;
        let sigma2 = self.sigma2.ok_or(ForecastError::FitRequired)?;
        let m = self.seasonal_period;

        // Var(h) = sigma^2 * (1 + sum_{j<h} c_j^2), c_j = alpha + beta * phi_j + gamma * [m | j]
        let mut acc = 0.0;
        let se: Vec<f64> = (1..=horizon)
            .map(|h| {
                if h > 1 {
                    let j = h - 1;
                    let mut c = params.alpha + params.beta * damped_sum(spec, params.phi, j);
                    if spec.has_seasonal() && j % m == 0 {
                        c += params.gamma;
                    }
                    acc += c * c;
                }
                (sigma2 * (1.0 + acc)).sqrt()
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
        "ETS"
    }
}
