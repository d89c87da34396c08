//! STL (Seasonal-Trend decomposition using LOESS) implementation.
//!
//! STL decomposes a time series into three components:
//! - Trend: The underlying long-term pattern
//! - Seasonal: The repeating seasonal pattern
//! - Remainder: The residual after removing trend and seasonal
//!
//! The smoothers are local-linear LOESS fits as in Cleveland et al. (1990).
//! Cycle-subseries are smoothed and extrapolated one period beyond each end
//! before the low-pass filter, so a pure linear trend leaves the seasonal
//! component at zero. Series with period 1 get a trend-only decomposition.

use crate::error::{ForecastError, Result};

/// Strengths are reported as 0 when the variance they are measured against
/// falls below this fraction of the series variance.
const STRENGTH_FLOOR: f64 = 1e-8;

/// Result of STL decomposition.
#[derive(Debug, Clone)]
pub struct STLResult {
    /// Trend component.
    pub trend: Vec<f64>,
    /// Seasonal component.
    pub seasonal: Vec<f64>,
    /// Remainder component.
    pub remainder: Vec<f64>,
    /// Seasonal period the decomposition used.
    pub period: usize,
}

impl STLResult {
    /// Get the seasonal strength, `max(0, 1 - Var(R) / Var(S + R))`.
    /// Values close to 1 indicate strong seasonality.
    pub fn seasonal_strength(&self) -> f64 {
        self.strength(&self.seasonal)
    }

    /// Get the trend strength, `max(0, 1 - Var(R) / Var(T + R))`.
    /// Values close to 1 indicate strong trend.
    pub fn trend_strength(&self) -> f64 {
        self.strength(&self.trend)
    }

    /// The series with the seasonal component removed.
    pub fn seasonally_adjusted(&self) -> Vec<f64> {
        self.trend
            .iter()
            .zip(&self.remainder)
            .map(|(t, r)| t + r)
            .collect()
    }

    /// Average seasonal effect at each position of the cycle.
    ///
    /// Empty for non-seasonal decompositions.
    pub fn seasonal_profile(&self) -> Vec<f64> {
        if self.period < 2 {
            return Vec::new();
        }
        let mut sums = vec![0.0; self.period];
        let mut counts = vec![0usize; self.period];
        for (i, &s) in self.seasonal.iter().enumerate() {
            sums[i % self.period] += s;
            counts[i % self.period] += 1;
        }
        sums.iter()
            .zip(&counts)
            .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
            .collect()
    }

    fn strength(&self, component: &[f64]) -> f64 {
        let observed: Vec<f64> = self
            .trend
            .iter()
            .zip(&self.seasonal)
            .zip(&self.remainder)
            .map(|((t, s), r)| t + s + r)
            .collect();
        let combined: Vec<f64> = component
            .iter()
            .zip(&self.remainder)
            .map(|(c, r)| c + r)
            .collect();

        let var_combined = variance(&combined);
        if var_combined <= STRENGTH_FLOOR * variance(&observed) || var_combined == 0.0 {
            return 0.0;
        }

        (1.0 - variance(&self.remainder) / var_combined).clamp(0.0, 1.0)
    }
}

/// STL decomposition configuration and algorithm.
#[derive(Debug, Clone)]
pub struct STL {
    /// Seasonal period.
    seasonal_period: usize,
    /// Seasonal LOESS smoothing parameter (ns).
    seasonal_smoothness: usize,
    /// Low-pass filter parameter (nl).
    low_pass_smoothness: usize,
    /// Number of inner iterations.
    inner_iterations: usize,
    /// Number of outer (robustness) iterations.
    outer_iterations: usize,
}

impl STL {
    /// Default seasonal window.
    pub const DEFAULT_SEASONAL_WINDOW: usize = 11;

    /// Create a new STL decomposer with the given seasonal period.
    pub fn new(seasonal_period: usize) -> Self {
        Self {
            seasonal_period: seasonal_period.max(1),
            seasonal_smoothness: Self::DEFAULT_SEASONAL_WINDOW,
            low_pass_smoothness: next_odd(seasonal_period.max(3)),
            inner_iterations: 2,
            outer_iterations: 0,
        }
    }

    /// Set custom seasonal smoothness (ns parameter, at least 7).
    pub fn with_seasonal_smoothness(mut self, ns: usize) -> Self {
        self.seasonal_smoothness = next_odd(ns.max(7));
        self
    }

    /// Enable robust fitting with default iterations.
    pub fn robust(mut self) -> Self {
        self.outer_iterations = 6;
        self
    }

    /// Seasonal period of this decomposer.
    pub fn period(&self) -> usize {
        self.seasonal_period
    }

    /// Minimum series length this decomposer accepts.
    pub fn min_length(&self) -> usize {
        if self.seasonal_period > 1 {
            2 * self.seasonal_period
        } else {
            3
        }
    }

    /// Decompose the time series.
    pub fn decompose(&self, series: &[f64]) -> Result<STLResult> {
        let n = series.len();
        if n < self.min_length() {
            return Err(ForecastError::InsufficientData {
                needed: self.min_length(),
                got: n,
            });
        }
        if series.iter().any(|x| !x.is_finite()) {
            return Err(ForecastError::MissingValues);
        }

        if self.seasonal_period < 2 {
            return Ok(self.decompose_nonseasonal(series));
        }

        let period = self.seasonal_period;
        let nt = self.trend_window();
        let mut seasonal = vec![0.0; n];
        let mut trend = vec![0.0; n];
        let mut weights = vec![1.0; n];

        for outer in 0..=self.outer_iterations {
            for _ in 0..self.inner_iterations {
                let detrended: Vec<f64> =
                    series.iter().zip(&trend).map(|(y, t)| y - t).collect();

                let cycle = self.smooth_cycle_subseries(&detrended, &weights);
                let low_pass = self.low_pass_filter(&cycle);

                for i in 0..n {
                    seasonal[i] = cycle[i + period] - low_pass[i];
                }

                let deseasonalized: Vec<f64> =
                    series.iter().zip(&seasonal).map(|(y, s)| y - s).collect();
                trend = loess(&deseasonalized, &weights, nt);
            }

            if outer < self.outer_iterations {
                let remainder: Vec<f64> = series
                    .iter()
                    .zip(&seasonal)
                    .zip(&trend)
                    .map(|((y, s), t)| y - s - t)
                    .collect();
                weights = robustness_weights(&remainder);
            }
        }

        let remainder = series
            .iter()
            .zip(&seasonal)
            .zip(&trend)
            .map(|((y, s), t)| y - s - t)
            .collect();

        Ok(STLResult {
            trend,
            seasonal,
            remainder,
            period,
        })
    }

    fn decompose_nonseasonal(&self, series: &[f64]) -> STLResult {
        let n = series.len();
        let window = next_odd(7.max(n.div_ceil(4)));
        let trend = loess(series, &vec![1.0; n], window);
        let remainder = series.iter().zip(&trend).map(|(y, t)| y - t).collect();
        STLResult {
            trend,
            seasonal: vec![0.0; n],
            remainder,
            period: 1,
        }
    }

    fn trend_window(&self) -> usize {
        let p = self.seasonal_period as f64;
        let ns = self.seasonal_smoothness as f64;
        next_odd((1.5 * p / (1.0 - 1.5 / ns)).ceil() as usize)
    }

    /// Smooth each cycle-subseries and extend it one period at both ends.
    ///
    /// Output has length `n + 2 * period`; index `i + period` corresponds to
    /// observation `i`.
    fn smooth_cycle_subseries(&self, detrended: &[f64], weights: &[f64]) -> Vec<f64> {
        let n = detrended.len();
        let period = self.seasonal_period;
        let mut result = vec![0.0; n + 2 * period];

        for cycle_pos in 0..period {
            let values: Vec<f64> = detrended.iter().skip(cycle_pos).step_by(period).copied().collect();
            let sub_weights: Vec<f64> = weights.iter().skip(cycle_pos).step_by(period).copied().collect();
            let m = values.len();

            for j in -1..=(m as isize) {
                let fitted = loess_at(&values, &sub_weights, self.seasonal_smoothness, j as f64)
                    .unwrap_or_else(|| values[j.clamp(0, m as isize - 1) as usize]);
                let slot = cycle_pos as isize + (j + 1) * period as isize;
                result[slot as usize] = fitted;
            }
        }

        result
    }

    /// Low-pass filter: MA(period), MA(period), MA(3), then LOESS(nl).
    ///
    /// Shrinks the extended series of length `n + 2 * period` back to `n`.
    fn low_pass_filter(&self, cycle: &[f64]) -> Vec<f64> {
        let period = self.seasonal_period;
        let ma1 = moving_average(cycle, period);
        let ma2 = moving_average(&ma1, period);
        let ma3 = moving_average(&ma2, 3);
        loess(&ma3, &vec![1.0; ma3.len()], self.low_pass_smoothness)
    }
}

impl Default for STL {
    fn default() -> Self {
        Self::new(12)
    }
}

fn next_odd(x: usize) -> usize {
    if x % 2 == 0 {
        x + 1
    } else {
        x
    }
}

/// Trailing moving average; output is `window - 1` shorter than the input.
fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
    if series.len() < window {
        return Vec::new();
    }
    let mut sum: f64 = series[..window].iter().sum();
    let mut result = Vec::with_capacity(series.len() - window + 1);
    result.push(sum / window as f64);
    for i in window..series.len() {
        sum += series[i] - series[i - window];
        result.push(sum / window as f64);
    }
    result
}

/// LOESS smooth evaluated at every observation.
fn loess(values: &[f64], weights: &[f64], span: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| loess_at(values, weights, span, i as f64).unwrap_or(values[i]))
        .collect()
}

/// Local-linear LOESS estimate at position `x` (observations sit at
/// `0..n`) using the `span` nearest points and tricube weights.
///
/// Returns `None` when every point in the window has zero weight.
fn loess_at(values: &[f64], robustness: &[f64], span: usize, x: f64) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(values[0]);
    }

    let q = span.max(2);
    let (left, right) = if q >= n {
        (0, n - 1)
    } else {
        let centre = x.round() as isize - (q as isize - 1) / 2;
        let left = centre.clamp(0, (n - q) as isize) as usize;
        (left, left + q - 1)
    };

    let mut h = (x - left as f64).max(right as f64 - x);
    if q > n {
        h += ((q - n) / 2) as f64;
    }

    let upper = 0.999 * h;
    let lower = 0.001 * h;
    let mut w = vec![0.0; right - left + 1];
    let mut total = 0.0;
    for (k, j) in (left..=right).enumerate() {
        let r = (j as f64 - x).abs();
        if r <= upper {
            let tri = if r <= lower {
                1.0
            } else {
                (1.0 - (r / h).powi(3)).powi(3)
            };
            w[k] = tri * robustness[j];
            total += w[k];
        }
    }
    if total <= 0.0 {
        return None;
    }
    for wk in w.iter_mut() {
        *wk /= total;
    }

    if h > 0.0 {
        let centre: f64 = (left..=right).zip(&w).map(|(j, wk)| wk * j as f64).sum();
        let spread: f64 = (left..=right)
            .zip(&w)
            .map(|(j, wk)| wk * (j as f64 - centre).powi(2))
            .sum();
        if spread.sqrt() > 0.001 * (n - 1) as f64 {
            let slope = (x - centre) / spread;
            for (k, j) in (left..=right).enumerate() {
                w[k] *= 1.0 + slope * (j as f64 - centre);
            }
        }
    }

    Some((left..=right).zip(&w).map(|(j, wk)| wk * values[j]).sum())
}

/// Bisquare robustness weights from the remainder.
fn robustness_weights(remainder: &[f64]) -> Vec<f64> {
    let n = remainder.len();
    let mut sorted: Vec<f64> = remainder.iter().map(|r| r.abs()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = if n.is_multiple_of(2) {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };

    let h = 6.0 * median;
    remainder
        .iter()
        .map(|r| {
            if h < 1e-10 {
                return 1.0;
            }
            let u = r.abs() / h;
            if u < 1.0 {
                (1.0 - u * u).powi(2)
            } else {
                0.0
            }
        })
        .collect()
}

fn variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean: f64 = values.iter().sum::<f64>() / n as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}
