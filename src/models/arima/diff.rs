//! Differencing utilities and unit-root tests for ARIMA models.

use crate::utils::stats::mean;

/// 5% critical value of the KPSS level-stationarity test.
pub const KPSS_CRITICAL_5PCT: f64 = 0.463;

/// Apply `d` rounds of lag-`lag` differencing.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    lagged_difference(series, d, 1)
}

/// Apply `d` rounds of seasonal differencing at `period`.
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    if period == 0 {
        return series.to_vec();
    }
    lagged_difference(series, d, period)
}

fn lagged_difference(series: &[f64], d: usize, lag: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= lag {
            break;
        }
        result = result[lag..]
            .iter()
            .zip(&result)
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    result
}

/// A sequence of differencing operations that remembers every intermediate
/// series so forecasts can be integrated back.
#[derive(Debug, Clone)]
pub struct DifferenceStack {
    lags: Vec<usize>,
    /// `levels[0]` is the original series, `levels[k]` is after `k` operations.
    levels: Vec<Vec<f64>>,
}

impl DifferenceStack {
    /// Seasonal differences (`seasonal_d` rounds at `period`) followed by
    /// `d` regular differences.
    pub fn new(series: &[f64], d: usize, seasonal_d: usize, period: usize) -> Self {
        let mut lags = vec![period; if period > 1 { seasonal_d } else { 0 }];
        lags.extend(std::iter::repeat(1).take(d));

        let mut levels = vec![series.to_vec()];
        for &lag in &lags {
            let next = lagged_difference(&levels[levels.len() - 1], 1, lag);
            levels.push(next);
        }
        Self { lags, levels }
    }

    /// The fully differenced series.
    pub fn differenced(&self) -> &[f64] {
        &self.levels[self.levels.len() - 1]
    }

    /// Lags of the applied operations, in application order.
    pub fn lags(&self) -> &[usize] {
        &self.lags
    }

    /// Coefficients of `prod (1 - B^lag)` in powers of the backshift `B`.
    pub fn polynomial(&self) -> Vec<f64> {
        self.lags.iter().fold(vec![1.0], |poly, &lag| {
            let mut out = vec![0.0; poly.len() + lag];
            for (i, c) in poly.iter().enumerate() {
                out[i] += c;
                out[i + lag] -= c;
            }
            out
        })
    }

    /// Turn forecasts of the differenced series into forecasts of the
    /// original series.
    pub fn integrate(&self, forecasts: &[f64]) -> Vec<f64> {
        let mut current = forecasts.to_vec();
        for (k, &lag) in self.lags.iter().enumerate().rev() {
            let mut history = self.levels[k].clone();
            let start = history.len();
            for (h, &delta) in current.iter().enumerate() {
                let t = start + h;
                let base = if t >= lag { history[t - lag] } else { 0.0 };
                history.push(base + delta);
            }
            current = history[start..].to_vec();
        }
        current
    }
}

/// KPSS statistic for level stationarity with a Bartlett long-run variance
/// estimate using `floor(3 sqrt(n) / 13)` lags.
pub fn kpss_statistic(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 3 {
        return 0.0;
    }
    let m = mean(series);
    let e: Vec<f64> = series.iter().map(|x| x - m).collect();

    let gamma = |k: usize| e[k..].iter().zip(&e).map(|(a, b)| a * b).sum::<f64>() / n as f64;
    let lags = ((3.0 * (n as f64).sqrt() / 13.0).floor() as usize).min(n - 1);
    let mut lr_var = gamma(0);
    for k in 1..=lags {
        lr_var += 2.0 * (1.0 - k as f64 / (lags as f64 + 1.0)) * gamma(k);
    }
    if lr_var <= 1e-12 * (1.0 + m * m) {
        return 0.0;
    }

    let mut partial = 0.0;
    let mut ss = 0.0;
    for v in &e {
        partial += v;
        ss += partial * partial;
    }
    ss / (n as f64 * n as f64 * lr_var)
}

/// Number of regular differences (at most `max_d`) needed before the KPSS
/// test stops rejecting stationarity.
pub fn suggest_differencing(series: &[f64], max_d: usize) -> usize {
    let mut current = series.to_vec();
    let mut d = 0;
    while d < max_d && current.len() > 5 && kpss_statistic(&current) > KPSS_CRITICAL_5PCT {
        current = difference(&current, 1);
        d += 1;
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn noise(i: usize) -> f64 {
        ((i as f64 * 12.9898).sin() * 43758.5453).fract() - 0.5
    }

    #[test]
    fn difference_orders() {
        let s = [1.0, 4.0, 9.0, 16.0, 25.0];
        assert_eq!(difference(&s, 0), s.to_vec());
        assert_eq!(difference(&s, 1), vec![3.0, 5.0, 7.0, 9.0]);
        assert_eq!(difference(&s, 2), vec![2.0, 2.0, 2.0]);
        assert!(difference(&[], 1).is_empty());
    }

    #[test]
    fn seasonal_difference_basic() {
        let s = [1.0, 2.0, 3.0, 4.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(seasonal_difference(&s, 1, 4), vec![1.0; 4]);
        assert_eq!(seasonal_difference(&s, 1, 0), s.to_vec());
    }

    #[test]
    fn stack_integrates_back() {
        let series: Vec<f64> = (0..30)
            .map(|i| i as f64 * 0.5 + [3.0, -1.0, 0.0, 2.0][i % 4])
            .collect();
        let (train, test) = series.split_at(24);
        let stack = DifferenceStack::new(train, 1, 1, 4);
        assert_eq!(stack.lags(), &[4, 1]);

        // Exact differenced values of the held-out points integrate back exactly.
        let full = DifferenceStack::new(&series, 1, 1, 4);
        let future = &full.differenced()[full.differenced().len() - test.len()..];
        let restored = stack.integrate(future);
        for (a, b) in restored.iter().zip(test) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn polynomial_expands_operators() {
        let stack = DifferenceStack::new(&[0.0; 20], 1, 1, 4);
        // (1 - B^4)(1 - B) = 1 - B - B^4 + B^5
        assert_eq!(stack.polynomial(), vec![1.0, -1.0, 0.0, 0.0, -1.0, 1.0]);
    }

    #[test]
    fn kpss_separates_trend_from_noise() {
        let noise_series: Vec<f64> = (0..100).map(noise).collect();
        let trend: Vec<f64> = (0..100).map(|i| i as f64 + noise(i)).collect();
        assert!(kpss_statistic(&noise_series) < KPSS_CRITICAL_5PCT);
        assert!(kpss_statistic(&trend) > KPSS_CRITICAL_5PCT);
        assert_eq!(suggest_differencing(&noise_series, 2), 0);
        assert!(suggest_differencing(&trend, 2) >= 1);
    }

    #[test]
    fn kpss_constant_is_zero() {
        assert_eq!(kpss_statistic(&[2.0; 20]), 0.0);
    }
}
