//! Box-Cox power transformation.
//!
//! Transforms strictly positive data towards constant variance. The
//! transformation parameter can be chosen by Guerrero's method (the
//! coefficient of variation of block standard deviations, which is
//! invariant to rescaling the series) or by maximum likelihood.

use serde::{Deserialize, Serialize};

/// Method used to pick the Box-Cox parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LambdaMethod {
    /// Guerrero (1993): minimize the coefficient of variation of
    /// `sd_h / mean_h^(1 - lambda)` over seasonal blocks, lambda in [-1, 2].
    #[default]
    Guerrero,
    /// Profile log-likelihood of the transformed data, lambda in [-2, 2].
    LogLikelihood,
}

/// Result of Box-Cox transformation.
#[derive(Debug, Clone)]
pub struct BoxCoxResult {
    /// Transformed data
    pub data: Vec<f64>,
    /// Lambda parameter used
    pub lambda: f64,
}

impl BoxCoxResult {
    /// Inverse transform to recover original scale.
    pub fn inverse(&self) -> Vec<f64> {
        inv_boxcox(&self.data, self.lambda)
    }
}

/// Apply Box-Cox transformation with a given lambda.
///
/// For lambda != 0: y = (x^lambda - 1) / lambda
/// For lambda == 0: y = ln(x)
///
/// Non-positive inputs map to NaN.
pub fn boxcox(series: &[f64], lambda: f64) -> Vec<f64> {
    series.iter().map(|&x| boxcox_value(x, lambda)).collect()
}

/// Box-Cox transform of a single value.
pub fn boxcox_value(x: f64, lambda: f64) -> f64 {
    if x <= 0.0 {
        f64::NAN
    } else if lambda.abs() < 1e-10 {
        x.ln()
    } else {
        (x.powf(lambda) - 1.0) / lambda
    }
}

/// Inverse Box-Cox transformation.
///
/// For lambda != 0: x = (lambda * y + 1)^(1/lambda)
/// For lambda == 0: x = exp(y)
pub fn inv_boxcox(transformed: &[f64], lambda: f64) -> Vec<f64> {
    transformed
        .iter()
        .map(|&y| inv_boxcox_value(y, lambda))
        .collect()
}

/// Inverse Box-Cox of a single value.
///
/// Values below the lower edge of the transformed domain (possible for
/// forecasts with lambda > 0) map to 0; values beyond the upper edge for
/// lambda < 0 have no preimage and map to NaN.
pub fn inv_boxcox_value(y: f64, lambda: f64) -> f64 {
    if lambda.abs() < 1e-10 {
        return y.exp();
    }
    let base = lambda * y + 1.0;
    if base <= 0.0 {
        if lambda > 0.0 {
            0.0
        } else {
            f64::NAN
        }
    } else {
        base.powf(1.0 / lambda)
    }
}

/// Check if data is suitable for Box-Cox transformation.
///
/// Returns true if all values are positive.
pub fn is_boxcox_suitable(series: &[f64]) -> bool {
    !series.is_empty() && series.iter().all(|&x| x > 0.0)
}

/// Choose lambda with the given method, or `None` when the data is not
/// strictly positive.
///
/// `period` sets the block length for Guerrero's method (at least 2).
pub fn select_lambda(series: &[f64], period: usize, method: LambdaMethod) -> Option<f64> {
    if !is_boxcox_suitable(series) {
        return None;
    }
    let lambda = match method {
        LambdaMethod::Guerrero => guerrero_lambda(series, period),
        LambdaMethod::LogLikelihood => boxcox_lambda(series),
    };
    Some(lambda)
}

/// Transform with an automatically selected lambda.
///
/// Returns `None` when the data is not strictly positive.
pub fn boxcox_auto(series: &[f64], period: usize, method: LambdaMethod) -> Option<BoxCoxResult> {
    let lambda = select_lambda(series, period, method)?;
    Some(BoxCoxResult {
        data: boxcox(series, lambda),
        lambda,
    })
}

/// Guerrero's lambda on [-1, 2] for strictly positive data.
///
/// The series is cut into non-overlapping blocks of length
/// `max(period, 2)` aligned to its end; with fewer than two blocks the
/// identity (lambda = 1) is returned.
pub fn guerrero_lambda(series: &[f64], period: usize) -> f64 {
    let block = period.max(2);
    let n_blocks = series.len() / block;
    if n_blocks < 2 {
        return 1.0;
    }
    let start = series.len() - n_blocks * block;
    let blocks: Vec<(f64, f64)> = series[start..]
        .chunks(block)
        .map(|chunk| {
            let m = chunk.iter().sum::<f64>() / chunk.len() as f64;
            let sd = (chunk.iter().map(|x| (x - m).powi(2)).sum::<f64>()
                / (chunk.len() - 1) as f64)
                .sqrt();
            (m, sd)
        })
        .collect();

    grid_search(-1.0, 2.0, |lambda| -guerrero_cv(&blocks, lambda))
}

fn guerrero_cv(blocks: &[(f64, f64)], lambda: f64) -> f64 {
    let ratios: Vec<f64> = blocks
        .iter()
        .map(|&(m, sd)| sd / m.powf(1.0 - lambda))
        .collect();
    let n = ratios.len() as f64;
    let mean = ratios.iter().sum::<f64>() / n;
    if mean <= 0.0 || !mean.is_finite() {
        return f64::INFINITY;
    }
    let sd = (ratios.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
    sd / mean
}

/// Find optimal Box-Cox lambda using maximum likelihood estimation.
///
/// Searches over [-2, 2] to maximize the profile log-likelihood of the
/// transformed data being normally distributed.
pub fn boxcox_lambda(series: &[f64]) -> f64 {
    let positive: Vec<f64> = series.iter().copied().filter(|&x| x > 0.0).collect();
    if positive.len() < 2 {
        return 1.0;
    }
    grid_search(-2.0, 2.0, |lambda| boxcox_llf(&positive, lambda))
}

/// Maximize `score` over [lo, hi]: a 0.01 grid, then a finer pass around
/// the best point. Only strict improvements move the optimum, so ties keep
/// the earliest grid point.
fn grid_search<F>(lo: f64, hi: f64, score: F) -> f64
where
    F: Fn(f64) -> f64,
{
    let steps = ((hi - lo) * 100.0).round() as i64;
    let mut best_lambda = 1.0;
    let mut best = f64::NEG_INFINITY;

    for i in 0..=steps {
        let lambda = lo + i as f64 / 100.0;
        let s = score(lambda);
        if s > best {
            best = s;
            best_lambda = lambda;
        }
    }

    let start = (best_lambda - 0.01).max(lo);
    let end = (best_lambda + 0.01).min(hi);
    for i in 0..=50 {
        let lambda = start + (end - start) * i as f64 / 50.0;
        let s = score(lambda);
        if s > best {
            best = s;
            best_lambda = lambda;
        }
    }

    best_lambda
}

/// Compute log-likelihood for Box-Cox transformation.
fn boxcox_llf(series: &[f64], lambda: f64) -> f64 {
    let n = series.len();
    let transformed = boxcox(series, lambda);
    if transformed.iter().any(|x| !x.is_finite()) {
        return f64::NEG_INFINITY;
    }

    let mean = transformed.iter().sum::<f64>() / n as f64;
    let variance = transformed.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    if variance <= 0.0 {
        return f64::NEG_INFINITY;
    }

    let log_sum: f64 = series.iter().map(|x| x.ln()).sum();
    -0.5 * n as f64 * variance.ln() + (lambda - 1.0) * log_sum
}
