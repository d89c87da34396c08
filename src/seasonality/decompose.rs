//! Classical (moving-average) seasonal decomposition and the seasonality
//! test used by the Theta and Naive2 methods.

use crate::error::{ForecastError, Result};
use crate::features::autocorrelation::acf;
use crate::utils::stats::quantile_normal;

/// Type of seasonal decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecompositionType {
    /// y = trend + seasonal + remainder
    Additive,
    /// y = trend * seasonal * remainder
    #[default]
    Multiplicative,
}

/// Seasonal indices of a classical decomposition.
///
/// Index `i` applies to observations at positions `t` with `t % period == i`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassicalDecomposition {
    pub kind: DecompositionType,
    pub indices: Vec<f64>,
}

impl ClassicalDecomposition {
    pub fn period(&self) -> usize {
        self.indices.len()
    }

    /// Seasonal index at time position `t`.
    pub fn index(&self, t: usize) -> f64 {
        self.indices[t % self.indices.len()]
    }

    /// Remove the seasonal effect from `values` observed at positions `0..`.
    pub fn adjust(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .enumerate()
            .map(|(t, &y)| match self.kind {
                DecompositionType::Additive => y - self.index(t),
                DecompositionType::Multiplicative => y / self.index(t),
            })
            .collect()
    }

    /// Re-apply the seasonal effect to values at positions `start..`.
    pub fn reseasonalize(&self, values: &[f64], start: usize) -> Vec<f64> {
        values
            .iter()
            .enumerate()
            .map(|(i, &y)| match self.kind {
                DecompositionType::Additive => y + self.index(start + i),
                DecompositionType::Multiplicative => y * self.index(start + i),
            })
            .collect()
    }
}

/// Classical decomposition with a centered (2 x m for even m) moving average.
///
/// Needs at least two full periods. Multiplicative decomposition needs
/// strictly positive data.
pub fn classical_decompose(
    series: &[f64],
    period: usize,
    kind: DecompositionType,
) -> Result<ClassicalDecomposition> {
    if period < 2 {
        return Err(ForecastError::InvalidParameter(
            "classical decomposition needs a period of at least 2".to_string(),
        ));
    }
    if series.len() < 2 * period {
        return Err(ForecastError::InsufficientData {
            needed: 2 * period,
            got: series.len(),
        });
    }
    if kind == DecompositionType::Multiplicative && series.iter().any(|&y| y <= 0.0) {
        return Err(ForecastError::InvalidParameter(
            "multiplicative decomposition needs strictly positive data".to_string(),
        ));
    }

    let half = period / 2;
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];

    for i in half..(series.len() - half) {
        let trend = if period.is_multiple_of(2) {
            let mut s = 0.5 * series[i - half] + 0.5 * series[i + half];
            for &val in &series[(i - half + 1)..(i + half)] {
                s += val;
            }
            s / period as f64
        } else {
            series[(i - half)..=(i + half)].iter().sum::<f64>() / period as f64
        };

        let detrended = match kind {
            DecompositionType::Additive => series[i] - trend,
            DecompositionType::Multiplicative => series[i] / trend,
        };
        sums[i % period] += detrended;
        counts[i % period] += 1;
    }

    let mut indices: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();

    let mean = indices.iter().sum::<f64>() / period as f64;
    match kind {
        DecompositionType::Additive => indices.iter_mut().for_each(|s| *s -= mean),
        DecompositionType::Multiplicative => {
            if mean <= 0.0 {
                return Err(ForecastError::ComputationError(
                    "non-positive seasonal indices".to_string(),
                ));
            }
            indices.iter_mut().for_each(|s| *s /= mean)
        }
    }

    Ok(ClassicalDecomposition { kind, indices })
}

/// 90% test for seasonality on the autocorrelation at the seasonal lag.
///
/// Seasonal when `|r_m| > z_0.95 * sqrt((1 + 2 * sum_{k<m} r_k^2) / n)`.
/// Series shorter than three periods, or with period 1, are never seasonal.
pub fn seasonality_test(series: &[f64], period: usize) -> bool {
    if period < 2 || series.len() < 3 * period {
        return false;
    }
    let r = acf(series, period);
    let sum_sq: f64 = r[..period - 1].iter().map(|v| v * v).sum();
    let limit = quantile_normal(0.95) * ((1.0 + 2.0 * sum_sq) / series.len() as f64).sqrt();
    r[period - 1].abs() > limit
}
