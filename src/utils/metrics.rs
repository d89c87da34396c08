//! Accuracy metrics for forecast evaluation.
//!
//! The scaled metrics follow the M4 competition definitions: MASE scales by
//! the in-sample seasonal naive error and OWA averages sMAPE and MASE, each
//! relative to the Naive2 benchmark.

use crate::error::{ForecastError, Result};

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }
    Ok(())
}

/// Mean absolute error.
pub fn mae(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    Ok(actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64)
}

/// Mean squared error.
pub fn mse(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    Ok(actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64)
}

/// Symmetric mean absolute percentage error, in percent (0..200).
pub fn smape(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| {
            let denom = a.abs() + p.abs();
            if denom == 0.0 {
                0.0
            } else {
                2.0 * (a - p).abs() / denom
            }
        })
        .sum();
    Ok(100.0 * total / actual.len() as f64)
}

/// Mean absolute scaled error.
///
/// The scale is the in-sample MAE of the seasonal naive method on
/// `insample`; period 1 (or a period not shorter than the sample) falls
/// back to the lag-1 naive scale.
pub fn mase(insample: &[f64], actual: &[f64], predicted: &[f64], period: usize) -> Result<f64> {
    check_lengths(actual, predicted)?;
    let lag = if period > 1 && insample.len() > period {
        period
    } else {
        1
    };
    if insample.len() <= lag {
        return Err(ForecastError::InsufficientData {
            needed: lag + 1,
            got: insample.len(),
        });
    }

    let scale: f64 = insample
        .iter()
        .skip(lag)
        .zip(insample.iter())
        .map(|(curr, prev)| (curr - prev).abs())
        .sum::<f64>()
        / (insample.len() - lag) as f64;

    let error = mae(actual, predicted)?;
    if scale == 0.0 {
        // A perfectly flat in-sample history: any error is infinitely bad,
        // an exact forecast is perfect.
        return Ok(if error == 0.0 { 0.0 } else { f64::INFINITY });
    }
    Ok(error / scale)
}

/// Overall weighted average of sMAPE and MASE relative to a benchmark.
///
/// Ratios with a zero benchmark error are taken as 1 when the candidate is
/// also exact and as the candidate error plus one otherwise, which keeps the
/// value finite and ordered.
pub fn owa(smape: f64, mase: f64, benchmark_smape: f64, benchmark_mase: f64) -> f64 {
    fn ratio(value: f64, benchmark: f64) -> f64 {
        if benchmark > 0.0 && benchmark.is_finite() {
            value / benchmark
        } else if value == 0.0 {
            1.0
        } else {
            1.0 + value
        }
    }
    0.5 * (ratio(smape, benchmark_smape) + ratio(mase, benchmark_mase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mae_and_mse() {
        let actual = [1.0, 2.0, 3.0];
        let predicted = [2.0, 2.0, 1.0];
        assert_relative_eq!(mae(&actual, &predicted).unwrap(), 1.0);
        assert_relative_eq!(mse(&actual, &predicted).unwrap(), 5.0 / 3.0);
    }

    #[test]
    fn smape_bounds() {
        assert_relative_eq!(smape(&[1.0, 2.0], &[1.0, 2.0]).unwrap(), 0.0);
        assert_relative_eq!(smape(&[1.0], &[0.0]).unwrap(), 200.0);
        assert_relative_eq!(smape(&[0.0], &[0.0]).unwrap(), 0.0);
    }

    #[test]
    fn mase_uses_insample_scale() {
        let insample = [1.0, 2.0, 3.0, 4.0];
        let actual = [5.0, 6.0];
        let predicted = [4.0, 4.0];
        // Scale = mean |diff| = 1, MAE = 1.5
        assert_relative_eq!(
            mase(&insample, &actual, &predicted, 1).unwrap(),
            1.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn mase_seasonal_scale() {
        let insample = [1.0, 5.0, 2.0, 6.0, 3.0, 7.0];
        // Seasonal diffs at lag 2 are all 1.
        let result = mase(&insample, &[4.0], &[6.0], 2).unwrap();
        assert_relative_eq!(result, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn mase_flat_insample() {
        let insample = [3.0, 3.0, 3.0];
        assert_eq!(mase(&insample, &[3.0], &[3.0], 1).unwrap(), 0.0);
        assert!(mase(&insample, &[3.0], &[4.0], 1).unwrap().is_infinite());
    }

    #[test]
    fn length_mismatch_is_rejected() {
        assert_eq!(
            mae(&[1.0, 2.0], &[1.0]),
            Err(ForecastError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(smape(&[], &[]), Err(ForecastError::EmptyData));
    }

    #[test]
    fn owa_of_benchmark_is_one() {
        assert_relative_eq!(owa(12.0, 1.3, 12.0, 1.3), 1.0);
        assert_relative_eq!(owa(6.0, 1.3, 12.0, 1.3), 0.75);
        assert_relative_eq!(owa(0.0, 0.0, 0.0, 0.0), 1.0);
    }
}
