//! Statistical utility functions.

use statrs::distribution::{ContinuousCDF, Normal};

/// Quantile function of the standard normal distribution.
///
/// # Example
/// ```
/// use anofox_meta::utils::quantile_normal;
///
/// // 95% two-sided interval -> z ≈ 1.96
/// let z = quantile_normal(0.975);
/// assert!((z - 1.959964).abs() < 1e-5);
/// ```
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    match Normal::new(0.0, 1.0) {
        Ok(dist) => dist.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

/// z-value for a two-sided prediction interval at `level` (e.g. 0.95).
pub fn interval_z(level: f64) -> f64 {
    quantile_normal((1.0 + level) / 2.0)
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the variance of a slice (sample variance with n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n.is_multiple_of(2) {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Index of the largest value (first on ties). NaN entries are skipped.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the smallest value (first on ties). NaN entries are skipped.
pub fn argmin(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn quantile_normal_known_values() {
        assert_relative_eq!(quantile_normal(0.5), 0.0, epsilon = 1e-9);
        assert_relative_eq!(quantile_normal(0.975), 1.959964, epsilon = 1e-5);
        assert_relative_eq!(quantile_normal(0.025), -1.959964, epsilon = 1e-5);
        assert_relative_eq!(interval_z(0.8), 1.281552, epsilon = 1e-5);
    }

    #[test]
    fn quantile_normal_edges() {
        assert_eq!(quantile_normal(0.0), f64::NEG_INFINITY);
        assert_eq!(quantile_normal(1.0), f64::INFINITY);
    }

    #[test]
    fn mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values), 5.0);
        assert_relative_eq!(variance(&values), 32.0 / 7.0, epsilon = 1e-12);
        assert!(variance(&[1.0]).is_nan());
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn median_even_and_odd() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn arg_extremes_skip_nan() {
        let values = [f64::NAN, 2.0, 5.0, 5.0, -1.0];
        assert_eq!(argmax(&values), Some(2));
        assert_eq!(argmin(&values), Some(4));
        assert_eq!(argmax(&[f64::NAN]), None);
    }
}
