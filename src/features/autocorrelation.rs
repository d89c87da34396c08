//! Autocorrelation-based features for time series.
//!
//! Provides the ACF/PACF summaries of the series, its differences and its
//! seasonal lag.

use crate::utils::stats::mean;

/// Returns the autocorrelation at a specific lag.
///
/// Uses the full-sample denominator, so values are bounded by 1 in absolute
/// value. A series with (numerically) no variance has zero autocorrelation.
///
/// # Arguments
/// * `series` - Input time series
/// * `lag` - Lag value
pub fn autocorrelation(series: &[f64], lag: usize) -> f64 {
    if series.len() <= lag {
        return f64::NAN;
    }

    let m = mean(series);
    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for (i, &x) in series.iter().enumerate() {
        denominator += (x - m).powi(2);
        if i >= lag {
            numerator += (x - m) * (series[i - lag] - m);
        }
    }

    if denominator < 1e-10 {
        return 0.0;
    }

    numerator / denominator
}

/// Autocorrelations at lags `1..=max_lag`.
///
/// Lags the series is too short for are NaN.
pub fn acf(series: &[f64], max_lag: usize) -> Vec<f64> {
    (1..=max_lag).map(|lag| autocorrelation(series, lag)).collect()
}

/// Partial autocorrelations at lags `1..=max_lag` (Durbin-Levinson).
///
/// Lags beyond what the series supports, or past a singular recursion
/// step, are NaN.
pub fn pacf(series: &[f64], max_lag: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; max_lag];
    if max_lag == 0 || series.len() < 2 {
        return out;
    }
    let usable = max_lag.min(series.len() - 1);
    let rho: Vec<f64> = (0..=usable).map(|k| autocorrelation(series, k)).collect();

    let mut phi_prev: Vec<f64> = Vec::new();
    for k in 1..=usable {
        let num = rho[k] - (1..k).map(|j| phi_prev[j - 1] * rho[k - j]).sum::<f64>();
        let denom = 1.0 - (1..k).map(|j| phi_prev[j - 1] * rho[j]).sum::<f64>();
        if denom.abs() < 1e-10 {
            break;
        }
        let phi_kk = num / denom;
        let mut phi = Vec::with_capacity(k);
        for j in 1..k {
            phi.push(phi_prev[j - 1] - phi_kk * phi_prev[k - j - 1]);
        }
        phi.push(phi_kk);
        out[k - 1] = phi_kk;
        phi_prev = phi;
    }
    out
}

/// Returns the partial autocorrelation at a specific lag (>= 1).
pub fn partial_autocorrelation(series: &[f64], lag: usize) -> f64 {
    if lag == 0 {
        return 1.0;
    }
    pacf(series, lag).last().copied().unwrap_or(f64::NAN)
}

/// First differences, `x[t] - x[t-1]`.
pub fn diff(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|w| w[1] - w[0]).collect()
}

fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

/// ACF summaries of a series, its first and second differences and its
/// seasonal lag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcfFeatures {
    pub x_acf1: f64,
    pub x_acf10: f64,
    pub diff1_acf1: f64,
    pub diff1_acf10: f64,
    pub diff2_acf1: f64,
    pub diff2_acf10: f64,
    /// Autocorrelation at the seasonal lag; 0 for non-seasonal series.
    pub seas_acf1: f64,
}

impl AcfFeatures {
    pub fn compute(series: &[f64], period: usize) -> Self {
        let d1 = diff(series);
        let d2 = diff(&d1);
        let x = acf(series, 10);
        let a1 = acf(&d1, 10);
        let a2 = acf(&d2, 10);

        Self {
            x_acf1: x[0],
            x_acf10: sum_of_squares(&x),
            diff1_acf1: a1[0],
            diff1_acf10: sum_of_squares(&a1),
            diff2_acf1: a2[0],
            diff2_acf10: sum_of_squares(&a2),
            seas_acf1: if period > 1 {
                autocorrelation(series, period)
            } else {
                0.0
            },
        }
    }
}

/// PACF summaries: sum of squares of the first five partial
/// autocorrelations of the series and its differences, plus the seasonal
/// partial autocorrelation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacfFeatures {
    pub x_pacf5: f64,
    pub diff1x_pacf5: f64,
    pub diff2x_pacf5: f64,
    /// Partial autocorrelation at the seasonal lag; 0 for non-seasonal series.
    pub seas_pacf: f64,
}

impl PacfFeatures {
    pub fn compute(series: &[f64], period: usize) -> Self {
        let d1 = diff(series);
        let d2 = diff(&d1);
        Self {
            x_pacf5: sum_of_squares(&pacf(series, 5)),
            diff1x_pacf5: sum_of_squares(&pacf(&d1, 5)),
            diff2x_pacf5: sum_of_squares(&pacf(&d2, 5)),
            seas_pacf: if period > 1 {
                partial_autocorrelation(series, period)
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn autocorrelation_lag_0() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(autocorrelation(&series, 0), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn autocorrelation_linear_trend() {
        let series: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let acf1 = autocorrelation(&series, 1);
        assert!(acf1 > 0.8, "Expected high ACF(1) for linear trend, got {}", acf1);
    }

    #[test]
    fn autocorrelation_alternating() {
        let series: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!(autocorrelation(&series, 1) < -0.5);
    }

    #[test]
    fn autocorrelation_constant_is_zero() {
        assert_eq!(autocorrelation(&[3.0; 10], 1), 0.0);
    }

    #[test]
    fn autocorrelation_too_short_is_nan() {
        assert!(autocorrelation(&[1.0, 2.0], 5).is_nan());
        assert!(acf(&[1.0, 2.0, 3.0], 4)[3].is_nan());
    }

    #[test]
    fn pacf_of_ar1_cuts_off() {
        // x[t] = 0.8 x[t-1] + deterministic pseudo-noise
        let mut x = vec![0.0; 400];
        for t in 1..400 {
            let noise = ((t as f64 * 12.9898).sin() * 43758.5453).fract() - 0.5;
            x[t] = 0.8 * x[t - 1] + noise;
        }
        let p = pacf(&x, 5);
        assert!(p[0] > 0.6, "pacf1 {}", p[0]);
        for &v in &p[1..] {
            assert!(v.abs() < 0.2, "pacf {}", v);
        }
    }

    #[test]
    fn pacf_first_lag_equals_acf() {
        let series: Vec<f64> = (0..30).map(|i| (i as f64 * 0.4).sin()).collect();
        assert_relative_eq!(
            pacf(&series, 3)[0],
            autocorrelation(&series, 1),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            partial_autocorrelation(&series, 1),
            autocorrelation(&series, 1),
            epsilon = 1e-12
        );
    }

    #[test]
    fn acf_features_seasonal_lag() {
        let series: Vec<f64> = (0..48)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin())
            .collect();
        let f = AcfFeatures::compute(&series, 12);
        assert!(f.seas_acf1 > 0.5);
        assert!(f.x_acf10 > 0.0);

        let nonseasonal = AcfFeatures::compute(&series, 1);
        assert_eq!(nonseasonal.seas_acf1, 0.0);
    }

    #[test]
    fn pacf_features_are_finite() {
        let series: Vec<f64> = (0..40).map(|i| (i as f64 * 0.7).cos() + 0.1 * i as f64).collect();
        let f = PacfFeatures::compute(&series, 4);
        assert!(f.x_pacf5.is_finite());
        assert!(f.diff1x_pacf5.is_finite());
        assert!(f.diff2x_pacf5.is_finite());
        assert!(f.seas_pacf.is_finite());
    }

    #[test]
    fn diff_basic() {
        assert_eq!(diff(&[1.0, 4.0, 9.0]), vec![3.0, 5.0]);
        assert!(diff(&[1.0]).is_empty());
    }
}
