//! Features derived from an STL decomposition.

use crate::seasonality::STLResult;
use crate::utils::stats::{argmax, argmin, mean, variance};

use super::autocorrelation::acf;

/// Strength, shape and remainder statistics of a decomposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StlFeatures {
    pub trend: f64,
    pub seasonality: f64,
    pub linearity: f64,
    pub curvature: f64,
    pub spikiness: f64,
    pub e_acf1: f64,
    pub e_acf10: f64,
    /// 1-based cycle position of the largest seasonal effect; 0 without seasonality.
    pub peak: f64,
    /// 1-based cycle position of the smallest seasonal effect; 0 without seasonality.
    pub trough: f64,
}

impl StlFeatures {
    pub fn compute(stl: &STLResult) -> Self {
        let (linearity, curvature) = polynomial_trend(&stl.trend);
        let e = acf(&stl.remainder, 10);

        let profile = stl.seasonal_profile();
        let position = |idx: Option<usize>| idx.map_or(0.0, |i| (i + 1) as f64);

        Self {
            trend: stl.trend_strength(),
            seasonality: stl.seasonal_strength(),
            linearity,
            curvature,
            spikiness: spikiness(&stl.remainder),
            e_acf1: e[0],
            e_acf10: e.iter().map(|v| v * v).sum(),
            peak: position(argmax(&profile)),
            trough: position(argmin(&profile)),
        }
    }
}

/// Coefficients of the trend regressed on orthonormal linear and quadratic
/// polynomials in time.
fn polynomial_trend(trend: &[f64]) -> (f64, f64) {
    let n = trend.len();
    if n < 3 {
        return (f64::NAN, f64::NAN);
    }
    let t: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let t_mean = mean(&t);

    let mut p1: Vec<f64> = t.iter().map(|x| x - t_mean).collect();
    normalize(&mut p1);

    let sq: Vec<f64> = t.iter().map(|x| (x - t_mean).powi(2)).collect();
    let sq_mean = mean(&sq);
    let proj = dot(&sq, &p1);
    let mut p2: Vec<f64> = sq
        .iter()
        .zip(&p1)
        .map(|(s, p)| s - sq_mean - proj * p)
        .collect();
    normalize(&mut p2);

    (dot(trend, &p1), dot(trend, &p2))
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(v: &mut [f64]) {
    let norm = dot(v, v).sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Variance of the leave-one-out variances of the remainder.
fn spikiness(remainder: &[f64]) -> f64 {
    let n = remainder.len();
    if n < 3 {
        return f64::NAN;
    }
    let total: f64 = remainder.iter().sum();
    let total_sq: f64 = remainder.iter().map(|r| r * r).sum();
    let m = (n - 1) as f64;

    let loo: Vec<f64> = remainder
        .iter()
        .map(|&r| {
            let s = total - r;
            let ss = total_sq - r * r;
            ((ss - s * s / m) / (m - 1.0)).max(0.0)
        })
        .collect();
    variance(&loo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seasonality::STL;
    use approx::assert_relative_eq;

    #[test]
    fn linearity_and_curvature_signs() {
        let up: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let (lin, curv) = polynomial_trend(&up);
        assert!(lin > 0.0);
        assert!(curv.abs() < 1e-9);

        let bowl: Vec<f64> = (0..30).map(|i| ((i as f64) - 14.5).powi(2)).collect();
        let (lin, curv) = polynomial_trend(&bowl);
        assert!(lin.abs() < 1e-6);
        assert!(curv > 0.0);
    }

    #[test]
    fn spikiness_matches_direct_computation() {
        let r = [0.1, -0.3, 2.0, 0.05, -0.2, 0.4];
        let direct: Vec<f64> = (0..r.len())
            .map(|i| {
                let rest: Vec<f64> = r
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, &v)| v)
                    .collect();
                variance(&rest)
            })
            .collect();
        assert_relative_eq!(spikiness(&r), variance(&direct), epsilon = 1e-12);
    }

    #[test]
    fn seasonal_series_features() {
        let series: Vec<f64> = (0..48)
            .map(|i| (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin())
            .collect();
        let stl = STL::new(12).decompose(&series).unwrap();
        let f = StlFeatures::compute(&stl);
        assert!(f.seasonality > 0.9);
        assert_eq!(f.peak, 4.0);
        assert_eq!(f.trough, 10.0);
    }

    #[test]
    fn nonseasonal_peak_is_zero() {
        let series: Vec<f64> = (0..30).map(|i| (i as f64 * 0.5).sin()).collect();
        let stl = STL::new(1).decompose(&series).unwrap();
        let f = StlFeatures::compute(&stl);
        assert_eq!(f.peak, 0.0);
        assert_eq!(f.trough, 0.0);
        assert_eq!(f.seasonality, 0.0);
    }
}
