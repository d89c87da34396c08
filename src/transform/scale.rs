//! Standardization of time series values.

/// Standardized data with the center and scale that were removed.
#[derive(Debug, Clone)]
pub struct ScaleResult {
    /// Transformed data
    pub data: Vec<f64>,
    /// Center value used (mean)
    pub center: f64,
    /// Scale value used (std dev)
    pub scale: f64,
}

/// Standardize data to zero mean and unit variance (z-score normalization).
///
/// x_scaled = (x - mean) / std
///
/// A standard deviation that is negligible relative to the magnitude of the
/// data counts as zero: the data is centered only, which yields all zeros.
pub fn standardize(series: &[f64]) -> ScaleResult {
    if series.is_empty() {
        return ScaleResult {
            data: Vec::new(),
            center: 0.0,
            scale: 1.0,
        };
    }

    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;

    let variance = if series.len() > 1 {
        series.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        0.0
    };
    let std = variance.sqrt();
    let magnitude = series.iter().fold(0.0f64, |m, x| m.max(x.abs()));

    if std <= 1e-12 * magnitude.max(f64::MIN_POSITIVE) {
        return ScaleResult {
            data: vec![0.0; series.len()],
            center: mean,
            scale: 1.0,
        };
    }

    let data = series.iter().map(|&x| (x - mean) / std).collect();
    ScaleResult {
        data,
        center: mean,
        scale: std,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn standardize_basic() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = standardize(&series);

        assert_relative_eq!(result.center, 3.0, epsilon = 1e-10);
        assert_relative_eq!(result.scale, 2.5_f64.sqrt(), epsilon = 1e-10);

        let mean: f64 = result.data.iter().sum::<f64>() / result.data.len() as f64;
        assert_relative_eq!(mean, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn standardize_constant() {
        let result = standardize(&[5.0; 10]);
        assert_relative_eq!(result.center, 5.0, epsilon = 1e-10);
        assert_eq!(result.scale, 1.0);
        assert!(result.data.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn standardize_tiny_scale_is_not_degenerate() {
        let series: Vec<f64> = (0..10).map(|i| i as f64 * 1e-9).collect();
        let result = standardize(&series);
        assert!(result.scale < 1e-6);
        let unit = standardize(&(0..10).map(|i| i as f64).collect::<Vec<_>>());
        for (a, b) in result.data.iter().zip(&unit.data) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn standardize_empty() {
        assert!(standardize(&[]).data.is_empty());
    }
}
