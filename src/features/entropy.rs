//! Spectral entropy of a time series.
//!
//! Measures how "forecastable" a series is: a single dominant frequency
//! gives entropy near 0, a flat (white-noise) spectrum gives entropy near 1.

use rustfft::{num_complex::Complex64, FftPlanner};

/// Periodogram at the Fourier frequencies `k / n`, `k = 1..=n/2`.
///
/// Power is the squared magnitude of the FFT divided by the length. The
/// series is demeaned first so the zero frequency carries no power and is
/// omitted.
pub fn periodogram(series: &[f64]) -> Vec<f64> {
    let n = series.len();
    if n < 2 {
        return Vec::new();
    }

    let m = series.iter().sum::<f64>() / n as f64;
    let mut buffer: Vec<Complex64> = series.iter().map(|&x| Complex64::new(x - m, 0.0)).collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    buffer
        .iter()
        .take(n / 2 + 1)
        .skip(1)
        .map(|c| c.norm_sqr() / n as f64)
        .collect()
}

/// Normalized Shannon entropy of the periodogram, in [0, 1].
///
/// Returns NaN for series shorter than 4 observations and 0 for a series
/// without spectral power.
pub fn spectral_entropy(series: &[f64]) -> f64 {
    if series.len() < 4 {
        return f64::NAN;
    }

    let psd = periodogram(series);
    let total: f64 = psd.iter().sum();
    if total <= 0.0 || psd.len() < 2 {
        return 0.0;
    }

    let entropy: f64 = psd
        .iter()
        .map(|&p| p / total)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.ln())
        .sum();

    (entropy / (psd.len() as f64).ln()).clamp(0.0, 1.0)
}
