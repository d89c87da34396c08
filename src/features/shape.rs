//! Features describing the shape of the value distribution over time.

use crate::utils::stats::median;

/// Number of times the series crosses its median, divided by its length.
pub fn crossing_points(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return f64::NAN;
    }
    let mid = median(series);
    let crossings = series
        .windows(2)
        .filter(|w| (w[0] <= mid) != (w[1] <= mid))
        .count();
    crossings as f64 / series.len() as f64
}

/// Longest run of consecutive observations falling in the same of ten
/// equal-width bins spanning the range of the series.
pub fn flat_spots(series: &[f64]) -> f64 {
    if series.is_empty() {
        return f64::NAN;
    }
    let min = series.iter().copied().fold(f64::INFINITY, f64::min);
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= 0.0 {
        return series.len() as f64;
    }

    let bin = |x: f64| (((x - min) / range * 10.0).floor() as usize).min(9);
    let mut longest = 1;
    let mut run = 1;
    for w in series.windows(2) {
        if bin(w[0]) == bin(w[1]) {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 1;
        }
    }
    longest as f64
}
