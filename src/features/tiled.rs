//! Tiled-window features: how much the level and the spread drift across
//! non-overlapping windows.

use crate::utils::stats::{mean, variance};

/// Window width for tiled features: one season, or 10 for non-seasonal data.
pub fn tile_width(period: usize) -> usize {
    if period > 1 {
        period
    } else {
        10
    }
}

fn tiles(series: &[f64], width: usize) -> impl Iterator<Item = &[f64]> {
    series.chunks(width.max(1))
}

/// Variance of the means of non-overlapping windows.
pub fn stability(series: &[f64], width: usize) -> f64 {
    let means: Vec<f64> = tiles(series, width).map(mean).collect();
    variance(&means)
}

/// Variance of the variances of non-overlapping windows.
///
/// Windows with fewer than two observations are skipped.
pub fn lumpiness(series: &[f64], width: usize) -> f64 {
    let vars: Vec<f64> = tiles(series, width)
        .filter(|tile| tile.len() > 1)
        .map(variance)
        .collect();
    variance(&vars)
}
