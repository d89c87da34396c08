//! Parallel per-series execution with failure isolation.
//!
//! Work runs on the rayon global pool. Results keep the input order and a
//! failing series is reported next to the successes instead of aborting the
//! batch.

use rayon::prelude::*;
use tracing::warn;

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::features::{FeatureExtractor, FeatureVector};

/// A series that could not be processed.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFailure {
    /// Position of the series in the input.
    pub index: usize,
    pub name: Option<String>,
    pub error: ForecastError,
}

/// Successes and failures of a batch, each in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult<T> {
    successes: Vec<(usize, T)>,
    failures: Vec<SeriesFailure>,
}

impl<T> BatchResult<T> {
    /// Pair per-series results with their series.
    pub fn from_results(series: &[TimeSeries], results: Vec<Result<T>>) -> Self {
        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for (index, (s, result)) in series.iter().zip(results).enumerate() {
            match result {
                Ok(value) => successes.push((index, value)),
                Err(error) => {
                    warn!(index, name = ?s.name(), %error, "series failed");
                    failures.push(SeriesFailure {
                        index,
                        name: s.name().map(str::to_string),
                        error,
                    });
                }
            }
        }
        Self {
            successes,
            failures,
        }
    }

    /// `(input index, value)` for every successful series.
    pub fn successes(&self) -> &[(usize, T)] {
        &self.successes
    }

    pub fn failures(&self) -> &[SeriesFailure] {
        &self.failures
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.successes.iter().map(|(_, v)| v)
    }

    pub fn into_values(self) -> Vec<T> {
        self.successes.into_iter().map(|(_, v)| v).collect()
    }

    /// Number of series processed, successful or not.
    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether every series succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply `f` to every series in parallel.
pub fn run_batch<T, F>(series: &[TimeSeries], f: F) -> BatchResult<T>
where
    T: Send,
    F: Fn(&TimeSeries) -> Result<T> + Sync,
{
    let results: Vec<Result<T>> = series.par_iter().map(&f).collect();
    BatchResult::from_results(series, results)
}

/// Extract features from every series in parallel.
pub fn extract_features_batch(
    series: &[TimeSeries],
    extractor: &FeatureExtractor,
) -> BatchResult<FeatureVector> {
    run_batch(series, |s| extractor.extract(s))
}
