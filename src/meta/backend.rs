//! Contracts for the learners behind the selector and the weighter.
//!
//! Any classifier or multi-output scorer can be plugged in by implementing
//! these traits; the crate ships a random forest and a gradient booster.

use crate::error::{ForecastError, Result};

/// Trains a multi-class probabilistic classifier.
pub trait ClassifierBackend {
    type Model: ClassifierModel;

    /// Train on rows `x` with labels in `0..n_classes` and one non-negative
    /// weight per row.
    fn train(
        &self,
        x: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        sample_weights: &[f64],
    ) -> Result<Self::Model>;
}

/// A trained classifier.
pub trait ClassifierModel {
    /// Class probabilities (length `n_classes`, summing to 1).
    fn predict_proba(&self, x: &[f64]) -> Vec<f64>;

    fn n_classes(&self) -> usize;
}

/// Trains a scorer producing one score per candidate from per-candidate
/// losses. Higher scores mean better candidates.
pub trait ScoreBackend {
    type Model: ScoreModel;

    /// `losses[i][j]` is the loss of candidate `j` on row `i`.
    fn train(&self, x: &[Vec<f64>], losses: &[Vec<f64>]) -> Result<Self::Model>;
}

/// A trained scorer.
pub trait ScoreModel {
    fn predict_scores(&self, x: &[f64]) -> Vec<f64>;

    fn n_outputs(&self) -> usize;
}

/// Shared shape checks for a design matrix; returns the number of columns.
pub(crate) fn check_design(x: &[Vec<f64>], targets: usize) -> Result<usize> {
    if x.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if x.len() != targets {
        return Err(ForecastError::DimensionMismatch {
            expected: x.len(),
            got: targets,
        });
    }
    let p = x[0].len();
    if let Some(row) = x.iter().find(|row| row.len() != p) {
        return Err(ForecastError::FeatureDimensionMismatch {
            expected: p,
            got: row.len(),
        });
    }
    if x.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ForecastError::MissingValues);
    }
    Ok(p)
}
