//! Per-candidate combination weights and the score-to-weight transforms.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::models::CandidateModel;
use crate::utils::stats::argmax;

/// Numerically stable softmax of `scores / temperature`.
pub fn softmax(scores: &[f64], temperature: f64) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores
        .iter()
        .map(|s| ((s - max) / temperature).exp())
        .collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}

/// Policy turning raw scores (higher = better) into weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeightTransform {
    /// `softmax(score / temperature)`.
    Softmax { temperature: f64 },
    /// Negative scores clamped to 0, then normalized; uniform when nothing
    /// is positive.
    Proportional,
    /// All weight on the highest score.
    ArgMax,
}

impl Default for WeightTransform {
    fn default() -> Self {
        WeightTransform::Softmax { temperature: 1.0 }
    }
}

impl WeightTransform {
    /// Non-negative weights summing to 1.
    pub fn apply(&self, scores: &[f64]) -> Result<Vec<f64>> {
        if scores.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(ForecastError::ComputationError(
                "scores must be finite".to_string(),
            ));
        }
        let k = scores.len();
        let weights = match *self {
            WeightTransform::Softmax { temperature } => {
                if !(temperature > 0.0 && temperature.is_finite()) {
                    return Err(ForecastError::InvalidParameter(format!(
                        "softmax temperature must be positive, got {}",
                        temperature
                    )));
                }
                softmax(scores, temperature)
            }
            WeightTransform::Proportional => {
                let clamped: Vec<f64> = scores.iter().map(|s| s.max(0.0)).collect();
                let total: f64 = clamped.iter().sum();
                if total > 0.0 {
                    clamped.iter().map(|v| v / total).collect()
                } else {
                    vec![1.0 / k as f64; k]
                }
            }
            WeightTransform::ArgMax => {
                let best = argmax(scores).unwrap_or(0);
                (0..k).map(|j| if j == best { 1.0 } else { 0.0 }).collect()
            }
        };
        Ok(weights)
    }
}

/// Candidate model → non-negative weight, summing to 1.
///
/// Never empty: every constructor, deserialization included, goes through
/// [`ModelWeights::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights")]
pub struct ModelWeights {
    entries: Vec<(CandidateModel, f64)>,
}

#[derive(Deserialize)]
struct RawWeights {
    entries: Vec<(CandidateModel, f64)>,
}

impl TryFrom<RawWeights> for ModelWeights {
    type Error = ForecastError;

    fn try_from(raw: RawWeights) -> Result<Self> {
        Self::new(raw.entries)
    }
}

impl ModelWeights {
    /// Validate and normalize raw non-negative weights.
    pub fn new(entries: Vec<(CandidateModel, f64)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        for (i, (model, _)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|(m, _)| m == model) {
                return Err(ForecastError::InvalidParameter(format!(
                    "duplicate weight for {}",
                    model
                )));
            }
        }
        if entries.iter().any(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(ForecastError::InvalidParameter(
                "weights must be finite and non-negative".to_string(),
            ));
        }
        let total: f64 = entries.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "weights must not all be zero".to_string(),
            ));
        }
        Ok(Self {
            entries: entries.into_iter().map(|(m, w)| (m, w / total)).collect(),
        })
    }

    /// Equal weight on every model.
    pub fn uniform(models: &[CandidateModel]) -> Result<Self> {
        Self::new(models.iter().map(|&m| (m, 1.0)).collect())
    }

    /// Weights from scores via `transform`.
    pub fn from_scores(
        models: &[CandidateModel],
        scores: &[f64],
        transform: WeightTransform,
    ) -> Result<Self> {
        if models.len() != scores.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: models.len(),
                got: scores.len(),
            });
        }
        let weights = transform.apply(scores)?;
        Self::new(models.iter().copied().zip(weights).collect())
    }

    pub fn get(&self, model: CandidateModel) -> Option<f64> {
        self.entries
            .iter()
            .find(|(m, _)| *m == model)
            .map(|(_, w)| *w)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CandidateModel, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn models(&self) -> Vec<CandidateModel> {
        self.entries.iter().map(|(m, _)| *m).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Model with the largest weight (first on ties). Weights are never
    /// empty, so a best model always exists.
    pub fn best(&self) -> (CandidateModel, f64) {
        self.entries
            .iter()
            .copied()
            .fold(self.entries[0], |best, e| if e.1 > best.1 { e } else { best })
    }
}
