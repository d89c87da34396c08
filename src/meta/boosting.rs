//! Gradient-boosted trees producing one score per candidate model.
//!
//! Second-order boosting: every round fits one regression tree per output on
//! the gradients and hessians of the objective, with row subsampling per
//! round and column subsampling per tree.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ForecastError, Result};
use crate::meta::backend::{check_design, ScoreBackend, ScoreModel};
use crate::meta::tree::{grow_tree, FeatureChoice, GrowLimits, Newton, Tree};
use crate::meta::weights::softmax;
use crate::utils::stats::mean;

/// Training objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Scores are logits; minimizes the expected loss under their softmax.
    #[default]
    SoftmaxLoss,
    /// One squared-error regression per output on the loss itself; scores
    /// are the negated predictions.
    LossRegression,
}

/// Boosting hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    pub objective: Objective,
    pub n_rounds: usize,
    /// Shrinkage (eta).
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of rows used per round.
    pub subsample: f64,
    /// Fraction of columns used per tree.
    pub colsample: f64,
    /// L2 regularization on leaf weights.
    pub lambda: f64,
    /// Minimum gain required to split.
    pub gamma: f64,
    pub min_child_weight: f64,
    /// Absolute bound on raw leaf weights (0 disables).
    pub max_delta_step: f64,
    pub seed: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            objective: Objective::SoftmaxLoss,
            n_rounds: 94,
            learning_rate: 0.575,
            max_depth: 14,
            subsample: 0.92,
            colsample: 0.77,
            lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1e-6,
            max_delta_step: 0.0,
            seed: 42,
        }
    }
}

impl BoostingConfig {
    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_rounds(mut self, n_rounds: usize) -> Self {
        self.n_rounds = n_rounds;
        self
    }

    pub fn with_learning_rate(mut self, eta: f64) -> Self {
        self.learning_rate = eta;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_subsample(mut self, subsample: f64, colsample: f64) -> Self {
        self.subsample = subsample;
        self.colsample = colsample;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        let fraction = |v: f64| v > 0.0 && v <= 1.0;
        if !fraction(self.subsample) || !fraction(self.colsample) {
            return Err(ForecastError::InvalidParameter(
                "subsample and colsample must be in (0, 1]".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) || self.lambda < 0.0 || self.max_delta_step < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "learning_rate must be positive; lambda and max_delta_step non-negative"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Gradient boosting trainer.
#[derive(Debug, Clone, Default)]
pub struct GradientBoosting {
    config: BoostingConfig,
}

impl GradientBoosting {
    pub fn new(config: BoostingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BoostingConfig {
        &self.config
    }
}

/// Gradients and hessians of every output for the current raw scores.
/// Returns the objective value as well.
fn derivatives(
    objective: Objective,
    scores: &[Vec<f64>],
    losses: &[Vec<f64>],
) -> (Vec<Vec<f64>>, Vec<Vec<f64>>, f64) {
    let n = scores.len();
    let k = losses[0].len();
    let mut grad = vec![vec![0.0; n]; k];
    let mut hess = vec![vec![0.0; n]; k];
    let mut value = 0.0;

    for i in 0..n {
        match objective {
            Objective::SoftmaxLoss => {
                let p = softmax(&scores[i], 1.0);
                let expected: f64 = p.iter().zip(&losses[i]).map(|(p, l)| p * l).sum();
                value += expected;
                for j in 0..k {
                    let g = p[j] * (losses[i][j] - expected);
                    grad[j][i] = g;
                    hess[j][i] = (g * (1.0 - 2.0 * p[j])).abs().max(1e-6);
                }
            }
            Objective::LossRegression => {
                for j in 0..k {
                    let residual = scores[i][j] - losses[i][j];
                    value += 0.5 * residual * residual;
                    grad[j][i] = residual;
                    hess[j][i] = 1.0;
                }
            }
        }
    }
    (grad, hess, value / n as f64)
}

impl ScoreBackend for GradientBoosting {
    type Model = BoostedModel;

    fn train(&self, x: &[Vec<f64>], losses: &[Vec<f64>]) -> Result<BoostedModel> {
        let config = &self.config;
        config.validate()?;
        let p = check_design(x, losses.len())?;
        let n = x.len();
        let k = losses[0].len();
        if k == 0 || losses.iter().any(|row| row.len() != k) {
            return Err(ForecastError::InvalidParameter(
                "every example needs one loss per output".to_string(),
            ));
        }
        if losses.iter().flatten().any(|l| !l.is_finite()) {
            return Err(ForecastError::TrainingConvergence(
                "training losses contain non-finite values".to_string(),
            ));
        }

        // Regression starts from the mean loss, the softmax from uniform logits.
        let base: Vec<f64> = match config.objective {
            Objective::SoftmaxLoss => vec![0.0; k],
            Objective::LossRegression => (0..k)
                .map(|j| mean(&losses.iter().map(|row| row[j]).collect::<Vec<_>>()))
                .collect(),
        };
        let mut scores = vec![base.clone(); n];
        let mut trees: Vec<Vec<Tree<f64>>> = vec![Vec::with_capacity(config.n_rounds); k];
        let mut rng = StdRng::seed_from_u64(config.seed);

        let rows_per_round = ((config.subsample * n as f64).round() as usize).clamp(1, n);
        let cols_per_tree = ((config.colsample * p as f64).round() as usize).clamp(1, p.max(1));
        let limits = GrowLimits {
            max_depth: config.max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_gain: config.gamma.max(1e-12),
        };

        let mut objective_value = f64::NAN;
        for round in 0..config.n_rounds {
            let (grad, hess, value) = derivatives(config.objective, &scores, losses);
            if !value.is_finite() {
                return Err(ForecastError::TrainingConvergence(format!(
                    "objective is not finite at round {}",
                    round
                )));
            }
            objective_value = value;

            let mut rows = sample(&mut rng, n, rows_per_round).into_vec();
            rows.sort_unstable();
            let columns: Vec<Vec<usize>> = (0..k)
                .map(|_| {
                    let mut cols = sample(&mut rng, p, cols_per_tree).into_vec();
                    cols.sort_unstable();
                    cols
                })
                .collect();

            let round_trees: Vec<Tree<f64>> = (0..k)
                .into_par_iter()
                .map(|j| {
                    let newton = Newton {
                        gradients: &grad[j],
                        hessians: &hess[j],
                        lambda: config.lambda,
                        min_child_weight: config.min_child_weight,
                        max_delta_step: config.max_delta_step,
                        learning_rate: config.learning_rate,
                    };
                    grow_tree(&newton, x, &rows, FeatureChoice::Fixed(&columns[j]), limits).0
                })
                .collect();

            for (j, tree) in round_trees.into_iter().enumerate() {
                for (i, row) in x.iter().enumerate() {
                    scores[i][j] += tree.leaf(row);
                }
                trees[j].push(tree);
            }
        }

        let (_, _, final_value) = derivatives(config.objective, &scores, losses);
        if !final_value.is_finite() {
            return Err(ForecastError::TrainingConvergence(
                "objective is not finite after the last round".to_string(),
            ));
        }
        debug!(
            rounds = config.n_rounds,
            outputs = k,
            objective = final_value,
            previous = objective_value,
            "trained gradient boosting"
        );

        Ok(BoostedModel {
            objective: config.objective,
            base,
            trees,
            n_features: p,
            training_objective: final_value,
        })
    }
}

/// A trained boosted scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedModel {
    objective: Objective,
    base: Vec<f64>,
    /// `trees[j]` are the trees of output `j`, in round order.
    trees: Vec<Vec<Tree<f64>>>,
    n_features: usize,
    training_objective: f64,
}

impl BoostedModel {
    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Objective value on the training data after the last round.
    pub fn training_objective(&self) -> f64 {
        self.training_objective
    }

    /// Raw model output per candidate: logits, or predicted losses for
    /// [`Objective::LossRegression`].
    pub fn raw_output(&self, x: &[f64]) -> Vec<f64> {
        self.base
            .iter()
            .zip(&self.trees)
            .map(|(b, trees)| b + trees.iter().map(|t| t.leaf(x)).sum::<f64>())
            .collect()
    }
}

impl ScoreModel for BoostedModel {
    fn predict_scores(&self, x: &[f64]) -> Vec<f64> {
        let raw = self.raw_output(x);
        match self.objective {
            Objective::SoftmaxLoss => raw,
            Objective::LossRegression => raw.into_iter().map(|v| -v).collect(),
        }
    }

    fn n_outputs(&self) -> usize {
        self.base.len()
    }
}
