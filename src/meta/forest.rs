//! Random forest classifier.
//!
//! CART trees on weighted Gini impurity, grown in parallel on bootstrap
//! resamples with `sqrt(p)` candidate features per split. Tree `i` draws from
//! an RNG seeded with `seed + i`, so the forest does not depend on how rayon
//! schedules the work.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ForecastError, Result};
use crate::meta::backend::{check_design, ClassifierBackend, ClassifierModel};
use crate::meta::tree::{grow_tree, FeatureChoice, Gini, GrowLimits, Tree};
use crate::utils::stats::argmax;

/// Random forest hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// Maximum tree depth (`None` = grow until pure).
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split (`None` = `sqrt(p)`).
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    pub fn with_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(ForecastError::InvalidParameter(
                "a forest needs at least one tree".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Random forest trainer.
#[derive(Debug, Clone, Default)]
pub struct RandomForest {
    config: ForestConfig,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

/// One grown tree plus its out-of-bag rows and feature credit.
struct GrownTree {
    tree: Tree<Vec<f64>>,
    out_of_bag: Vec<usize>,
    importance: Vec<f64>,
}

impl ClassifierBackend for RandomForest {
    type Model = ForestModel;

    fn train(
        &self,
        x: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        sample_weights: &[f64],
    ) -> Result<ForestModel> {
        self.config.validate()?;
        let p = check_design(x, labels.len())?;
        let n = x.len();
        if sample_weights.len() != n {
            return Err(ForecastError::DimensionMismatch {
                expected: n,
                got: sample_weights.len(),
            });
        }
        if n_classes == 0 || labels.iter().any(|&l| l >= n_classes) {
            return Err(ForecastError::InvalidParameter(format!(
                "labels must lie in 0..{}",
                n_classes
            )));
        }
        if sample_weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ForecastError::InvalidParameter(
                "sample weights must be finite and non-negative".to_string(),
            ));
        }

        let config = &self.config;
        let mtry = config
            .max_features
            .unwrap_or_else(|| (p as f64).sqrt().round() as usize)
            .clamp(1, p.max(1));
        let limits = GrowLimits {
            max_depth: config.max_depth.unwrap_or(usize::MAX),
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            min_gain: 1e-12,
        };

        let grown: Vec<GrownTree> = (0..config.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(i as u64));
                let mut counts = vec![0usize; n];
                if config.bootstrap {
                    for _ in 0..n {
                        counts[rng.gen_range(0..n)] += 1;
                    }
                } else {
                    counts.iter_mut().for_each(|c| *c = 1);
                }

                let weights: Vec<f64> = counts
                    .iter()
                    .zip(sample_weights)
                    .map(|(&c, &w)| c as f64 * w)
                    .collect();
                let in_bag: Vec<usize> = (0..n).filter(|&r| counts[r] > 0).collect();
                let out_of_bag: Vec<usize> = (0..n).filter(|&r| counts[r] == 0).collect();

                let gini = Gini {
                    labels,
                    weights: &weights,
                    n_classes,
                };
                let (tree, importance) = grow_tree(
                    &gini,
                    x,
                    &in_bag,
                    FeatureChoice::PerNode { mtry, rng: &mut rng },
                    limits,
                );
                GrownTree {
                    tree,
                    out_of_bag,
                    importance,
                }
            })
            .collect();

        let oob_accuracy = oob_accuracy(&grown, x, labels, n_classes);

        let mut importance = vec![0.0; p];
        for g in &grown {
            for (total, v) in importance.iter_mut().zip(&g.importance) {
                *total += v;
            }
        }
        let sum: f64 = importance.iter().sum();
        if sum > 0.0 {
            importance.iter_mut().for_each(|v| *v /= sum);
        }

        debug!(
            trees = grown.len(),
            n_samples = n,
            n_features = p,
            oob_accuracy = ?oob_accuracy,
            "trained random forest"
        );

        Ok(ForestModel {
            trees: grown.into_iter().map(|g| g.tree).collect(),
            n_classes,
            n_features: p,
            oob_accuracy,
            importance,
        })
    }
}

/// Accuracy of the averaged out-of-bag votes over rows that were left out by
/// at least one tree.
fn oob_accuracy(
    grown: &[GrownTree],
    x: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
) -> Option<f64> {
    let mut votes = vec![vec![0.0; n_classes]; x.len()];
    let mut seen = vec![false; x.len()];
    for g in grown {
        for &row in &g.out_of_bag {
            for (v, p) in votes[row].iter_mut().zip(g.tree.leaf(&x[row])) {
                *v += p;
            }
            seen[row] = true;
        }
    }

    let (mut correct, mut total) = (0usize, 0usize);
    for row in 0..x.len() {
        if seen[row] {
            total += 1;
            if argmax(&votes[row]) == Some(labels[row]) {
                correct += 1;
            }
        }
    }
    (total > 0).then(|| correct as f64 / total as f64)
}

/// A trained random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    trees: Vec<Tree<Vec<f64>>>,
    n_classes: usize,
    n_features: usize,
    oob_accuracy: Option<f64>,
    importance: Vec<f64>,
}

impl ForestModel {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Out-of-bag accuracy, when bootstrapping left rows out.
    pub fn oob_accuracy(&self) -> Option<f64> {
        self.oob_accuracy
    }

    /// Impurity-decrease importance per feature, normalized to sum to 1.
    pub fn feature_importance(&self) -> &[f64] {
        &self.importance
    }
}

impl ClassifierModel for ForestModel {
    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.leaf(x)) {
                *acc += p;
            }
        }
        let total: f64 = proba.iter().sum();
        if total > 0.0 {
            proba.iter_mut().for_each(|p| *p /= total);
        }
        proba
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}
