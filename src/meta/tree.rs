//! Binary decision trees grown by exhaustive threshold search.
//!
//! Nodes live in a flat arena indexed by position; the root is node 0. The
//! split criterion is pluggable so the same grower serves the weighted-Gini
//! classification trees of the forest and the second-order regression trees
//! of the booster.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

/// A node of a fitted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node<T> {
    Leaf(T),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree whose leaves carry values of type `T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Tree<T> {
    /// Leaf value reached by `x`. Missing feature values go left.
    pub fn leaf(&self, x: &[f64]) -> &T {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = x.get(*feature).copied().unwrap_or(f64::NAN);
                    idx = if value > *threshold { *right } else { *left };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk<T>(nodes: &[Node<T>], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Split criterion: per-sample sufficient statistics and a node score.
///
/// The gain of a split is `score(left) + score(right) - score(parent)`.
pub trait Criterion {
    type Stats: Clone;
    type Leaf;

    fn empty(&self) -> Self::Stats;
    fn add(&self, stats: &mut Self::Stats, sample: usize);
    fn remove(&self, stats: &mut Self::Stats, sample: usize);
    fn score(&self, stats: &Self::Stats) -> f64;
    /// Whether a child with these statistics may be created.
    fn admissible(&self, stats: &Self::Stats) -> bool;
    fn leaf(&self, stats: &Self::Stats) -> Self::Leaf;
}

/// How candidate features are drawn at each node.
pub enum FeatureChoice<'a> {
    /// `mtry` features sampled without replacement at every node.
    PerNode { mtry: usize, rng: &'a mut StdRng },
    /// A fixed subset used for every node.
    Fixed(&'a [usize]),
}

/// Structural limits for growing a tree.
#[derive(Debug, Clone, Copy)]
pub struct GrowLimits {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Splits must improve the score by more than this.
    pub min_gain: f64,
}

struct Grower<'a, C: Criterion> {
    criterion: &'a C,
    x: &'a [Vec<f64>],
    limits: GrowLimits,
    features: FeatureChoice<'a>,
    n_features: usize,
    importance: Vec<f64>,
    nodes: Vec<Node<C::Leaf>>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl<C: Criterion> Grower<'_, C> {
    fn candidate_features(&mut self) -> Vec<usize> {
        match &mut self.features {
            FeatureChoice::PerNode { mtry, rng } => {
                let amount = (*mtry).clamp(1, self.n_features);
                sample(&mut **rng, self.n_features, amount).into_vec()
            }
            FeatureChoice::Fixed(subset) => subset.to_vec(),
        }
    }

    fn best_split(&mut self, samples: &[usize], total: &C::Stats) -> Option<BestSplit> {
        let parent = self.criterion.score(total);
        let min_leaf = self.limits.min_samples_leaf.max(1);
        let mut best: Option<BestSplit> = None;

        for feature in self.candidate_features() {
            let mut order: Vec<usize> = samples.to_vec();
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left = self.criterion.empty();
            let mut right = total.clone();
            for i in 0..order.len() - 1 {
                self.criterion.add(&mut left, order[i]);
                self.criterion.remove(&mut right, order[i]);

                let here = self.x[order[i]][feature];
                let next = self.x[order[i + 1]][feature];
                if here == next || i + 1 < min_leaf || order.len() - i - 1 < min_leaf {
                    continue;
                }
                if !self.criterion.admissible(&left) || !self.criterion.admissible(&right) {
                    continue;
                }
                let gain = self.criterion.score(&left) + self.criterion.score(&right) - parent;
                if gain > self.limits.min_gain && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: 0.5 * (here + next),
                        gain,
                    });
                }
            }
        }
        best
    }

    fn grow(&mut self, samples: &[usize], depth: usize) -> usize {
        let mut total = self.criterion.empty();
        for &s in samples {
            self.criterion.add(&mut total, s);
        }

        let idx = self.nodes.len();
        let can_split = depth < self.limits.max_depth
            && samples.len() >= self.limits.min_samples_split.max(2)
            && self.n_features > 0;
        let split = if can_split {
            self.best_split(samples, &total)
        } else {
            None
        };

        let Some(split) = split else {
            self.nodes.push(Node::Leaf(self.criterion.leaf(&total)));
            return idx;
        };

        self.importance[split.feature] += split.gain;
        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .copied()
            .partition(|&s| self.x[s][split.feature] <= split.threshold);

        // Placeholder until the children exist.
        self.nodes.push(Node::Leaf(self.criterion.leaf(&total)));
        let left = self.grow(&left_samples, depth + 1);
        let right = self.grow(&right_samples, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }
}

/// Grow a tree on `samples` (row indices into `x`).
///
/// Returns the tree and the total gain credited to each feature.
pub fn grow_tree<C: Criterion>(
    criterion: &C,
    x: &[Vec<f64>],
    samples: &[usize],
    features: FeatureChoice<'_>,
    limits: GrowLimits,
) -> (Tree<C::Leaf>, Vec<f64>) {
    let n_features = x.first().map_or(0, Vec::len);
    let mut grower = Grower {
        criterion,
        x,
        limits,
        features,
        n_features,
        importance: vec![0.0; n_features],
        nodes: Vec::new(),
    };
    grower.grow(samples, 0);
    (
        Tree {
            nodes: grower.nodes,
        },
        grower.importance,
    )
}

/// Weighted Gini impurity over class labels.
///
/// The score of a node is `-W * gini = sum(w_c^2) / W - W`, so the gain is the
/// weighted impurity decrease.
pub struct Gini<'a> {
    pub labels: &'a [usize],
    /// Per-row weight (sample weight times bootstrap multiplicity).
    pub weights: &'a [f64],
    pub n_classes: usize,
}

impl Criterion for Gini<'_> {
    type Stats = Vec<f64>;
    type Leaf = Vec<f64>;

    fn empty(&self) -> Vec<f64> {
        vec![0.0; self.n_classes]
    }

    fn add(&self, stats: &mut Vec<f64>, sample: usize) {
        stats[self.labels[sample]] += self.weights[sample];
    }

    fn remove(&self, stats: &mut Vec<f64>, sample: usize) {
        stats[self.labels[sample]] -= self.weights[sample];
    }

    fn score(&self, stats: &Vec<f64>) -> f64 {
        let total: f64 = stats.iter().sum();
        if total <= 0.0 {
            return 0.0;
        }
        stats.iter().map(|w| w * w).sum::<f64>() / total - total
    }

    fn admissible(&self, stats: &Vec<f64>) -> bool {
        stats.iter().sum::<f64>() > 0.0
    }

    fn leaf(&self, stats: &Vec<f64>) -> Vec<f64> {
        let total: f64 = stats.iter().sum();
        if total <= 0.0 {
            return vec![1.0 / self.n_classes as f64; self.n_classes];
        }
        stats.iter().map(|w| (w / total).max(0.0)).collect()
    }
}

/// Second-order (Newton) regression criterion with L2 leaf regularization.
pub struct Newton<'a> {
    pub gradients: &'a [f64],
    pub hessians: &'a [f64],
    pub lambda: f64,
    pub min_child_weight: f64,
    /// Absolute bound on the raw leaf weight; 0 disables clipping.
    pub max_delta_step: f64,
    /// Shrinkage applied to the leaf weight.
    pub learning_rate: f64,
}

impl Criterion for Newton<'_> {
    /// `(sum of gradients, sum of hessians)`
    type Stats = (f64, f64);
    type Leaf = f64;

    fn empty(&self) -> (f64, f64) {
        (0.0, 0.0)
    }

    fn add(&self, stats: &mut (f64, f64), sample: usize) {
        stats.0 += self.gradients[sample];
        stats.1 += self.hessians[sample];
    }

    fn remove(&self, stats: &mut (f64, f64), sample: usize) {
        stats.0 -= self.gradients[sample];
        stats.1 -= self.hessians[sample];
    }

    fn score(&self, stats: &(f64, f64)) -> f64 {
        stats.0 * stats.0 / (stats.1 + self.lambda)
    }

    fn admissible(&self, stats: &(f64, f64)) -> bool {
        stats.1 >= self.min_child_weight
    }

    fn leaf(&self, stats: &(f64, f64)) -> f64 {
        let mut weight = -stats.0 / (stats.1 + self.lambda);
        if self.max_delta_step > 0.0 {
            weight = weight.clamp(-self.max_delta_step, self.max_delta_step);
        }
        weight * self.learning_rate
    }
}
