//! Meta-learners over time series features.
//!
//! Two ways of turning features into forecasts:
//!
//! - [`ModelSelector`] classifies a series into the candidate expected to
//!   forecast it best and runs only that candidate.
//! - [`ModelWeighter`] scores every candidate, turns the scores into
//!   [`ModelWeights`] and averages all candidate forecasts.
//!
//! Both are trained on [`TrainingExample`]s built by
//! [`build_training_set`], and both plug into any learner implementing the
//! traits in [`backend`].

pub mod backend;
pub mod boosting;
pub mod dataset;
pub mod forest;
pub mod selector;
pub mod tree;
pub mod weighter;
pub mod weights;

pub use backend::{ClassifierBackend, ClassifierModel, ScoreBackend, ScoreModel};
pub use boosting::{BoostedModel, BoostingConfig, GradientBoosting, Objective};
pub use dataset::{
    build_training_set, candidate_losses, DatasetConfig, LossMetric, Target, TrainingExample,
};
pub use forest::{ForestConfig, ForestModel, RandomForest};
pub use selector::{
    compare_class_weightings, ClassWeighting, ModelSelector, Selection, SelectionReport,
    SelectorConfig,
};
pub use weighter::{CombinedForecast, ModelWeighter, WeighterConfig};
pub use weights::{softmax, ModelWeights, WeightTransform};
