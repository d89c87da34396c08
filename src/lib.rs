//! # anofox-meta
//!
//! Feature-based forecast model selection and averaging.
//!
//! A corpus of time series is turned into training examples: statistical
//! features of each series paired with how well every candidate forecasting
//! procedure did on its hold-out. Two meta-learners are trained on them:
//!
//! - [`ModelSelector`](meta::ModelSelector) (FFORMS) picks one candidate per
//!   series with a random forest.
//! - [`ModelWeighter`](meta::ModelWeighter) (FFORMA) weights all candidates
//!   with gradient-boosted trees and averages their forecasts.
//!
//! # Example
//!
//! ```no_run
//! use anofox_meta::prelude::*;
//!
//! let corpus = simulate(&SimulationConfig::default()).unwrap();
//! let extractor = FeatureExtractor::default();
//! let examples = build_training_set(&corpus, &extractor, &DatasetConfig::default())
//!     .into_values();
//!
//! let weighter =
//!     ModelWeighter::train(&examples, extractor.config(), &WeighterConfig::default()).unwrap();
//! let combined = weighter.forecast(&corpus[0], 12).unwrap();
//! println!("{:?}", combined.forecast.point());
//! ```

#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::needless_range_loop)]

pub mod batch;
pub mod combine;
pub mod config;
pub mod core;
pub mod error;
pub mod features;
pub mod meta;
pub mod models;
pub mod seasonality;
pub mod simulate;
pub mod transform;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::batch::{extract_features_batch, run_batch, BatchResult, SeriesFailure};
    pub use crate::combine::combine_forecasts;
    pub use crate::config::MetaConfig;
    pub use crate::core::{Forecast, TimeSeries};
    pub use crate::error::{ForecastError, Result};
    pub use crate::features::{FeatureConfig, FeatureExtractor, FeatureSchema, FeatureVector};
    pub use crate::meta::{
        build_training_set, ClassWeighting, DatasetConfig, LossMetric, ModelSelector,
        ModelWeighter, ModelWeights, SelectorConfig, TrainingExample, WeightTransform,
        WeighterConfig,
    };
    pub use crate::models::{CandidateModel, Forecaster};
    pub use crate::simulate::{augment, simulate, SimulationConfig};
}
