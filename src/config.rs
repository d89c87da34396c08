//! Aggregate configuration, loadable from TOML.
//!
//! Every section and every field is optional; missing values take their
//! defaults.
//!
//! ```toml
//! [features]
//! boxcox = false
//!
//! [dataset]
//! metric = "mase"
//! horizon = 12
//! candidates = ["Naive", "Theta", "Ets"]
//!
//! [selector]
//! class_weighting = "balanced"
//!
//! [selector.forest]
//! n_trees = 300
//!
//! [weighter.boosting]
//! n_rounds = 200
//!
//! [weighter.transform]
//! kind = "softmax"
//! temperature = 0.5
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::features::FeatureConfig;
use crate::meta::{DatasetConfig, SelectorConfig, WeighterConfig};
use crate::simulate::SimulationConfig;

/// Settings for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaConfig {
    pub features: FeatureConfig,
    pub dataset: DatasetConfig,
    pub selector: SelectorConfig,
    pub weighter: WeighterConfig,
    pub simulation: SimulationConfig,
}

impl MetaConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ForecastError::Config(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ForecastError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ForecastError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{ClassWeighting, LossMetric, WeightTransform};
    use crate::models::CandidateModel;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(MetaConfig::from_toml_str("").unwrap(), MetaConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = MetaConfig::from_toml_str(
            r#"
            [features]
            boxcox = false

            [dataset]
            metric = "mase"
            horizon = 12
            candidates = ["Naive", "Theta", "Ets"]

            [selector]
            class_weighting = "balanced"

            [selector.forest]
            n_trees = 300

            [weighter.transform]
            kind = "softmax"
            temperature = 0.5
            "#,
        )
        .unwrap();

        assert!(!config.features.boxcox);
        assert_eq!(config.features.min_length, FeatureConfig::default().min_length);
        assert_eq!(config.dataset.metric, LossMetric::Mase);
        assert_eq!(config.dataset.horizon, 12);
        assert_eq!(
            config.dataset.candidates,
            vec![CandidateModel::Naive, CandidateModel::Theta, CandidateModel::Ets]
        );
        assert_eq!(config.selector.class_weighting, ClassWeighting::Balanced);
        assert_eq!(config.selector.forest.n_trees, 300);
        assert_eq!(config.selector.forest.seed, 42);
        assert_eq!(
            config.weighter.transform,
            WeightTransform::Softmax { temperature: 0.5 }
        );
        assert_eq!(config.weighter.boosting.n_rounds, 94);
    }

    #[test]
    fn unit_transform_variants_parse() {
        let config =
            MetaConfig::from_toml_str("[weighter.transform]\nkind = \"arg_max\"\n").unwrap();
        assert_eq!(config.weighter.transform, WeightTransform::ArgMax);
    }

    #[test]
    fn bad_values_are_config_errors() {
        let err = MetaConfig::from_toml_str("[dataset]\nmetric = \"rmse\"\n").unwrap_err();
        assert!(matches!(err, ForecastError::Config(_)));
        let err = MetaConfig::from_path("/nonexistent/meta.toml").unwrap_err();
        assert!(matches!(err, ForecastError::Config(_)));
    }

    #[test]
    fn default_round_trips_through_toml() {
        let config = MetaConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(MetaConfig::from_toml_str(&text).unwrap(), config);
    }
}
