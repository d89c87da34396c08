//! Feature-based model selection: a classifier from features to the best
//! candidate.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::features::{FeatureConfig, FeatureExtractor, FeatureSchema, FeatureVector};
use crate::meta::backend::{ClassifierBackend, ClassifierModel};
use crate::meta::dataset::TrainingExample;
use crate::meta::forest::{ForestConfig, ForestModel, RandomForest};
use crate::models::CandidateModel;
use crate::utils::stats::argmax;

/// How training rows are weighted against class imbalance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeighting {
    /// Every row counts once.
    #[default]
    Uniform,
    /// Rows of class `c` weigh `n / (K * n_c)`.
    Balanced,
}

impl ClassWeighting {
    /// One weight per label; `labels` index into `0..n_classes`.
    pub fn sample_weights(&self, labels: &[usize], n_classes: usize) -> Vec<f64> {
        match self {
            ClassWeighting::Uniform => vec![1.0; labels.len()],
            ClassWeighting::Balanced => {
                let mut counts = vec![0usize; n_classes];
                for &l in labels {
                    counts[l] += 1;
                }
                let n = labels.len() as f64;
                labels
                    .iter()
                    .map(|&l| n / (n_classes as f64 * counts[l] as f64))
                    .collect()
            }
        }
    }
}

/// Selector settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub forest: ForestConfig,
    pub class_weighting: ClassWeighting,
}

/// Outcome of selecting a model for one feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub model: CandidateModel,
    /// Probability of every class seen in training, in class order.
    pub probabilities: Vec<(CandidateModel, f64)>,
}

impl Selection {
    pub fn probability(&self, model: CandidateModel) -> f64 {
        self.probabilities
            .iter()
            .find(|(m, _)| *m == model)
            .map_or(0.0, |(_, p)| *p)
    }
}

/// Accuracy summary of a selector on labelled examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    pub n_examples: usize,
    pub accuracy: f64,
    /// Mean recall over the classes present in the evaluated examples.
    pub balanced_accuracy: f64,
    /// Recall per class present in the evaluated examples.
    pub per_class_recall: Vec<(CandidateModel, f64)>,
}

/// Labels and design matrix of examples, checked against one schema.
fn labelled_rows(
    examples: &[TrainingExample],
    schema: &FeatureSchema,
) -> Result<(Vec<Vec<f64>>, Vec<CandidateModel>)> {
    let mut x = Vec::with_capacity(examples.len());
    let mut labels = Vec::with_capacity(examples.len());
    for example in examples {
        example.features.ensure_compatible(schema)?;
        let label = example.label().ok_or_else(|| {
            ForecastError::InvalidParameter("example has no usable label".to_string())
        })?;
        x.push(example.features.values().to_vec());
        labels.push(label);
    }
    Ok((x, labels))
}

/// Trained model selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSelector<M = ForestModel> {
    feature_config: FeatureConfig,
    schema: FeatureSchema,
    classes: Vec<CandidateModel>,
    model: M,
}

impl ModelSelector<ForestModel> {
    /// Train the default random-forest selector.
    pub fn train(
        examples: &[TrainingExample],
        feature_config: &FeatureConfig,
        config: &SelectorConfig,
    ) -> Result<Self> {
        Self::train_with(
            examples,
            feature_config,
            &RandomForest::new(config.forest.clone()),
            config.class_weighting,
        )
    }

    /// Out-of-bag accuracy of the forest.
    pub fn oob_accuracy(&self) -> Option<f64> {
        self.model.oob_accuracy()
    }

    /// Feature importance by name, most important first.
    pub fn feature_importance(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .schema
            .names()
            .iter()
            .cloned()
            .zip(self.model.feature_importance().iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

impl<M: ClassifierModel> ModelSelector<M> {
    /// Train with any classifier back-end.
    ///
    /// The classes are the distinct labels of the examples, in candidate
    /// order. Every example must match the schema of `feature_config`.
    pub fn train_with<B>(
        examples: &[TrainingExample],
        feature_config: &FeatureConfig,
        backend: &B,
        weighting: ClassWeighting,
    ) -> Result<Self>
    where
        B: ClassifierBackend<Model = M>,
    {
        if examples.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        let schema = FeatureExtractor::new(feature_config.clone())?.schema().clone();
        let (x, labels) = labelled_rows(examples, &schema)?;

        let mut classes = labels.clone();
        classes.sort();
        classes.dedup();
        let indices: Vec<usize> = labels
            .iter()
            .map(|l| classes.iter().position(|c| c == l).unwrap_or(0))
            .collect();
        let weights = weighting.sample_weights(&indices, classes.len());

        let model = backend.train(&x, &indices, classes.len(), &weights)?;
        info!(
            examples = examples.len(),
            classes = classes.len(),
            weighting = ?weighting,
            "trained model selector"
        );
        Ok(Self {
            feature_config: feature_config.clone(),
            schema,
            classes,
            model,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn feature_config(&self) -> &FeatureConfig {
        &self.feature_config
    }

    /// Candidates the selector can choose from.
    pub fn classes(&self) -> &[CandidateModel] {
        &self.classes
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Most probable candidate for a feature vector.
    pub fn select(&self, features: &FeatureVector) -> Result<Selection> {
        features.ensure_compatible(&self.schema)?;
        let proba = self.model.predict_proba(features.values());
        if proba.len() != self.classes.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: self.classes.len(),
                got: proba.len(),
            });
        }
        let best = argmax(&proba).ok_or(ForecastError::EmptyData)?;
        Ok(Selection {
            model: self.classes[best],
            probabilities: self.classes.iter().copied().zip(proba).collect(),
        })
    }

    /// Extract features, select a candidate and forecast with it alone.
    pub fn forecast(&self, series: &TimeSeries, horizon: usize) -> Result<(Selection, Forecast)> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be positive".to_string(),
            ));
        }
        let features = FeatureExtractor::new(self.feature_config.clone())?.extract(series)?;
        let selection = self.select(&features)?;
        debug!(model = %selection.model, series = ?series.name(), "selected model");
        let forecast = selection.model.fit_and_forecast(series, horizon)?;
        Ok((selection, forecast))
    }

    /// Accuracy, balanced accuracy and per-class recall on labelled examples.
    pub fn evaluate(&self, examples: &[TrainingExample]) -> Result<SelectionReport> {
        if examples.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        let mut hits: Vec<(CandidateModel, usize, usize)> = Vec::new();
        let mut correct = 0;
        for example in examples {
            let truth = example.label().ok_or_else(|| {
                ForecastError::InvalidParameter("example has no usable label".to_string())
            })?;
            let predicted = self.select(&example.features)?.model;
            let hit = usize::from(predicted == truth);
            correct += hit;
            match hits.iter_mut().find(|(m, _, _)| *m == truth) {
                Some(entry) => {
                    entry.1 += hit;
                    entry.2 += 1;
                }
                None => hits.push((truth, hit, 1)),
            }
        }
        hits.sort_by_key(|(m, _, _)| *m);

        let per_class_recall: Vec<(CandidateModel, f64)> = hits
            .iter()
            .map(|&(m, hit, total)| (m, hit as f64 / total as f64))
            .collect();
        let balanced_accuracy =
            per_class_recall.iter().map(|(_, r)| r).sum::<f64>() / per_class_recall.len() as f64;
        Ok(SelectionReport {
            n_examples: examples.len(),
            accuracy: correct as f64 / examples.len() as f64,
            balanced_accuracy,
            per_class_recall,
        })
    }
}

impl<M: Serialize + DeserializeOwned> ModelSelector<M> {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Train one forest per class weighting and report each on a hold-out set.
pub fn compare_class_weightings(
    train: &[TrainingExample],
    holdout: &[TrainingExample],
    feature_config: &FeatureConfig,
    forest: &ForestConfig,
) -> Result<Vec<(ClassWeighting, SelectionReport)>> {
    [ClassWeighting::Uniform, ClassWeighting::Balanced]
        .into_iter()
        .map(|weighting| {
            let config = SelectorConfig {
                forest: forest.clone(),
                class_weighting: weighting,
            };
            let selector = ModelSelector::train(train, feature_config, &config)?;
            Ok((weighting, selector.evaluate(holdout)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Feature;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn corpus() -> (Vec<TrainingExample>, FeatureConfig) {
        let config = FeatureConfig::default();
        let extractor = FeatureExtractor::new(config.clone()).unwrap();
        let mut examples = Vec::new();
        for k in 0..12 {
            let slope = 0.5 + 0.1 * k as f64;
            let trend: Vec<f64> = (0..48)
                .map(|i| 20.0 + slope * i as f64 + 0.05 * ((i * (k + 3)) as f64).sin())
                .collect();
            let seasonal: Vec<f64> = (0..48)
                .map(|i| {
                    20.0 + (3.0 + k as f64 * 0.2) * (2.0 * PI * i as f64 / 12.0).sin()
                        + 0.05 * ((i * (k + 5)) as f64).cos()
                })
                .collect();
            examples.push(TrainingExample::labelled(
                extractor.extract(&TimeSeries::new(trend, 12).unwrap()).unwrap(),
                CandidateModel::RandomWalkDrift,
            ));
            examples.push(TrainingExample::labelled(
                extractor.extract(&TimeSeries::new(seasonal, 12).unwrap()).unwrap(),
                CandidateModel::SeasonalNaive,
            ));
        }
        (examples, config)
    }

    #[test]
    fn balanced_weights() {
        let w = ClassWeighting::Balanced.sample_weights(&[0, 0, 0, 1], 2);
        assert_relative_eq!(w[0], 4.0 / 6.0);
        assert_relative_eq!(w[3], 2.0);
        assert_eq!(ClassWeighting::Uniform.sample_weights(&[0, 1], 2), vec![1.0, 1.0]);
    }

    #[test]
    fn linear_trend_is_not_given_to_seasonal_naive() {
        let (examples, config) = corpus();
        let selector = ModelSelector::train(&examples, &config, &SelectorConfig::default()).unwrap();
        assert_eq!(
            selector.classes(),
            &[CandidateModel::SeasonalNaive, CandidateModel::RandomWalkDrift]
        );

        let line: Vec<f64> = (0..48).map(|i| 3.0 + 0.25 * i as f64).collect();
        let (selection, forecast) = selector
            .forecast(&TimeSeries::new(line, 12).unwrap(), 6)
            .unwrap();
        assert_eq!(selection.model, CandidateModel::RandomWalkDrift);
        assert_relative_eq!(
            selection.probabilities.iter().map(|(_, p)| p).sum::<f64>(),
            1.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(forecast.point()[0], 3.0 + 0.25 * 48.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let (examples, config) = corpus();
        let forest = ForestConfig::default().with_trees(10);
        let selector = ModelSelector::train(
            &examples,
            &config,
            &SelectorConfig {
                forest,
                class_weighting: ClassWeighting::Uniform,
            },
        )
        .unwrap();
        let line: Vec<f64> = (0..48).map(|i| 3.0 + 0.25 * i as f64).collect();
        assert!(matches!(
            selector.forecast(&TimeSeries::new(line, 12).unwrap(), 0),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn evaluation_on_training_data_is_accurate() {
        let (examples, config) = corpus();
        let selector = ModelSelector::train(&examples, &config, &SelectorConfig::default()).unwrap();
        let report = selector.evaluate(&examples).unwrap();
        assert_eq!(report.n_examples, 24);
        assert!(report.accuracy > 0.9);
        assert_eq!(report.per_class_recall.len(), 2);
    }

    #[test]
    fn json_round_trip_keeps_predictions() {
        let (examples, config) = corpus();
        let forest = ForestConfig::default().with_trees(20);
        let selector = ModelSelector::train(
            &examples,
            &config,
            &SelectorConfig {
                forest,
                class_weighting: ClassWeighting::Balanced,
            },
        )
        .unwrap();
        let restored = ModelSelector::<ForestModel>::from_json(&selector.to_json().unwrap()).unwrap();
        for example in &examples {
            let before = selector.select(&example.features).unwrap();
            let after = restored.select(&example.features).unwrap();
            assert_eq!(before.model, after.model);
            for ((m1, p1), (m2, p2)) in before.probabilities.iter().zip(&after.probabilities) {
                assert_eq!(m1, m2);
                assert_relative_eq!(*p1, *p2, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn mismatched_schema_is_rejected() {
        let (examples, config) = corpus();
        let selector = ModelSelector::train(&examples, &config, &SelectorConfig::default()).unwrap();

        let other = FeatureExtractor::new(FeatureConfig::default().with_boxcox(false)).unwrap();
        let line: Vec<f64> = (0..48).map(|i| 3.0 + i as f64).collect();
        let features = other.extract(&TimeSeries::new(line, 12).unwrap()).unwrap();
        assert!(matches!(
            selector.select(&features),
            Err(ForecastError::FeatureSchemaMismatch(_))
        ));

        let mismatched = ModelSelector::train(
            &examples,
            &FeatureConfig::default().with_boxcox(false),
            &SelectorConfig::default(),
        );
        assert!(matches!(mismatched, Err(ForecastError::FeatureSchemaMismatch(_))));
    }

    #[test]
    fn weightings_can_be_compared() {
        let (examples, config) = corpus();
        let (train, holdout) = examples.split_at(16);
        let reports = compare_class_weightings(
            train,
            holdout,
            &config,
            &ForestConfig::default().with_trees(25),
        )
        .unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].0, ClassWeighting::Uniform);
        for (_, report) in &reports {
            assert!(report.balanced_accuracy >= 0.0 && report.balanced_accuracy <= 1.0);
        }
    }

    /// 270 Naive rows spread over [0, 1); 30 Theta rows interleaved in [0.6, 1).
    fn imbalanced() -> (Vec<TrainingExample>, FeatureConfig) {
        let config = FeatureConfig::default().with_features(vec![Feature::Trend]);
        let schema = FeatureExtractor::new(config.clone()).unwrap().schema_handle();
        let row = |x: f64, model| {
            TrainingExample::labelled(FeatureVector::new(schema.clone(), vec![x]).unwrap(), model)
        };
        let mut examples: Vec<TrainingExample> = (0..270)
            .map(|i| row(i as f64 / 270.0, CandidateModel::Naive))
            .collect();
        examples.extend((0..30).map(|j| row(0.6 + 0.4 * j as f64 / 30.0, CandidateModel::Theta)));
        (examples, config)
    }

    fn minority_recall(report: &SelectionReport) -> f64 {
        report
            .per_class_recall
            .iter()
            .find(|(m, _)| *m == CandidateModel::Theta)
            .map(|(_, r)| *r)
            .unwrap()
    }

    #[test]
    fn balanced_weighting_recovers_minority_class() {
        let (examples, config) = imbalanced();
        let mut forest = ForestConfig::default().with_trees(30).with_max_depth(2);
        forest.min_samples_leaf = 10;
        let train = |class_weighting| {
            ModelSelector::train(
                &examples,
                &config,
                &SelectorConfig {
                    forest: forest.clone(),
                    class_weighting,
                },
            )
            .unwrap()
            .evaluate(&examples)
            .unwrap()
        };
        let uniform = train(ClassWeighting::Uniform);
        let balanced = train(ClassWeighting::Balanced);

        assert!(minority_recall(&uniform) < 0.2);
        assert!(minority_recall(&balanced) > 0.8);
        assert!(balanced.balanced_accuracy > uniform.balanced_accuracy);
    }
}
