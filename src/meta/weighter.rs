//! Feature-based forecast averaging: a boosted scorer from features to
//! per-candidate combination weights.

use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::batch::{run_batch, BatchResult};
use crate::combine::combine_forecasts;
use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::features::{FeatureConfig, FeatureExtractor, FeatureSchema, FeatureVector};
use crate::meta::backend::{ScoreBackend, ScoreModel};
use crate::meta::boosting::{BoostedModel, BoostingConfig, GradientBoosting};
use crate::meta::dataset::{forecast_or_fallback, TrainingExample};
use crate::meta::weights::{ModelWeights, WeightTransform};
use crate::models::CandidateModel;

/// Weighter settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeighterConfig {
    pub boosting: BoostingConfig,
    pub transform: WeightTransform,
}

/// A combined forecast together with what went into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedForecast {
    pub forecast: Forecast,
    pub weights: ModelWeights,
    /// Forecast of every candidate, in candidate order.
    pub components: Vec<(CandidateModel, Forecast)>,
    /// Candidates whose component is the seasonal naive stand-in.
    #[serde(default)]
    pub fallbacks: Vec<CandidateModel>,
}

/// Trained model weighter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeighter<M = BoostedModel> {
    feature_config: FeatureConfig,
    schema: FeatureSchema,
    candidates: Vec<CandidateModel>,
    transform: WeightTransform,
    model: M,
}

/// Loss matrix in the candidate order of the first example.
fn loss_matrix(
    examples: &[TrainingExample],
    schema: &FeatureSchema,
) -> Result<(Vec<Vec<f64>>, Vec<CandidateModel>, Vec<Vec<f64>>)> {
    let first = examples[0].losses().ok_or_else(|| {
        ForecastError::InvalidParameter("weighter examples must carry losses".to_string())
    })?;
    let candidates: Vec<CandidateModel> = first.iter().map(|(m, _)| *m).collect();

    let mut x = Vec::with_capacity(examples.len());
    let mut losses = Vec::with_capacity(examples.len());
    for example in examples {
        example.features.ensure_compatible(schema)?;
        let row = example.losses().ok_or_else(|| {
            ForecastError::InvalidParameter("weighter examples must carry losses".to_string())
        })?;
        let aligned: Option<Vec<f64>> = candidates
            .iter()
            .map(|c| row.iter().find(|(m, _)| m == c).map(|(_, l)| *l))
            .collect();
        match aligned {
            Some(values) if row.len() == candidates.len() => losses.push(values),
            _ => {
                return Err(ForecastError::MismatchedModelSet {
                    weights: candidates.iter().map(|m| m.name().to_string()).collect(),
                    forecasts: row.iter().map(|(m, _)| m.name().to_string()).collect(),
                })
            }
        }
        x.push(example.features.values().to_vec());
    }
    Ok((x, candidates, losses))
}

impl ModelWeighter<BoostedModel> {
    /// Train the default gradient-boosted weighter.
    pub fn train(
        examples: &[TrainingExample],
        feature_config: &FeatureConfig,
        config: &WeighterConfig,
    ) -> Result<Self> {
        Self::train_with(
            examples,
            feature_config,
            &GradientBoosting::new(config.boosting.clone()),
            config.transform,
        )
    }
}

impl<M: ScoreModel + Sync> ModelWeighter<M> {
    /// Train with any scorer back-end.
    ///
    /// Every example must carry a loss for the same candidate set and match
    /// the schema of `feature_config`.
    pub fn train_with<B>(
        examples: &[TrainingExample],
        feature_config: &FeatureConfig,
        backend: &B,
        transform: WeightTransform,
    ) -> Result<Self>
    where
        B: ScoreBackend<Model = M>,
    {
        if examples.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        // Rejects an invalid temperature before any training.
        transform.apply(&[0.0])?;
        let schema = FeatureExtractor::new(feature_config.clone())?.schema().clone();
        let (x, candidates, losses) = loss_matrix(examples, &schema)?;

        let model = backend.train(&x, &losses)?;
        if model.n_outputs() != candidates.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: candidates.len(),
                got: model.n_outputs(),
            });
        }
        info!(
            examples = examples.len(),
            candidates = candidates.len(),
            "trained model weighter"
        );
        Ok(Self {
            feature_config: feature_config.clone(),
            schema,
            candidates,
            transform,
            model,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn feature_config(&self) -> &FeatureConfig {
        &self.feature_config
    }

    pub fn candidates(&self) -> &[CandidateModel] {
        &self.candidates
    }

    pub fn transform(&self) -> WeightTransform {
        self.transform
    }

    /// Replace the score-to-weight policy without retraining.
    pub fn with_transform(mut self, transform: WeightTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Raw per-candidate scores (higher is better).
    pub fn scores(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        features.ensure_compatible(&self.schema)?;
        Ok(self.model.predict_scores(features.values()))
    }

    /// Combination weights for a feature vector.
    pub fn weights(&self, features: &FeatureVector) -> Result<ModelWeights> {
        let scores = self.scores(features)?;
        ModelWeights::from_scores(&self.candidates, &scores, self.transform)
    }

    /// Weighted combination of every candidate's point forecast.
    pub fn forecast(&self, series: &TimeSeries, horizon: usize) -> Result<CombinedForecast> {
        self.combine(series, horizon, None)
    }

    /// As [`forecast`](Self::forecast), with intervals averaged at `level`.
    pub fn forecast_with_intervals(
        &self,
        series: &TimeSeries,
        horizon: usize,
        level: f64,
    ) -> Result<CombinedForecast> {
        self.combine(series, horizon, Some(level))
    }

    /// Combined forecasts for many series, in parallel.
    pub fn forecast_batch(
        &self,
        series: &[TimeSeries],
        horizon: usize,
    ) -> BatchResult<CombinedForecast> {
        run_batch(series, |s| self.forecast(s, horizon))
    }

    fn combine(
        &self,
        series: &TimeSeries,
        horizon: usize,
        level: Option<f64>,
    ) -> Result<CombinedForecast> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be positive".to_string(),
            ));
        }
        let features = FeatureExtractor::new(self.feature_config.clone())?.extract(series)?;
        let weights = self.weights(&features)?;
        let (best, best_weight) = weights.best();
        debug!(series = ?series.name(), model = %best, weight = best_weight, "combination weights");

        let outcomes = self
            .candidates
            .par_iter()
            .map(|&m| forecast_or_fallback(m, series, horizon, level).map(|(f, sub)| (m, f, sub)))
            .collect::<Result<Vec<_>>>()?;
        let fallbacks: Vec<CandidateModel> =
            outcomes.iter().filter(|(_, _, sub)| *sub).map(|(m, _, _)| *m).collect();
        let components: Vec<(CandidateModel, Forecast)> =
            outcomes.into_iter().map(|(m, f, _)| (m, f)).collect();
        let forecast = combine_forecasts(&weights, &components)?;
        Ok(CombinedForecast {
            forecast,
            weights,
            components,
            fallbacks,
        })
    }
}

impl<M: Serialize + DeserializeOwned> ModelWeighter<M> {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
