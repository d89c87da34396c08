//! Training examples for the meta-learners.
//!
//! Every series of a corpus is split into a training and a test part; the
//! features come from the training part and every candidate is scored on the
//! test part.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::batch::{run_batch, BatchResult};
use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::features::{FeatureExtractor, FeatureVector};
use crate::models::baseline::Naive2;
use crate::models::{CandidateModel, Forecaster};
use crate::utils::metrics::{mase, owa, smape};

/// Accuracy measure used as the per-candidate loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossMetric {
    /// Mean absolute scaled error.
    Mase,
    /// Symmetric MAPE, in percent.
    Smape,
    /// Overall weighted average relative to Naive2.
    #[default]
    Owa,
}

/// What a training example teaches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// The best model only.
    Label(CandidateModel),
    /// The loss of every candidate.
    Losses(Vec<(CandidateModel, f64)>),
}

/// Features of one series and its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub features: FeatureVector,
    pub target: Target,
}

impl TrainingExample {
    pub fn labelled(features: FeatureVector, model: CandidateModel) -> Self {
        Self {
            features,
            target: Target::Label(model),
        }
    }

    pub fn with_losses(features: FeatureVector, losses: Vec<(CandidateModel, f64)>) -> Self {
        Self {
            features,
            target: Target::Losses(losses),
        }
    }

    /// The best model: the label itself or the loss arg-min (first on ties).
    pub fn label(&self) -> Option<CandidateModel> {
        match &self.target {
            Target::Label(model) => Some(*model),
            Target::Losses(losses) => losses
                .iter()
                .filter(|(_, l)| !l.is_nan())
                .fold(None, |best: Option<(CandidateModel, f64)>, &(m, l)| match best {
                    Some((_, b)) if b <= l => best,
                    _ => Some((m, l)),
                })
                .map(|(m, _)| m),
        }
    }

    pub fn losses(&self) -> Option<&[(CandidateModel, f64)]> {
        match &self.target {
            Target::Losses(losses) => Some(losses),
            Target::Label(_) => None,
        }
    }
}

/// Settings for building training examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub candidates: Vec<CandidateModel>,
    pub metric: LossMetric,
    /// Held-out length for series without a split point.
    pub horizon: usize,
    /// Replacement for infinite or undefined losses.
    pub loss_cap: f64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            candidates: CandidateModel::ALL.to_vec(),
            metric: LossMetric::Owa,
            horizon: 8,
            loss_cap: 1e3,
        }
    }
}

impl DatasetConfig {
    pub fn with_candidates(mut self, candidates: Vec<CandidateModel>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_metric(mut self, metric: LossMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.candidates.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "at least one candidate model is required".to_string(),
            ));
        }
        if !(self.loss_cap > 0.0 && self.loss_cap.is_finite()) {
            return Err(ForecastError::InvalidParameter(
                "loss_cap must be positive and finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Forecast of `model`, or the seasonal naive forecast when `model` fails
/// or produces non-finite values. The flag is `true` when the seasonal naive
/// forecast was substituted.
pub(crate) fn forecast_or_fallback(
    model: CandidateModel,
    series: &TimeSeries,
    horizon: usize,
    level: Option<f64>,
) -> Result<(Forecast, bool)> {
    let run = |m: CandidateModel| match level {
        Some(level) => m.fit_and_forecast_with_intervals(series, horizon, level),
        None => m.fit_and_forecast(series, horizon),
    };
    match run(model) {
        Ok(f) if f.is_finite() && f.horizon() == horizon => Ok((f, false)),
        outcome => {
            let reason = match outcome {
                Err(e) => e.to_string(),
                Ok(_) => "non-finite forecast".to_string(),
            };
            warn!(
                model = %model,
                series = ?series.name(),
                %reason,
                "candidate failed, using seasonal naive forecast"
            );
            Ok((run(CandidateModel::SeasonalNaive)?, true))
        }
    }
}

/// Loss of every configured candidate on the test part of `series`.
///
/// Uses the split point of the series, or holds out `config.horizon`
/// observations when there is none. Returns the training part as well.
pub fn candidate_losses(
    series: &TimeSeries,
    config: &DatasetConfig,
) -> Result<(TimeSeries, Vec<(CandidateModel, f64)>)> {
    config.validate()?;
    let split = match series.split_point() {
        Some(_) => series.clone(),
        None => {
            let cut = series.len().checked_sub(config.horizon).ok_or(
                ForecastError::InsufficientData {
                    needed: config.horizon + 1,
                    got: series.len(),
                },
            )?;
            series.with_split(cut)?
        }
    };
    let train = split.train();
    let test = split.test();
    let horizon = test.len();
    let period = train.period();

    let benchmark = match config.metric {
        LossMetric::Owa => {
            let mut naive2 = Naive2::new(period);
            naive2.fit(&train)?;
            let f = naive2.predict(horizon)?;
            Some((
                smape(test, f.point())?,
                mase(train.values(), test, f.point(), period)?,
            ))
        }
        _ => None,
    };

    let mut losses = Vec::with_capacity(config.candidates.len());
    for &model in &config.candidates {
        let (forecast, _) = forecast_or_fallback(model, &train, horizon, None)?;
        let predicted = forecast.point();
        let loss = match (config.metric, benchmark) {
            (LossMetric::Mase, _) => mase(train.values(), test, predicted, period)?,
            (LossMetric::Smape, _) => smape(test, predicted)?,
            (LossMetric::Owa, Some((bench_smape, bench_mase))) => owa(
                smape(test, predicted)?,
                mase(train.values(), test, predicted, period)?,
                bench_smape,
                bench_mase,
            ),
            (LossMetric::Owa, None) => f64::NAN,
        };
        let loss = if loss.is_finite() {
            loss
        } else {
            config.loss_cap
        };
        losses.push((model, loss.min(config.loss_cap)));
    }
    Ok((train, losses))
}

/// Build one loss-carrying example per series, in parallel.
pub fn build_training_set(
    series: &[TimeSeries],
    extractor: &FeatureExtractor,
    config: &DatasetConfig,
) -> BatchResult<TrainingExample> {
    let result = run_batch(series, |s| {
        let (train, losses) = candidate_losses(s, config)?;
        let features = extractor.extract(&train)?;
        Ok(TrainingExample::with_losses(features, losses))
    });
    info!(
        series = series.len(),
        examples = result.successes().len(),
        failures = result.failures().len(),
        metric = ?config.metric,
        "built training set"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::features::FeatureSchema;

    fn trending(n: usize) -> TimeSeries {
        let values: Vec<f64> = (0..n).map(|i| 50.0 + 2.0 * i as f64).collect();
        TimeSeries::new(values, 1).unwrap()
    }

    #[test]
    fn label_is_loss_argmin() {
        let extractor = FeatureExtractor::default();
        let features = extractor.extract(&trending(40)).unwrap();
        let example = TrainingExample::with_losses(
            features.clone(),
            vec![
                (CandidateModel::Naive, 2.0),
                (CandidateModel::Theta, 0.5),
                (CandidateModel::Ets, 0.5),
            ],
        );
        assert_eq!(example.label(), Some(CandidateModel::Theta));
        assert_eq!(
            TrainingExample::labelled(features, CandidateModel::Arima).label(),
            Some(CandidateModel::Arima)
        );
    }

    #[test]
    fn failed_candidate_is_flagged_as_substituted() {
        let short = TimeSeries::new(vec![1.0, 2.0, 3.0], 1).unwrap();
        let (forecast, substituted) =
            forecast_or_fallback(CandidateModel::Theta, &short, 2, None).unwrap();
        assert!(substituted);
        assert_eq!(forecast.point(), &[3.0, 3.0]);

        let (_, substituted) =
            forecast_or_fallback(CandidateModel::Naive, &short, 2, None).unwrap();
        assert!(!substituted);
    }

    #[test]
    fn drift_beats_naive_on_a_line() {
        let config = DatasetConfig::default()
            .with_candidates(vec![CandidateModel::Naive, CandidateModel::RandomWalkDrift])
            .with_metric(LossMetric::Mase)
            .with_horizon(6);
        let (train, losses) = candidate_losses(&trending(40), &config).unwrap();
        assert_eq!(train.len(), 34);
        assert!(losses[1].1 < losses[0].1);
        assert!(losses[1].1 < 1e-6);
    }

    #[test]
    fn owa_of_benchmark_like_forecast_is_one() {
        // Naive2 equals Naive on a non-seasonal series.
        let values: Vec<f64> = (0..40).map(|i| 10.0 + (i as f64 * 1.3).sin()).collect();
        let series = TimeSeries::new(values, 1).unwrap();
        let config = DatasetConfig::default().with_candidates(vec![CandidateModel::Naive]);
        let (_, losses) = candidate_losses(&series, &config).unwrap();
        assert!((losses[0].1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn infinite_loss_is_capped() {
        // Flat history makes the MASE scale zero.
        let mut values = vec![5.0; 30];
        values.extend([6.0, 7.0, 8.0]);
        let series = TimeSeries::new(values, 1).unwrap().with_split(30).unwrap();
        let config = DatasetConfig::default()
            .with_candidates(vec![CandidateModel::Naive])
            .with_metric(LossMetric::Mase);
        let (_, losses) = candidate_losses(&series, &config).unwrap();
        assert_eq!(losses[0].1, config.loss_cap);
    }

    #[test]
    fn training_set_isolates_failures() {
        let corpus = vec![trending(40), trending(6), trending(50)];
        let config = DatasetConfig::default()
            .with_candidates(vec![CandidateModel::Naive, CandidateModel::Theta])
            .with_horizon(6);
        let result = build_training_set(&corpus, &FeatureExtractor::default(), &config);
        assert_eq!(result.successes().len(), 2);
        assert_eq!(result.failures()[0].index, 1);

        let schema: Arc<FeatureSchema> = FeatureExtractor::default().schema_handle();
        for example in result.values() {
            assert!(example.features.ensure_compatible(&schema).is_ok());
            assert_eq!(example.losses().unwrap().len(), 2);
        }
    }
}
