//! End-to-end tests: corpus -> training examples -> selector / weighter ->
//! forecasts.

use std::f64::consts::PI;

use anofox_meta::meta::{
    compare_class_weightings, BoostedModel, BoostingConfig, ForestConfig, ForestModel,
    SelectionReport,
};
use anofox_meta::prelude::*;
use approx::assert_relative_eq;

const CANDIDATES: [CandidateModel; 3] = [
    CandidateModel::SeasonalNaive,
    CandidateModel::RandomWalkDrift,
    CandidateModel::Theta,
];

/// Sine plus a small deterministic wiggle.
fn seasonal(k: usize) -> TimeSeries {
    let amplitude = 5.0 + k as f64;
    let values = (0..60)
        .map(|i| {
            100.0 + amplitude * (2.0 * PI * i as f64 / 12.0).sin()
                + 0.01 * ((i * (k + 3)) as f64).sin()
        })
        .collect();
    TimeSeries::builder()
        .name(format!("seasonal-{}", k))
        .values(values)
        .period(12)
        .build()
        .unwrap()
}

/// Straight line plus a small deterministic wiggle.
fn trending(k: usize) -> TimeSeries {
    let slope = 0.5 + 0.25 * k as f64;
    let values = (0..60)
        .map(|i| 10.0 + slope * i as f64 + 0.01 * ((i * (k + 2)) as f64).cos())
        .collect();
    TimeSeries::builder()
        .name(format!("trend-{}", k))
        .values(values)
        .period(12)
        .build()
        .unwrap()
}

fn corpus() -> Vec<TimeSeries> {
    (0..8).flat_map(|k| [seasonal(k), trending(k)]).collect()
}

fn dataset_config() -> DatasetConfig {
    DatasetConfig::default()
        .with_candidates(CANDIDATES.to_vec())
        .with_metric(LossMetric::Mase)
        .with_horizon(12)
}

#[test]
fn noiseless_linear_trend_features() {
    let values: Vec<f64> = (0..48).map(|i| 5.0 + 2.0 * i as f64).collect();
    let series = TimeSeries::new(values, 12).unwrap();
    let features = FeatureExtractor::default().extract(&series).unwrap();
    assert_relative_eq!(features.get("trend").unwrap(), 1.0, epsilon = 1e-6);
    assert!(features.get("seasonality").unwrap() < 1e-6);
}

#[test]
fn selector_prefers_trend_models_for_a_line() {
    let extractor = FeatureExtractor::default();
    let batch = build_training_set(&corpus(), &extractor, &dataset_config());
    assert!(batch.is_complete());
    let examples = batch.into_values();
    assert_eq!(examples.len(), 16);

    let selector =
        ModelSelector::train(&examples, extractor.config(), &SelectorConfig::default()).unwrap();
    let line: Vec<f64> = (0..48).map(|i| 5.0 + 2.0 * i as f64).collect();
    let (selection, forecast) = selector
        .forecast(&TimeSeries::new(line, 12).unwrap(), 6)
        .unwrap();

    assert!(
        matches!(
            selection.model,
            CandidateModel::RandomWalkDrift | CandidateModel::Theta
        ),
        "selected {}",
        selection.model
    );
    assert!(
        selection.probability(CandidateModel::SeasonalNaive)
            < selection.probability(selection.model)
    );
    assert_eq!(forecast.horizon(), 6);
}

#[test]
fn balanced_and_uniform_weightings_are_reported() {
    let extractor = FeatureExtractor::default();
    let examples = build_training_set(&corpus(), &extractor, &dataset_config()).into_values();
    let (train, holdout) = examples.split_at(12);
    let reports: Vec<(ClassWeighting, SelectionReport)> = compare_class_weightings(
        train,
        holdout,
        extractor.config(),
        &ForestConfig::default().with_trees(50),
    )
    .unwrap();
    assert_eq!(reports.len(), 2);
    for (_, report) in reports {
        assert_eq!(report.n_examples, holdout.len());
        assert!((0.0..=1.0).contains(&report.accuracy));
        assert!((0.0..=1.0).contains(&report.balanced_accuracy));
    }
}

#[test]
fn weighter_gives_dominant_model_most_weight() {
    let extractor = FeatureExtractor::default();
    let examples: Vec<TrainingExample> = corpus()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let features = extractor.extract(s).unwrap();
            TrainingExample::with_losses(
                features,
                vec![
                    (CandidateModel::SeasonalNaive, 1.5 + 0.1 * i as f64),
                    (CandidateModel::RandomWalkDrift, 1.0),
                    (CandidateModel::Theta, 0.1),
                ],
            )
        })
        .collect();

    let config = WeighterConfig {
        boosting: BoostingConfig::default().with_rounds(40).with_max_depth(4),
        transform: WeightTransform::default(),
    };
    let weighter = ModelWeighter::train(&examples, extractor.config(), &config).unwrap();
    for example in &examples {
        let weights = weighter.weights(&example.features).unwrap();
        assert!(weights.get(CandidateModel::Theta).unwrap() > 0.9);
        assert_eq!(weights.best().0, CandidateModel::Theta);
    }
}

#[test]
fn trained_models_survive_json() {
    let extractor = FeatureExtractor::default();
    let examples = build_training_set(&corpus(), &extractor, &dataset_config()).into_values();

    let selector_config = SelectorConfig {
        forest: ForestConfig::default().with_trees(30),
        class_weighting: ClassWeighting::Balanced,
    };
    let selector = ModelSelector::train(&examples, extractor.config(), &selector_config).unwrap();
    let json = selector.to_json().unwrap();
    let restored = ModelSelector::<ForestModel>::from_json(&json).unwrap();
    assert_eq!(restored.schema(), selector.schema());

    let weighter_config = WeighterConfig {
        boosting: BoostingConfig::default().with_rounds(10).with_max_depth(3),
        transform: WeightTransform::Proportional,
    };
    let weighter = ModelWeighter::train(&examples, extractor.config(), &weighter_config).unwrap();
    let json = weighter.to_json().unwrap();
    let restored_weighter = ModelWeighter::<BoostedModel>::from_json(&json).unwrap();
    assert_eq!(restored_weighter.transform(), WeightTransform::Proportional);

    for example in &examples {
        assert_eq!(
            selector.select(&example.features).unwrap().model,
            restored.select(&example.features).unwrap().model
        );
        let a = weighter.weights(&example.features).unwrap();
        let b = restored_weighter.weights(&example.features).unwrap();
        for ((m1, w1), (m2, w2)) in a.iter().zip(b.iter()) {
            assert_eq!(m1, m2);
            assert_relative_eq!(w1, w2, epsilon = 1e-9);
        }
    }
}

#[test]
fn features_from_another_extractor_are_rejected() {
    let extractor = FeatureExtractor::default();
    let examples = build_training_set(&corpus(), &extractor, &dataset_config()).into_values();
    let selector = ModelSelector::train(
        &examples,
        extractor.config(),
        &SelectorConfig {
            forest: ForestConfig::default().with_trees(10),
            ..SelectorConfig::default()
        },
    )
    .unwrap();

    let other = FeatureExtractor::new(FeatureConfig::default().with_boxcox(false)).unwrap();
    let features = other.extract(&seasonal(0)).unwrap();
    assert!(matches!(
        selector.select(&features),
        Err(ForecastError::FeatureSchemaMismatch(_))
    ));
}

#[test]
fn combined_forecast_matches_manual_average() {
    let series = seasonal(2);
    let weights = ModelWeights::new(vec![
        (CandidateModel::SeasonalNaive, 0.6),
        (CandidateModel::Theta, 0.4),
    ])
    .unwrap();
    let models = [CandidateModel::SeasonalNaive, CandidateModel::Theta];
    let forecasts: Vec<(CandidateModel, Forecast)> = models
        .iter()
        .map(|&m| (m, m.fit_and_forecast(&series, 12).unwrap()))
        .collect();
    let combined = combine_forecasts(&weights, &forecasts).unwrap();
    for h in 0..12 {
        let expected = 0.6 * forecasts[0].1.point()[h] + 0.4 * forecasts[1].1.point()[h];
        assert_relative_eq!(combined.point()[h], expected, epsilon = 1e-9);
    }

    let missing = &forecasts[..1];
    assert!(matches!(
        combine_forecasts(&weights, missing),
        Err(ForecastError::MismatchedModelSet { .. })
    ));
}

#[test]
fn batch_reports_failures_alongside_successes() {
    let mut series = corpus();
    series.insert(
        3,
        TimeSeries::builder()
            .name("too-short")
            .values(vec![1.0, 2.0, 3.0, 4.0, 5.0])
            .period(12)
            .build()
            .unwrap(),
    );
    let result = build_training_set(&series, &FeatureExtractor::default(), &dataset_config());
    assert_eq!(result.len(), 17);
    assert_eq!(result.successes().len(), 16);
    assert_eq!(result.failures().len(), 1);
    let failure = &result.failures()[0];
    assert_eq!(failure.index, 3);
    assert_eq!(failure.name.as_deref(), Some("too-short"));
    assert!(result.successes().iter().all(|(i, _)| *i != 3));
}

#[test]
fn simulated_corpus_drives_the_whole_pipeline() {
    let config = MetaConfig::from_toml_str(
        r#"
        [dataset]
        candidates = ["Naive", "RandomWalkDrift", "Theta"]
        metric = "smape"
        horizon = 6

        [simulation]
        count = 12
        min_length = 40
        max_length = 60
        periods = [1, 4]
        seed = 3

        [selector.forest]
        n_trees = 20

        [weighter.boosting]
        n_rounds = 8
        max_depth = 3
        "#,
    )
    .unwrap();

    let corpus = simulate(&config.simulation).unwrap();
    let extractor = FeatureExtractor::new(config.features.clone()).unwrap();
    let examples = build_training_set(&corpus, &extractor, &config.dataset).into_values();
    assert!(!examples.is_empty());

    let selector = ModelSelector::train(&examples, &config.features, &config.selector).unwrap();
    let weighter = ModelWeighter::train(&examples, &config.features, &config.weighter).unwrap();

    let target = &corpus[0];
    let (selection, _) = selector.forecast(target, 6).unwrap();
    assert!(selector.classes().contains(&selection.model));

    let combined = weighter.forecast_with_intervals(target, 6, 0.8).unwrap();
    assert_eq!(combined.forecast.horizon(), 6);
    assert_eq!(combined.components.len(), 3);
    assert!(combined.forecast.is_finite());

    let batch = weighter.forecast_batch(&corpus[..4], 6);
    assert!(batch.is_complete());
    assert_eq!(batch.len(), 4);
}
