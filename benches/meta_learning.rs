//! Benchmarks for feature extraction and meta-learner training.

use anofox_meta::meta::{
    BoostingConfig, ClassifierBackend, ForestConfig, GradientBoosting, RandomForest, ScoreBackend,
};
use anofox_meta::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn seasonal_series(n: usize, period: usize) -> TimeSeries {
    let values = (0..n)
        .map(|i| {
            50.0 + 0.1 * i as f64
                + 5.0 * (2.0 * std::f64::consts::PI * i as f64 / period as f64).sin()
        })
        .collect();
    TimeSeries::new(values, period).unwrap()
}

fn random_design(rows: usize, cols: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rows)
        .map(|_| (0..cols).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect()
}

fn bench_feature_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_extraction");
    let extractor = FeatureExtractor::default();

    for size in [48, 120, 480, 1200].iter() {
        let series = seasonal_series(*size, 12);
        group.bench_with_input(BenchmarkId::new("extract", size), size, |b, _| {
            b.iter(|| extractor.extract(black_box(&series)))
        });
    }

    let corpus = simulate(&SimulationConfig::default().with_count(200)).unwrap();
    group.bench_function("batch_200", |b| {
        b.iter(|| extract_features_batch(black_box(&corpus), &extractor))
    });

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10);

    for rows in [200, 1000].iter() {
        let x = random_design(*rows, 28, 1);
        let labels: Vec<usize> = x
            .iter()
            .map(|r| usize::from(r[0] > 0.0) + usize::from(r[1] > 0.5))
            .collect();
        let weights = vec![1.0; *rows];
        let forest = RandomForest::new(ForestConfig::default().with_trees(100));
        group.bench_with_input(BenchmarkId::new("random_forest", rows), rows, |b, _| {
            b.iter(|| forest.train(black_box(&x), &labels, 3, &weights))
        });

        let losses: Vec<Vec<f64>> = x
            .iter()
            .map(|r| (0..8).map(|j| (r[j % 28] + 1.5) * (1.0 + j as f64 * 0.1)).collect())
            .collect();
        let booster = GradientBoosting::new(BoostingConfig::default().with_rounds(30));
        group.bench_with_input(BenchmarkId::new("gradient_boosting", rows), rows, |b, _| {
            b.iter(|| booster.train(black_box(&x), &losses))
        });
    }

    group.finish();
}

fn bench_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("candidates");
    group.sample_size(20);
    let series = seasonal_series(120, 12);

    for model in CandidateModel::ALL {
        group.bench_function(model.name(), |b| {
            b.iter(|| model.fit_and_forecast(black_box(&series), 12))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_feature_extraction, bench_training, bench_candidates);
criterion_main!(benches);
