//! Train a selector and a weighter on a simulated corpus and forecast a few
//! series with both.
//!
//! Run with `RUST_LOG=anofox_meta=debug` to follow the training runs. An
//! optional first argument names a TOML configuration file.

use anofox_meta::meta::compare_class_weightings;
use anofox_meta::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anofox_meta=info".into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => MetaConfig::from_path(path)?,
        None => MetaConfig::default(),
    };

    let corpus = simulate(&config.simulation)?;
    let (train_series, test_series) = corpus.split_at(corpus.len() * 4 / 5);

    let extractor = FeatureExtractor::new(config.features.clone())?;
    let batch = build_training_set(train_series, &extractor, &config.dataset);
    for failure in batch.failures() {
        println!(
            "skipped series {} ({:?}): {}",
            failure.index, failure.name, failure.error
        );
    }
    let examples = batch.into_values();
    let (fit, holdout) = examples.split_at(examples.len() * 3 / 4);

    println!("\nClass weighting on {} hold-out examples:", holdout.len());
    for (weighting, report) in
        compare_class_weightings(fit, holdout, &config.features, &config.selector.forest)?
    {
        println!(
            "  {:?}: accuracy {:.3}, balanced accuracy {:.3}",
            weighting, report.accuracy, report.balanced_accuracy
        );
    }

    let selector = ModelSelector::train(&examples, &config.features, &config.selector)?;
    if let Some(oob) = selector.oob_accuracy() {
        println!("\nSelector out-of-bag accuracy: {:.3}", oob);
    }
    println!("Most important features:");
    for (name, importance) in selector.feature_importance().iter().take(5) {
        println!("  {:<16} {:.3}", name, importance);
    }

    let weighter = ModelWeighter::train(&examples, &config.features, &config.weighter)?;

    let horizon = config.dataset.horizon;
    for series in test_series.iter().take(3) {
        let name = series.name().unwrap_or("unnamed");
        let (selection, selected) = selector.forecast(series, horizon)?;
        let combined = weighter.forecast_with_intervals(series, horizon, 0.95)?;
        let (best, weight) = combined.weights.best();

        println!("\n{} (period {}, {} obs)", name, series.period(), series.len());
        println!(
            "  selected {:<16} first step {:.2}",
            selection.model.name(),
            selected.point()[0]
        );
        println!(
            "  combined (top {} at {:.2}) first step {:.2}",
            best,
            weight,
            combined.forecast.point()[0]
        );
        if let (Some(lower), Some(upper)) = (combined.forecast.lower(), combined.forecast.upper())
        {
            println!("  95% interval [{:.2}, {:.2}]", lower[0], upper[0]);
        }
    }

    Ok(())
}
