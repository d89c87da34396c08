//! Weighted combination of candidate forecasts.

use crate::core::Forecast;
use crate::error::{ForecastError, Result};
use crate::meta::ModelWeights;
use crate::models::CandidateModel;

fn sorted_names(models: impl Iterator<Item = CandidateModel>) -> Vec<String> {
    let mut models: Vec<CandidateModel> = models.collect();
    models.sort();
    models.iter().map(|m| m.name().to_string()).collect()
}

/// `Σ w · values(f)` per step; `None` when any forecast lacks the values.
fn weighted_sum<'a>(
    weighted: &[(f64, &'a Forecast)],
    horizon: usize,
    values: impl Fn(&'a Forecast) -> Option<&'a [f64]>,
) -> Option<Vec<f64>> {
    let mut out = vec![0.0; horizon];
    for &(w, f) in weighted {
        for (acc, v) in out.iter_mut().zip(values(f)?) {
            *acc += w * v;
        }
    }
    Some(out)
}

/// Weighted average of per-candidate forecasts, step by step.
///
/// Every weighted model needs exactly one forecast and vice versa. Intervals
/// are averaged with the same weights when every forecast with a positive
/// weight carries intervals at one common level; otherwise the result has
/// point forecasts only.
pub fn combine_forecasts(
    weights: &ModelWeights,
    forecasts: &[(CandidateModel, Forecast)],
) -> Result<Forecast> {
    let weight_names = sorted_names(weights.iter().map(|(m, _)| m));
    let forecast_names = sorted_names(forecasts.iter().map(|(m, _)| *m));
    if weight_names != forecast_names {
        return Err(ForecastError::MismatchedModelSet {
            weights: weight_names,
            forecasts: forecast_names,
        });
    }

    let horizon = match forecasts.first() {
        Some((_, f)) => f.horizon(),
        None => return Err(ForecastError::EmptyData),
    };
    if let Some((_, f)) = forecasts.iter().find(|(_, f)| f.horizon() != horizon) {
        return Err(ForecastError::DimensionMismatch {
            expected: horizon,
            got: f.horizon(),
        });
    }

    let weighted: Vec<(f64, &Forecast)> = forecasts
        .iter()
        .filter_map(|(m, f)| weights.get(*m).map(|w| (w, f)))
        .filter(|(w, _)| *w > 0.0)
        .collect();

    let point = weighted_sum(&weighted, horizon, |f| Some(f.point()))
        .unwrap_or_else(|| vec![0.0; horizon]);

    let level = match weighted.first() {
        Some((_, f)) => f.level(),
        None => return Err(ForecastError::EmptyData),
    };
    let same_level = weighted.iter().all(|(_, f)| f.level() == level);
    match (level, same_level) {
        (Some(level), true) => match (
            weighted_sum(&weighted, horizon, |f| f.lower()),
            weighted_sum(&weighted, horizon, |f| f.upper()),
        ) {
            (Some(lower), Some(upper)) => {
                Forecast::from_values_with_intervals(point, lower, upper, level)
            }
            _ => Ok(Forecast::from_values(point)),
        },
        _ => Ok(Forecast::from_values(point)),
    }
}
