//! Synthetic series for enlarging a training corpus.
//!
//! [`simulate`] draws trend + seasonal + AR(1) series from scratch;
//! [`augment`] fits ETS to real series and samples new paths from the fitted
//! models.

use std::f64::consts::PI;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::batch::BatchResult;
use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{Forecaster, ETS};

/// Settings of the random series generator. Trend, amplitude and noise are
/// relative to `level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub count: usize,
    pub min_length: usize,
    pub max_length: usize,
    /// Seasonal periods drawn uniformly per series; 1 means non-seasonal.
    pub periods: Vec<usize>,
    pub level: f64,
    /// Largest absolute slope per step.
    pub max_trend: f64,
    /// Largest seasonal amplitude.
    pub max_seasonal_amplitude: f64,
    /// Standard deviation of the AR(1) innovations.
    pub noise: f64,
    /// Range of the AR(1) coefficient of the noise.
    pub ar_range: (f64, f64),
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            count: 100,
            min_length: 48,
            max_length: 120,
            periods: vec![1, 4, 12],
            level: 100.0,
            max_trend: 0.01,
            max_seasonal_amplitude: 0.3,
            noise: 0.05,
            ar_range: (-0.5, 0.9),
            seed: 42,
        }
    }
}

impl SimulationConfig {
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_length(mut self, min_length: usize, max_length: usize) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    pub fn with_periods(mut self, periods: Vec<usize>) -> Self {
        self.periods = periods;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.min_length < 2 || self.min_length > self.max_length {
            return Err(ForecastError::InvalidParameter(format!(
                "invalid length range {}..={}",
                self.min_length, self.max_length
            )));
        }
        if self.periods.is_empty() || self.periods.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "periods must be non-empty and positive".to_string(),
            ));
        }
        let (lo, hi) = self.ar_range;
        if !(lo <= hi && lo > -1.0 && hi < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "AR coefficient range ({}, {}) must lie inside (-1, 1)",
                lo, hi
            )));
        }
        let non_negative = [self.max_trend, self.max_seasonal_amplitude, self.noise];
        if !(self.level > 0.0) || non_negative.iter().any(|v| !(*v >= 0.0 && v.is_finite())) {
            return Err(ForecastError::InvalidParameter(
                "level must be positive; trend, amplitude and noise non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn simulate_one(config: &SimulationConfig, index: usize) -> Result<TimeSeries> {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(index as u64));
    let noise = Normal::new(0.0, config.noise * config.level)
        .map_err(|e| ForecastError::ComputationError(e.to_string()))?;

    let n = rng.gen_range(config.min_length..=config.max_length);
    let period = config.periods[rng.gen_range(0..config.periods.len())];
    let slope = config.level * config.max_trend * rng.gen_range(-1.0..=1.0);
    let amplitude = if period > 1 {
        config.level * config.max_seasonal_amplitude * rng.gen::<f64>()
    } else {
        0.0
    };
    let phase = rng.gen_range(0.0..2.0 * PI);
    let phi = rng.gen_range(config.ar_range.0..=config.ar_range.1);

    let mut e = 0.0;
    let mut values: Vec<f64> = (0..n)
        .map(|t| {
            e = phi * e + noise.sample(&mut rng);
            let season = amplitude * (2.0 * PI * t as f64 / period as f64 + phase).sin();
            config.level + slope * t as f64 + season + e
        })
        .collect();

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    if min <= 0.0 {
        let shift = 0.1 * config.level - min;
        values.iter_mut().for_each(|v| *v += shift);
    }

    TimeSeries::builder()
        .name(format!("sim-{}", index))
        .values(values)
        .period(period)
        .build()
}

/// Generate `config.count` strictly positive series.
///
/// Series `i` depends only on `(config.seed, i)`, so the output is the same
/// for any thread count.
pub fn simulate(config: &SimulationConfig) -> Result<Vec<TimeSeries>> {
    config.validate()?;
    let series = (0..config.count)
        .into_par_iter()
        .map(|i| simulate_one(config, i))
        .collect::<Result<Vec<_>>>()?;
    info!(count = series.len(), seed = config.seed, "simulated series");
    Ok(series)
}

/// Fit ETS to every series and sample `paths` continuations of the same
/// length from each fit.
///
/// Series that cannot be fitted are reported as failures.
pub fn augment(series: &[TimeSeries], paths: usize, seed: u64) -> BatchResult<Vec<TimeSeries>> {
    let results: Vec<Result<Vec<TimeSeries>>> = series
        .par_iter()
        .enumerate()
        .map(|(i, s)| {
            let mut ets = ETS::auto(s.period());
            ets.fit(s)?;
            (0..paths)
                .map(|p| {
                    let stream = (i * paths + p) as u64;
                    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(stream));
                    let values = ets.simulate(s.len(), &mut rng)?;
                    let name = match s.name() {
                        Some(name) => format!("{}-aug{}", name, p),
                        None => format!("series{}-aug{}", i, p),
                    };
                    TimeSeries::builder()
                        .name(name)
                        .values(values)
                        .period(s.period())
                        .build()
                })
                .collect()
        })
        .collect();
    let result = BatchResult::from_results(series, results);
    info!(
        series = series.len(),
        paths,
        failed = result.failures().len(),
        "augmented corpus"
    );
    result
}
