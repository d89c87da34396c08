//! Forecast result structure for holding predictions.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// A forecast result containing point predictions and optional intervals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Point predictions, one per horizon step.
    point: Vec<f64>,
    /// Lower prediction interval bounds (optional).
    lower: Option<Vec<f64>>,
    /// Upper prediction interval bounds (optional).
    upper: Option<Vec<f64>>,
    /// Nominal coverage of the intervals.
    level: Option<f64>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecast from point predictions.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            point: values,
            lower: None,
            upper: None,
            level: None,
        }
    }

    /// Create a forecast with prediction intervals at the given level.
    pub fn from_values_with_intervals(
        values: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        level: f64,
    ) -> Result<Self> {
        for bound in [&lower, &upper] {
            if bound.len() != values.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: values.len(),
                    got: bound.len(),
                });
            }
        }
        Ok(Self {
            point: values,
            lower: Some(lower),
            upper: Some(upper),
            level: Some(level),
        })
    }

    /// Get the forecast horizon (number of steps).
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    /// Check if forecast is empty.
    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    /// Get the point predictions.
    pub fn point(&self) -> &[f64] {
        &self.point
    }

    /// Get the lower interval bounds.
    pub fn lower(&self) -> Option<&[f64]> {
        self.lower.as_deref()
    }

    /// Get the upper interval bounds.
    pub fn upper(&self) -> Option<&[f64]> {
        self.upper.as_deref()
    }

    /// Get the nominal interval level.
    pub fn level(&self) -> Option<f64> {
        self.level
    }

    /// Check if both interval bounds are available.
    pub fn has_intervals(&self) -> bool {
        self.lower.is_some() && self.upper.is_some()
    }

    /// Check that every value is finite.
    pub fn is_finite(&self) -> bool {
        let bounds_ok = |b: &Option<Vec<f64>>| {
            b.as_ref()
                .map(|v| v.iter().all(|x| x.is_finite()))
                .unwrap_or(true)
        };
        self.point.iter().all(|x| x.is_finite()) && bounds_ok(&self.lower) && bounds_ok(&self.upper)
    }
}
