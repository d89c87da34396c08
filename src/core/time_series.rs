//! TimeSeries data structure for representing a univariate seasonal series.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// An immutable univariate time series with a seasonal period.
///
/// The optional split point divides the observations into a training part
/// (`values[..split]`) and a test part (`values[split..]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    name: Option<String>,
    values: Vec<f64>,
    period: usize,
    split: Option<usize>,
}

/// Builder for constructing TimeSeries.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesBuilder {
    name: Option<String>,
    values: Vec<f64>,
    period: Option<usize>,
    split: Option<usize>,
    horizon: Option<usize>,
}

impl TimeSeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn values(mut self, values: Vec<f64>) -> Self {
        self.values = values;
        self
    }

    /// Set the seasonal period (1 for non-seasonal data).
    pub fn period(mut self, period: usize) -> Self {
        self.period = Some(period);
        self
    }

    /// Set the train/test split point explicitly.
    pub fn split_at(mut self, split: usize) -> Self {
        self.split = Some(split);
        self.horizon = None;
        self
    }

    /// Hold out the last `horizon` observations as the test part.
    pub fn horizon(mut self, horizon: usize) -> Self {
        self.horizon = Some(horizon);
        self.split = None;
        self
    }

    pub fn build(self) -> Result<TimeSeries> {
        let split = match self.horizon {
            Some(h) => Some(self.values.len().checked_sub(h).ok_or(
                ForecastError::InsufficientData {
                    needed: h + 1,
                    got: self.values.len(),
                },
            )?),
            None => self.split,
        };
        TimeSeries::from_parts(self.name, self.values, self.period.unwrap_or(1), split)
    }
}

impl TimeSeries {
    /// Create a series without a split point.
    pub fn new(values: Vec<f64>, period: usize) -> Result<Self> {
        Self::from_parts(None, values, period, None)
    }

    pub fn builder() -> TimeSeriesBuilder {
        TimeSeriesBuilder::new()
    }

    fn from_parts(
        name: Option<String>,
        values: Vec<f64>,
        period: usize,
        split: Option<usize>,
    ) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if period == 0 {
            return Err(ForecastError::InvalidParameter(
                "seasonal period must be at least 1".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::MissingValues);
        }
        if let Some(s) = split {
            if s == 0 || s >= values.len() {
                return Err(ForecastError::InvalidParameter(format!(
                    "split point {} must lie in 1..{}",
                    s,
                    values.len()
                )));
            }
        }

        Ok(Self {
            name,
            values,
            period,
            split,
        })
    }

    /// Get the series name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get all observations.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: empty series are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the seasonal period.
    pub fn period(&self) -> usize {
        self.period
    }

    /// Check whether the series has a seasonal period above 1.
    pub fn is_seasonal(&self) -> bool {
        self.period > 1
    }

    /// Get the train/test split point.
    pub fn split_point(&self) -> Option<usize> {
        self.split
    }

    /// Length of the test part (0 without a split).
    pub fn horizon(&self) -> usize {
        self.split.map(|s| self.values.len() - s).unwrap_or(0)
    }

    /// Training part as its own series (the whole series without a split).
    pub fn train(&self) -> TimeSeries {
        let end = self.split.unwrap_or(self.values.len());
        TimeSeries {
            name: self.name.clone(),
            values: self.values[..end].to_vec(),
            period: self.period,
            split: None,
        }
    }

    /// Test part (empty without a split).
    pub fn test(&self) -> &[f64] {
        match self.split {
            Some(s) => &self.values[s..],
            None => &[],
        }
    }

    /// Return a copy with a new split point.
    pub fn with_split(&self, split: usize) -> Result<TimeSeries> {
        Self::from_parts(self.name.clone(), self.values.clone(), self.period, Some(split))
    }

    /// Return a copy with every observation multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Result<TimeSeries> {
        Self::from_parts(
            self.name.clone(),
            self.values.iter().map(|v| v * factor).collect(),
            self.period,
            self.split,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_series_has_no_split() {
        let ts = TimeSeries::new(vec![1.0, 2.0, 3.0], 1).unwrap();
        assert_eq!(ts.len(), 3);
        assert_eq!(ts.period(), 1);
        assert!(!ts.is_seasonal());
        assert!(ts.split_point().is_none());
        assert!(ts.test().is_empty());
        assert_eq!(ts.train().values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn builder_with_horizon_sets_split() {
        let ts = TimeSeries::builder()
            .name("M1")
            .values((1..=20).map(|i| i as f64).collect())
            .period(4)
            .horizon(6)
            .build()
            .unwrap();

        assert_eq!(ts.name(), Some("M1"));
        assert_eq!(ts.split_point(), Some(14));
        assert_eq!(ts.horizon(), 6);
        assert_eq!(ts.train().len(), 14);
        assert_eq!(ts.test(), &[15.0, 16.0, 17.0, 18.0, 19.0, 20.0]);
        assert!(ts.train().split_point().is_none());
    }

    #[test]
    fn rejects_empty_values() {
        assert_eq!(TimeSeries::new(vec![], 1), Err(ForecastError::EmptyData));
    }

    #[test]
    fn rejects_zero_period() {
        assert!(matches!(
            TimeSeries::new(vec![1.0], 0),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn rejects_non_finite_values() {
        assert_eq!(
            TimeSeries::new(vec![1.0, f64::NAN], 1),
            Err(ForecastError::MissingValues)
        );
        assert_eq!(
            TimeSeries::new(vec![1.0, f64::INFINITY], 1),
            Err(ForecastError::MissingValues)
        );
    }

    #[test]
    fn rejects_out_of_range_split() {
        let ts = TimeSeries::new(vec![1.0, 2.0, 3.0], 1).unwrap();
        assert!(ts.with_split(0).is_err());
        assert!(ts.with_split(3).is_err());
        assert!(ts.with_split(2).is_ok());
    }

    #[test]
    fn horizon_longer_than_series_is_insufficient() {
        let result = TimeSeries::builder()
            .values(vec![1.0, 2.0])
            .horizon(5)
            .build();
        assert_eq!(
            result,
            Err(ForecastError::InsufficientData { needed: 6, got: 2 })
        );
    }

    #[test]
    fn scaled_keeps_metadata() {
        let ts = TimeSeries::builder()
            .values(vec![1.0, 2.0, 3.0, 4.0])
            .period(2)
            .split_at(3)
            .build()
            .unwrap();
        let scaled = ts.scaled(10.0).unwrap();
        assert_eq!(scaled.values(), &[10.0, 20.0, 30.0, 40.0]);
        assert_eq!(scaled.period(), 2);
        assert_eq!(scaled.split_point(), Some(3));
    }
}
