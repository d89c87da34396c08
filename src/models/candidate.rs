//! The closed pool of candidate forecasting procedures.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::AutoARIMA;
use crate::models::baseline::{Naive, RandomWalkDrift, SeasonalNaive};
use crate::models::exponential::ETS;
use crate::models::stlm::STLM;
use crate::models::tbats::TBATS;
use crate::models::theta::Theta;
use crate::models::BoxedForecaster;

/// Identifier of a candidate forecasting procedure.
///
/// Stateless: every call to [`CandidateModel::fit_and_forecast`] builds a
/// fresh model for the series' seasonal period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CandidateModel {
    Naive,
    SeasonalNaive,
    RandomWalkDrift,
    Theta,
    Arima,
    Ets,
    Tbats,
    StlmAr,
}

impl CandidateModel {
    /// Every candidate, in index order.
    pub const ALL: [CandidateModel; 8] = [
        CandidateModel::Naive,
        CandidateModel::SeasonalNaive,
        CandidateModel::RandomWalkDrift,
        CandidateModel::Theta,
        CandidateModel::Arima,
        CandidateModel::Ets,
        CandidateModel::Tbats,
        CandidateModel::StlmAr,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CandidateModel::Naive => "Naive",
            CandidateModel::SeasonalNaive => "SeasonalNaive",
            CandidateModel::RandomWalkDrift => "RandomWalkDrift",
            CandidateModel::Theta => "Theta",
            CandidateModel::Arima => "Arima",
            CandidateModel::Ets => "Ets",
            CandidateModel::Tbats => "Tbats",
            CandidateModel::StlmAr => "StlmAr",
        }
    }

    /// Position in [`CandidateModel::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Unfitted forecaster for a series with the given seasonal period.
    pub fn forecaster(&self, period: usize) -> BoxedForecaster {
        match self {
            CandidateModel::Naive => Box::new(Naive::new()),
            CandidateModel::SeasonalNaive => Box::new(SeasonalNaive::new(period)),
            CandidateModel::RandomWalkDrift => Box::new(RandomWalkDrift::new()),
            CandidateModel::Theta => Box::new(Theta::seasonal(period)),
            CandidateModel::Arima => Box::new(AutoARIMA::seasonal(period)),
            CandidateModel::Ets => Box::new(ETS::auto(period)),
            CandidateModel::Tbats => Box::new(TBATS::new(period)),
            CandidateModel::StlmAr => Box::new(STLM::new(period)),
        }
    }

    /// Fit on the whole series and forecast `horizon` steps ahead.
    pub fn fit_and_forecast(&self, series: &TimeSeries, horizon: usize) -> Result<Forecast> {
        let mut model = self.forecaster(series.period());
        model.fit(series)?;
        model.predict(horizon)
    }

    /// Like [`CandidateModel::fit_and_forecast`], with prediction intervals
    /// at `level`.
    pub fn fit_and_forecast_with_intervals(
        &self,
        series: &TimeSeries,
        horizon: usize,
        level: f64,
    ) -> Result<Forecast> {
        let mut model = self.forecaster(series.period());
        model.fit(series)?;
        model.predict_with_intervals(horizon, level)
    }
}

impl fmt::Display for CandidateModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CandidateModel {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| ForecastError::InvalidParameter(format!("unknown candidate model '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seasonal_series() -> TimeSeries {
        let values: Vec<f64> = (0..72)
            .map(|i| {
                100.0 + 0.3 * i as f64 + 8.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin()
            })
            .collect();
        TimeSeries::new(values, 12).unwrap()
    }

    #[test]
    fn index_matches_all() {
        for (i, m) in CandidateModel::ALL.iter().enumerate() {
            assert_eq!(m.index(), i);
            assert_eq!(CandidateModel::from_index(i), Some(*m));
        }
        assert_eq!(CandidateModel::from_index(8), None);
    }

    #[test]
    fn names_parse_back() {
        for m in CandidateModel::ALL {
            assert_eq!(m.name().parse::<CandidateModel>().unwrap(), m);
            assert_eq!(m.to_string(), m.name());
        }
        assert_eq!("theta".parse::<CandidateModel>().unwrap(), CandidateModel::Theta);
        assert!("Prophet".parse::<CandidateModel>().is_err());
    }

    #[test]
    fn every_candidate_forecasts_a_seasonal_series() {
        let series = seasonal_series();
        for m in CandidateModel::ALL {
            let f = m.fit_and_forecast(&series, 12).unwrap();
            assert_eq!(f.horizon(), 12, "{}", m);
            assert!(f.is_finite(), "{} produced non-finite forecasts", m);
        }
    }

    #[test]
    fn interval_variant_carries_level() {
        let series = seasonal_series();
        for m in CandidateModel::ALL {
            let f = m.fit_and_forecast_with_intervals(&series, 6, 0.8).unwrap();
            assert!(f.has_intervals(), "{}", m);
            assert_eq!(f.level(), Some(0.8));
        }
    }

    #[test]
    fn serde_uses_names() {
        let json = serde_json::to_string(&CandidateModel::StlmAr).unwrap();
        assert_eq!(json, "\"StlmAr\"");
        let back: CandidateModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CandidateModel::StlmAr);
    }
}
