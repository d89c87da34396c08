//! Forecasting models.
//!
//! The candidate pool for model selection and averaging: baselines, Theta,
//! ETS, ARIMA, TBATS and STL+AR, all behind the [`Forecaster`] trait and
//! enumerated by [`CandidateModel`].

mod candidate;
mod traits;

pub mod arima;
pub mod baseline;
pub mod exponential;
pub mod stlm;
pub mod tbats;
pub mod theta;

pub use arima::AutoARIMA;
pub use candidate::CandidateModel;
pub use exponential::ETS;
pub use stlm::STLM;
pub use tbats::TBATS;
pub use traits::{BoxedForecaster, Forecaster};
