//! Exponential smoothing models.
//!
//! Additive-error ETS state-space models with automatic model selection by
//! AICc and simulation of future sample paths.

mod ets;

pub use ets::{ETSSpec, SeasonalType, TrendType, ETS};
