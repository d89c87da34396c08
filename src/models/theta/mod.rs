//! Theta forecasting method.
//!
//! The standard Theta method (the M3 winner) is equivalent to simple
//! exponential smoothing with drift equal to half the slope of a linear
//! trend fitted to the data. Seasonal series are adjusted with a classical
//! multiplicative decomposition first.

mod model;

pub use model::Theta;
