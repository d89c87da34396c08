//! Baseline forecasting models.
//!
//! Simple methods that serve as candidates and as accuracy benchmarks.

mod naive;
mod naive2;
mod random_walk;
mod seasonal_naive;

pub use naive::Naive;
pub use naive2::Naive2;
pub use random_walk::RandomWalkDrift;
pub use seasonal_naive::SeasonalNaive;
