//! TBATS-style model: Box-Cox transform, trigonometric seasonality and a
//! damped trend.

mod model;

pub use model::{TBATS, MAX_HARMONICS};
