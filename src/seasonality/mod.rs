//! Seasonal decomposition.
//!
//! - STL: Seasonal-Trend decomposition using LOESS
//! - Classical moving-average decomposition and a seasonality test

mod decompose;
mod stl;

pub use decompose::{classical_decompose, seasonality_test, ClassicalDecomposition, DecompositionType};
pub use stl::{STLResult, STL};
