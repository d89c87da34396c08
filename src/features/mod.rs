//! Time series feature extraction.
//!
//! Computes a fixed, ordered set of tsfeatures-style characteristics
//! (strength of trend and seasonality, autocorrelation structure, spectral
//! entropy, stability and shape) used as inputs to the meta-learners.
//!
//! # Example
//!
//! ```
//! use anofox_meta::core::TimeSeries;
//! use anofox_meta::features::FeatureExtractor;
//!
//! let values: Vec<f64> = (0..48)
//!     .map(|i| 10.0 + (i as f64 * std::f64::consts::PI / 6.0).sin())
//!     .collect();
//! let series = TimeSeries::new(values, 12).unwrap();
//!
//! let features = FeatureExtractor::default().extract(&series).unwrap();
//! assert!(features.get("seasonality").unwrap() > 0.5);
//! ```

pub mod autocorrelation;
pub mod entropy;
mod extractor;
pub mod shape;
pub mod stl_features;
pub mod tiled;

pub use autocorrelation::{acf, autocorrelation, pacf, partial_autocorrelation};
pub use entropy::spectral_entropy;
pub use extractor::{Feature, FeatureConfig, FeatureExtractor, FeatureSchema, FeatureVector};
