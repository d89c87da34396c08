//! Data transformations for time series.
//!
//! Provides the Box-Cox power transform and z-score standardization used to
//! normalize series before feature extraction.
//!
//! # Example
//!
//! ```
//! use anofox_meta::transform::{boxcox_auto, standardize, LambdaMethod};
//!
//! let series = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
//!
//! // Box-Cox with Guerrero's lambda over blocks of two
//! let bc = boxcox_auto(&series, 2, LambdaMethod::Guerrero).unwrap();
//!
//! // Standardize to zero mean, unit variance
//! let scaled = standardize(&bc.data);
//! assert_eq!(scaled.data.len(), 8);
//! ```

pub mod boxcox;
pub mod scale;

pub use boxcox::{
    boxcox, boxcox_auto, boxcox_lambda, guerrero_lambda, inv_boxcox, is_boxcox_suitable,
    select_lambda, BoxCoxResult, LambdaMethod,
};
pub use scale::{standardize, ScaleResult};
