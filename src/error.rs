//! Error types for the anofox-meta library.

use thiserror::Error;

/// Result type alias for meta-learning and forecasting operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur during feature extraction, forecasting and training.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A feature vector has a different length than the trained model expects.
    #[error("feature dimension mismatch: model expects {expected} features, got {got}")]
    FeatureDimensionMismatch { expected: usize, got: usize },

    /// A feature vector was produced by a differently configured extractor.
    #[error("feature schema mismatch: {0}")]
    FeatureSchemaMismatch(String),

    /// Model weights and computed forecasts cover different candidate sets.
    #[error("mismatched model set: weights cover {weights:?}, forecasts cover {forecasts:?}")]
    MismatchedModelSet {
        weights: Vec<String>,
        forecasts: Vec<String>,
    },

    /// The classifier or booster failed to produce a usable model.
    #[error("training failed to converge: {0}")]
    TrainingConvergence(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Missing values detected when not allowed.
    #[error("missing values detected in data")]
    MissingValues,

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// A trained model could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}
