//! Fixed-schema feature extraction.
//!
//! Every series is Box-Cox transformed (with a scale-invariant lambda) and
//! standardized before any feature is computed, so multiplying a series by a
//! positive constant leaves its feature vector unchanged.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::seasonality::STL;
use crate::transform::{boxcox, select_lambda, standardize, LambdaMethod};

use super::autocorrelation::{AcfFeatures, PacfFeatures};
use super::entropy::spectral_entropy;
use super::shape::{crossing_points, flat_spots};
use super::stl_features::StlFeatures;
use super::tiled::{lumpiness, stability, tile_width};

/// A single named feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Feature {
    Length,
    Frequency,
    Lambda,
    Entropy,
    Trend,
    Seasonality,
    Linearity,
    Curvature,
    Spikiness,
    EAcf1,
    EAcf10,
    XAcf1,
    XAcf10,
    Diff1Acf1,
    Diff1Acf10,
    Diff2Acf1,
    Diff2Acf10,
    SeasAcf1,
    XPacf5,
    Diff1xPacf5,
    Diff2xPacf5,
    SeasPacf,
    Stability,
    Lumpiness,
    CrossingPoints,
    FlatSpots,
    Peak,
    Trough,
}

impl Feature {
    /// Every feature, in canonical order.
    pub const ALL: [Feature; 28] = [
        Feature::Length,
        Feature::Frequency,
        Feature::Lambda,
        Feature::Entropy,
        Feature::Trend,
        Feature::Seasonality,
        Feature::Linearity,
        Feature::Curvature,
        Feature::Spikiness,
        Feature::EAcf1,
        Feature::EAcf10,
        Feature::XAcf1,
        Feature::XAcf10,
        Feature::Diff1Acf1,
        Feature::Diff1Acf10,
        Feature::Diff2Acf1,
        Feature::Diff2Acf10,
        Feature::SeasAcf1,
        Feature::XPacf5,
        Feature::Diff1xPacf5,
        Feature::Diff2xPacf5,
        Feature::SeasPacf,
        Feature::Stability,
        Feature::Lumpiness,
        Feature::CrossingPoints,
        Feature::FlatSpots,
        Feature::Peak,
        Feature::Trough,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Feature::Length => "length",
            Feature::Frequency => "frequency",
            Feature::Lambda => "lambda",
            Feature::Entropy => "entropy",
            Feature::Trend => "trend",
            Feature::Seasonality => "seasonality",
            Feature::Linearity => "linearity",
            Feature::Curvature => "curvature",
            Feature::Spikiness => "spikiness",
            Feature::EAcf1 => "e_acf1",
            Feature::EAcf10 => "e_acf10",
            Feature::XAcf1 => "x_acf1",
            Feature::XAcf10 => "x_acf10",
            Feature::Diff1Acf1 => "diff1_acf1",
            Feature::Diff1Acf10 => "diff1_acf10",
            Feature::Diff2Acf1 => "diff2_acf1",
            Feature::Diff2Acf10 => "diff2_acf10",
            Feature::SeasAcf1 => "seas_acf1",
            Feature::XPacf5 => "x_pacf5",
            Feature::Diff1xPacf5 => "diff1x_pacf5",
            Feature::Diff2xPacf5 => "diff2x_pacf5",
            Feature::SeasPacf => "seas_pacf",
            Feature::Stability => "stability",
            Feature::Lumpiness => "lumpiness",
            Feature::CrossingPoints => "crossing_points",
            Feature::FlatSpots => "flat_spots",
            Feature::Peak => "peak",
            Feature::Trough => "trough",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| ForecastError::InvalidParameter(format!("unknown feature '{}'", s)))
    }
}

impl TryFrom<String> for Feature {
    type Error = ForecastError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Feature> for String {
    fn from(f: Feature) -> String {
        f.name().to_string()
    }
}

/// Feature extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Features to emit, in output order.
    pub features: Vec<Feature>,
    /// Apply a Box-Cox transform to strictly positive series.
    pub boxcox: bool,
    /// How the Box-Cox lambda is chosen.
    pub lambda_method: LambdaMethod,
    /// STL seasonal smoothing window.
    pub seasonal_window: usize,
    /// Minimum series length regardless of period.
    pub min_length: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            features: Feature::ALL.to_vec(),
            boxcox: true,
            lambda_method: LambdaMethod::Guerrero,
            seasonal_window: STL::DEFAULT_SEASONAL_WINDOW,
            min_length: 16,
        }
    }
}

impl FeatureConfig {
    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features = features;
        self
    }

    pub fn with_boxcox(mut self, enabled: bool) -> Self {
        self.boxcox = enabled;
        self
    }

    pub fn with_lambda_method(mut self, method: LambdaMethod) -> Self {
        self.lambda_method = method;
        self
    }

    pub fn with_seasonal_window(mut self, window: usize) -> Self {
        self.seasonal_window = window;
        self
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    /// Identifies every setting that changes feature values.
    fn fingerprint(&self) -> String {
        let method = match self.lambda_method {
            LambdaMethod::Guerrero => "guerrero",
            LambdaMethod::LogLikelihood => "loglik",
        };
        format!(
            "boxcox={};lambda={};seasonal_window={};min_length={}",
            self.boxcox, method, self.seasonal_window, self.min_length
        )
    }

    fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "at least one feature must be selected".to_string(),
            ));
        }
        for (i, f) in self.features.iter().enumerate() {
            if self.features[..i].contains(f) {
                return Err(ForecastError::InvalidParameter(format!(
                    "feature '{}' selected twice",
                    f
                )));
            }
        }
        if self.seasonal_window < 7 {
            return Err(ForecastError::InvalidParameter(
                "seasonal window must be at least 7".to_string(),
            ));
        }
        if self.min_length < 4 {
            return Err(ForecastError::InvalidParameter(
                "min_length must be at least 4".to_string(),
            ));
        }
        Ok(())
    }
}

/// Ordered feature names plus the fingerprint of the configuration that
/// produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    names: Vec<String>,
    fingerprint: String,
}

impl FeatureSchema {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// A fixed-size, ordered feature vector tied to its schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFeatureVector")]
pub struct FeatureVector {
    schema: Arc<FeatureSchema>,
    values: Vec<f64>,
}

#[derive(Deserialize)]
struct RawFeatureVector {
    schema: Arc<FeatureSchema>,
    values: Vec<f64>,
}

impl TryFrom<RawFeatureVector> for FeatureVector {
    type Error = ForecastError;

    fn try_from(raw: RawFeatureVector) -> Result<Self> {
        Self::new(raw.schema, raw.values)
    }
}

impl FeatureVector {
    /// Pair raw values with a schema.
    pub fn new(schema: Arc<FeatureSchema>, values: Vec<f64>) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(ForecastError::FeatureDimensionMismatch {
                expected: schema.len(),
                got: values.len(),
            });
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the named feature.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.position(name).map(|i| self.values[i])
    }

    /// `(name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.schema
            .names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Check that this vector was produced under `expected`.
    pub fn ensure_compatible(&self, expected: &FeatureSchema) -> Result<()> {
        if self.values.len() != expected.len() {
            return Err(ForecastError::FeatureDimensionMismatch {
                expected: expected.len(),
                got: self.values.len(),
            });
        }
        if self.schema.names != expected.names {
            return Err(ForecastError::FeatureSchemaMismatch(
                "feature names or order differ".to_string(),
            ));
        }
        if self.schema.fingerprint != expected.fingerprint {
            return Err(ForecastError::FeatureSchemaMismatch(format!(
                "extractor configuration differs: expected '{}', got '{}'",
                expected.fingerprint, self.schema.fingerprint
            )));
        }
        Ok(())
    }
}

/// Turns time series into feature vectors under one fixed schema.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    schema: Arc<FeatureSchema>,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Result<Self> {
        config.validate()?;
        let schema = Arc::new(FeatureSchema {
            names: config.features.iter().map(|f| f.name().to_string()).collect(),
            fingerprint: config.fingerprint(),
        });
        Ok(Self { config, schema })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Shared handle to the schema attached to every extracted vector.
    pub fn schema_handle(&self) -> Arc<FeatureSchema> {
        Arc::clone(&self.schema)
    }

    /// Minimum number of observations for a series with this period.
    pub fn min_length(&self, period: usize) -> usize {
        if period > 1 {
            self.config.min_length.max(2 * period + 1)
        } else {
            self.config.min_length
        }
    }

    /// Extract the feature vector of a whole series.
    pub fn extract(&self, series: &TimeSeries) -> Result<FeatureVector> {
        self.extract_values(series.values(), series.period())
    }

    /// Extract features from raw observations with the given period.
    pub fn extract_values(&self, values: &[f64], period: usize) -> Result<FeatureVector> {
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if period == 0 {
            return Err(ForecastError::InvalidParameter(
                "period must be at least 1".to_string(),
            ));
        }
        let needed = self.min_length(period);
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }
        if values.iter().any(|x| !x.is_finite()) {
            return Err(ForecastError::MissingValues);
        }

        let lambda = if self.config.boxcox {
            select_lambda(values, period, self.config.lambda_method)
        } else {
            None
        };
        let transformed = match lambda {
            Some(l) => boxcox(values, l),
            None => values.to_vec(),
        };
        let x = standardize(&transformed).data;

        let stl = STL::new(period)
            .with_seasonal_smoothness(self.config.seasonal_window)
            .decompose(&x)?;
        let stl_features = StlFeatures::compute(&stl);
        let acf = AcfFeatures::compute(&x, period);
        let pacf = PacfFeatures::compute(&x, period);
        let width = tile_width(period);

        let raw: Vec<f64> = self
            .config
            .features
            .iter()
            .map(|feature| match feature {
                Feature::Length => values.len() as f64,
                Feature::Frequency => period as f64,
                Feature::Lambda => lambda.unwrap_or(1.0),
                Feature::Entropy => spectral_entropy(&x),
                Feature::Trend => stl_features.trend,
                Feature::Seasonality => stl_features.seasonality,
                Feature::Linearity => stl_features.linearity,
                Feature::Curvature => stl_features.curvature,
                Feature::Spikiness => stl_features.spikiness,
                Feature::EAcf1 => stl_features.e_acf1,
                Feature::EAcf10 => stl_features.e_acf10,
                Feature::XAcf1 => acf.x_acf1,
                Feature::XAcf10 => acf.x_acf10,
                Feature::Diff1Acf1 => acf.diff1_acf1,
                Feature::Diff1Acf10 => acf.diff1_acf10,
                Feature::Diff2Acf1 => acf.diff2_acf1,
                Feature::Diff2Acf10 => acf.diff2_acf10,
                Feature::SeasAcf1 => acf.seas_acf1,
                Feature::XPacf5 => pacf.x_pacf5,
                Feature::Diff1xPacf5 => pacf.diff1x_pacf5,
                Feature::Diff2xPacf5 => pacf.diff2x_pacf5,
                Feature::SeasPacf => pacf.seas_pacf,
                Feature::Stability => stability(&x, width),
                Feature::Lumpiness => lumpiness(&x, width),
                Feature::CrossingPoints => crossing_points(&x),
                Feature::FlatSpots => flat_spots(&x),
                Feature::Peak => stl_features.peak,
                Feature::Trough => stl_features.trough,
            })
            .collect();

        let values: Vec<f64> = raw
            .into_iter()
            .zip(&self.config.features)
            .map(|(v, feature)| {
                if v.is_finite() {
                    v
                } else {
                    warn!(feature = feature.name(), value = v, "non-finite feature replaced by 0");
                    0.0
                }
            })
            .collect();

        debug!(
            len = values.len(),
            period,
            lambda = lambda.unwrap_or(1.0),
            "extracted features"
        );

        Ok(FeatureVector {
            schema: Arc::clone(&self.schema),
            values,
        })
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        let config = FeatureConfig::default();
        let schema = Arc::new(FeatureSchema {
            names: config.features.iter().map(|f| f.name().to_string()).collect(),
            fingerprint: config.fingerprint(),
        });
        Self { config, schema }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seasonal_series(n: usize, period: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                50.0 + 0.3 * i as f64
                    + 8.0 * (2.0 * std::f64::consts::PI * i as f64 / period as f64).sin()
                    + ((i as f64 * 7.3).sin() * 1.7)
            })
            .collect()
    }

    #[test]
    fn default_schema_lists_every_feature() {
        let extractor = FeatureExtractor::default();
        assert_eq!(extractor.schema().len(), Feature::ALL.len());
        assert_eq!(extractor.schema().names()[0], "length");
        assert_eq!(extractor.schema().position("trough"), Some(27));
    }

    #[test]
    fn feature_names_round_trip() {
        for f in Feature::ALL {
            assert_eq!(f.name().parse::<Feature>().unwrap(), f);
        }
        assert!("bogus".parse::<Feature>().is_err());
    }

    #[test]
    fn min_length_depends_on_period() {
        let extractor = FeatureExtractor::default();
        assert_eq!(extractor.min_length(1), 16);
        assert_eq!(extractor.min_length(4), 16);
        assert_eq!(extractor.min_length(12), 25);
    }

    #[test]
    fn too_short_series_is_rejected() {
        let ts = TimeSeries::new((1..=20).map(|i| i as f64).collect(), 12).unwrap();
        let err = FeatureExtractor::default().extract(&ts).unwrap_err();
        assert_eq!(err, ForecastError::InsufficientData { needed: 25, got: 20 });
    }

    #[test]
    fn extraction_is_deterministic() {
        let ts = TimeSeries::new(seasonal_series(60, 12), 12).unwrap();
        let extractor = FeatureExtractor::default();
        let a = extractor.extract(&ts).unwrap();
        let b = extractor.extract(&ts).unwrap();
        for (x, y) in a.values().iter().zip(b.values()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn features_are_scale_invariant() {
        let values = seasonal_series(60, 12);
        let extractor = FeatureExtractor::default();
        let base = extractor.extract_values(&values, 12).unwrap();
        let scaled: Vec<f64> = values.iter().map(|v| v * 1234.5).collect();
        let other = extractor.extract_values(&scaled, 12).unwrap();
        for ((name, a), b) in base.iter().zip(other.values()) {
            if name == "lambda" {
                continue;
            }
            assert_relative_eq!(a, b, epsilon = 1e-6, max_relative = 1e-6);
        }
    }

    #[test]
    fn linear_trend_features() {
        let values: Vec<f64> = (1..=48).map(|i| i as f64).collect();
        let fv = FeatureExtractor::default().extract_values(&values, 12).unwrap();
        assert_relative_eq!(fv.get("trend").unwrap(), 1.0, epsilon = 1e-6);
        assert!(fv.get("seasonality").unwrap() < 1e-6);
        assert!(fv.get("linearity").unwrap() > 0.0);
        assert_relative_eq!(fv.get("lambda").unwrap(), 1.0, epsilon = 0.011);
    }

    #[test]
    fn non_positive_series_reports_unit_lambda() {
        let values: Vec<f64> = (0..30).map(|i| (i as f64 * 0.9).sin()).collect();
        let fv = FeatureExtractor::default().extract_values(&values, 1).unwrap();
        assert_eq!(fv.get("lambda"), Some(1.0));
        assert_eq!(fv.get("seasonality"), Some(0.0));
        assert_eq!(fv.get("peak"), Some(0.0));
    }

    #[test]
    fn constant_series_yields_finite_vector() {
        let fv = FeatureExtractor::default().extract_values(&[5.0; 20], 1).unwrap();
        assert!(fv.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn deserialization_checks_vector_length() {
        let small = FeatureExtractor::new(
            FeatureConfig::default().with_features(vec![Feature::Trend, Feature::Entropy]),
        )
        .unwrap();
        let fv = small.extract_values(&seasonal_series(40, 4), 4).unwrap();
        let json = serde_json::to_string(&fv).unwrap();
        let back: FeatureVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back.schema(), fv.schema());
        assert_eq!(back.len(), 2);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["values"] = serde_json::json!([0.5]);
        assert!(serde_json::from_value::<FeatureVector>(value).is_err());
    }

    #[test]
    fn subset_schema_and_compatibility() {
        let config = FeatureConfig::default().with_features(vec![Feature::Trend, Feature::Entropy]);
        let small = FeatureExtractor::new(config).unwrap();
        let values = seasonal_series(40, 4);
        let fv = small.extract_values(&values, 4).unwrap();
        assert_eq!(fv.len(), 2);
        assert_eq!(fv.schema().names(), &["trend".to_string(), "entropy".to_string()]);

        let full = FeatureExtractor::default();
        assert!(matches!(
            fv.ensure_compatible(full.schema()),
            Err(ForecastError::FeatureDimensionMismatch { expected: 28, got: 2 })
        ));

        let reordered = FeatureExtractor::new(
            FeatureConfig::default().with_features(vec![Feature::Entropy, Feature::Trend]),
        )
        .unwrap();
        assert!(matches!(
            fv.ensure_compatible(reordered.schema()),
            Err(ForecastError::FeatureSchemaMismatch(_))
        ));

        let other_config = FeatureExtractor::new(
            FeatureConfig::default()
                .with_features(vec![Feature::Trend, Feature::Entropy])
                .with_boxcox(false),
        )
        .unwrap();
        assert!(matches!(
            fv.ensure_compatible(other_config.schema()),
            Err(ForecastError::FeatureSchemaMismatch(_))
        ));
        assert!(fv.ensure_compatible(small.schema()).is_ok());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(FeatureExtractor::new(FeatureConfig::default().with_features(vec![])).is_err());
        assert!(FeatureExtractor::new(
            FeatureConfig::default().with_features(vec![Feature::Trend, Feature::Trend])
        )
        .is_err());
        assert!(FeatureExtractor::new(FeatureConfig::default().with_seasonal_window(3)).is_err());
    }

    #[test]
    fn config_deserializes_feature_names() {
        let config: FeatureConfig =
            serde_json::from_str(r#"{"features": ["trend", "x_acf1"], "boxcox": false}"#).unwrap();
        assert_eq!(config.features, vec![Feature::Trend, Feature::XAcf1]);
        assert!(!config.boxcox);
        assert_eq!(config.min_length, 16);
    }
}
