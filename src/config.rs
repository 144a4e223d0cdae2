//! Configuration for the book data pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup, plus the on-disk artifact
//! layout derived from the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Strategy for imputing missing numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ImputationStrategy {
    /// Use the median of non-null values
    #[default]
    Median,
    /// Use the mean of non-null values
    Mean,
}

impl ImputationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImputationStrategy::Median => "median",
            ImputationStrategy::Mean => "mean",
        }
    }
}

/// Configuration for the full ETL pipeline.
///
/// Use [`PipelineConfig::builder()`] for fluent setup; unset fields keep
/// their defaults, which match the reference dataset layout.
///
/// # Example
///
/// ```rust,ignore
/// use bookdata_pipeline::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .null_threshold(0.5)
///     .test_fraction(0.2)
///     .random_seed(7)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Columns every raw record is expected to carry. Missing ones are
    /// reported, never synthesized.
    pub required_columns: Vec<String>,

    /// Fraction of nulls at or above which a column is dropped (0.0 - 1.0).
    /// Default: 0.4
    pub null_threshold: f64,

    /// Imputation strategy for numeric columns below the drop threshold.
    pub numeric_imputation: ImputationStrategy,

    /// Constant used to fill nulls in non-numeric columns.
    pub unknown_fill_value: String,

    /// Columns normalized to snake_case tokens during transformation.
    pub text_columns: Vec<String>,

    /// Column holding the raw price strings.
    pub price_column: String,

    /// Name of the synthetic identifier column.
    pub id_column: String,

    /// Digit width of synthetic IDs (1 - 12).
    pub id_digits: u32,

    /// Fraction of rows assigned to the test partition (0.0 - 1.0,
    /// exclusive upper bound).
    pub test_fraction: f64,

    /// Seed for the split shuffle and ID sampling.
    pub random_seed: u64,

    /// Numeric columns screened for IQR outliers.
    pub outlier_columns: Vec<String>,

    /// IQR multiplier for the outlier bounds. Default: 1.5
    pub iqr_factor: f64,

    /// Maximum train cardinality for a column to be one-hot encoded.
    pub max_ohe_cardinality: usize,

    /// Minimum train variance a feature must exceed to survive selection.
    /// Only applied when strictly positive.
    pub variance_threshold: f64,

    /// Number of features kept by correlation-based selection.
    pub select_k: usize,

    /// Target column for correlation ranking.
    pub target_column: String,

    /// Root directory for raw/cleaned/processed/features/statistics data.
    pub data_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            required_columns: [
                "title",
                "price",
                "rating",
                "availability",
                "category",
                "image",
                "product_page",
                "stock",
                "image_base64",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            null_threshold: 0.4,
            numeric_imputation: ImputationStrategy::default(),
            unknown_fill_value: "unknown".to_string(),
            text_columns: vec!["title".to_string(), "category".to_string()],
            price_column: "price".to_string(),
            id_column: "id".to_string(),
            id_digits: 6,
            test_fraction: 0.3,
            random_seed: 42,
            outlier_columns: vec!["price".to_string(), "stock".to_string()],
            iqr_factor: 1.5,
            max_ohe_cardinality: 30,
            variance_threshold: 0.0,
            select_k: 20,
            target_column: "price".to_string(),
            data_dir: PathBuf::from("data"),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.null_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "null_threshold".to_string(),
                value: self.null_threshold,
            });
        }

        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "test_fraction".to_string(),
                value: self.test_fraction,
            });
        }

        if !(1..=12).contains(&self.id_digits) {
            return Err(ConfigValidationError::InvalidIdDigits(self.id_digits));
        }

        if self.select_k == 0 {
            return Err(ConfigValidationError::InvalidSelectK(self.select_k));
        }

        if self.iqr_factor <= 0.0 {
            return Err(ConfigValidationError::InvalidIqrFactor(self.iqr_factor));
        }

        Ok(())
    }

    /// Artifact layout rooted at `data_dir`.
    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.data_dir)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid id_digits: {0} (must be between 1 and 12)")]
    InvalidIdDigits(u32),

    #[error("Invalid select_k: {0} (must be at least 1)")]
    InvalidSelectK(usize),

    #[error("Invalid iqr_factor: {0} (must be positive)")]
    InvalidIqrFactor(f64),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    inner: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the columns every raw record is expected to carry.
    pub fn required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.required_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the null fraction at or above which a column is dropped.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.4 = 40%)
    pub fn null_threshold(mut self, threshold: f64) -> Self {
        self.inner.null_threshold = threshold;
        self
    }

    /// Set the numeric imputation strategy.
    pub fn numeric_imputation(mut self, strategy: ImputationStrategy) -> Self {
        self.inner.numeric_imputation = strategy;
        self
    }

    /// Set the constant used for non-numeric null imputation.
    pub fn unknown_fill_value(mut self, value: impl Into<String>) -> Self {
        self.inner.unknown_fill_value = value.into();
        self
    }

    /// Set the columns normalized during transformation.
    pub fn text_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.text_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the digit width of synthetic IDs.
    pub fn id_digits(mut self, digits: u32) -> Self {
        self.inner.id_digits = digits;
        self
    }

    /// Set the test partition fraction.
    pub fn test_fraction(mut self, fraction: f64) -> Self {
        self.inner.test_fraction = fraction;
        self
    }

    /// Set the random seed for splitting and ID sampling.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.inner.random_seed = seed;
        self
    }

    /// Set the columns screened for IQR outliers.
    pub fn outlier_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.outlier_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the IQR multiplier for outlier bounds.
    pub fn iqr_factor(mut self, factor: f64) -> Self {
        self.inner.iqr_factor = factor;
        self
    }

    /// Set the maximum train cardinality for one-hot encoding.
    pub fn max_ohe_cardinality(mut self, max: usize) -> Self {
        self.inner.max_ohe_cardinality = max;
        self
    }

    /// Set the minimum variance a feature must exceed to be kept.
    pub fn variance_threshold(mut self, threshold: f64) -> Self {
        self.inner.variance_threshold = threshold;
        self
    }

    /// Set the number of features kept by selection.
    pub fn select_k(mut self, k: usize) -> Self {
        self.inner.select_k = k;
        self
    }

    /// Set the target column for correlation ranking.
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.inner.target_column = column.into();
        self
    }

    /// Set the root data directory.
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.data_dir = path.into();
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

/// On-disk artifact layout, derived from the configured data directory.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub raw_dir: PathBuf,
    pub cleaned_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub features_dir: PathBuf,
    pub statistics_dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            raw_dir: data_dir.join("raw"),
            cleaned_dir: data_dir.join("cleaned"),
            processed_dir: data_dir.join("processed"),
            features_dir: data_dir.join("features"),
            statistics_dir: data_dir.join("statistics"),
        }
    }

    pub fn raw_books(&self) -> PathBuf {
        self.raw_dir.join("all_books_with_images.csv")
    }

    pub fn cleaned_books(&self) -> PathBuf {
        self.cleaned_dir.join("cleaned_books.csv")
    }

    pub fn nulls_report(&self) -> PathBuf {
        self.cleaned_dir.join("nulls_report_books_cleaned.csv")
    }

    pub fn duplicates_report(&self) -> PathBuf {
        self.cleaned_dir.join("duplicates_report_books_cleaned.csv")
    }

    pub fn processed_books(&self) -> PathBuf {
        self.processed_dir.join("processed_books.csv")
    }

    pub fn column_types_report(&self) -> PathBuf {
        self.processed_dir.join("column_types_report.csv")
    }

    pub fn text_normalization_report(&self) -> PathBuf {
        self.processed_dir.join("text_normalization_report.csv")
    }

    pub fn price_transform_report(&self) -> PathBuf {
        self.processed_dir.join("price_transform_report.csv")
    }

    pub fn id_generation_report(&self) -> PathBuf {
        self.processed_dir.join("id_generation_report.csv")
    }

    pub fn features_train(&self) -> PathBuf {
        self.features_dir.join("features_train.csv")
    }

    pub fn features_test(&self) -> PathBuf {
        self.features_dir.join("features_test.csv")
    }

    pub fn features_full(&self) -> PathBuf {
        self.features_dir.join("features_full.csv")
    }

    pub fn dataset_split_report(&self) -> PathBuf {
        self.features_dir.join("dataset_split_report.csv")
    }

    pub fn outlier_report(&self) -> PathBuf {
        self.features_dir.join("outlier_report.csv")
    }

    pub fn text_features_report(&self) -> PathBuf {
        self.features_dir.join("text_features_report.csv")
    }

    pub fn feature_scaling_report(&self) -> PathBuf {
        self.features_dir.join("feature_scaling_report.csv")
    }

    pub fn categorical_encoding_report(&self) -> PathBuf {
        self.features_dir.join("categorical_encoding_report.csv")
    }

    pub fn extra_features_report(&self) -> PathBuf {
        self.features_dir.join("extra_features_report.csv")
    }

    pub fn feature_selection_report(&self) -> PathBuf {
        self.features_dir.join("feature_selection_report.csv")
    }

    pub fn eda_cleaned_profile(&self) -> PathBuf {
        self.statistics_dir.join("eda_cleaned_profile.csv")
    }

    pub fn eda_processed_profile(&self) -> PathBuf {
        self.statistics_dir.join("eda_processed_profile.csv")
    }

    pub fn eda_features_profile(&self) -> PathBuf {
        self.statistics_dir.join("eda_features_profile.csv")
    }

    pub fn eda_features_correlations(&self) -> PathBuf {
        self.statistics_dir.join("eda_features_correlations.csv")
    }

    pub fn pipeline_execution_report(&self) -> PathBuf {
        self.statistics_dir.join("pipeline_execution_report.csv")
    }
}
