//! Error types for the book data pipeline.
//!
//! Fatal conditions (missing input file, empty dataset, exhausted ID space)
//! are modeled as variants of [`EtlError`]; soft failures never become errors
//! and are instead recorded as `status` rows in the stage reports.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for pipeline stages.
#[derive(Error, Debug)]
pub enum EtlError {
    /// A required source file is absent.
    #[error("Input file not found: {0}")]
    MissingInput(PathBuf),

    /// A stage loaded zero rows.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// More unique IDs were requested than the digit width can address.
    #[error(
        "Requested {requested} unique IDs but only {capacity} are available with {digits} digits"
    )]
    CapacityExceeded {
        requested: usize,
        capacity: usize,
        digits: u32,
    },

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EtlError>,
    },
}

impl EtlError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EtlError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, used in the pipeline execution report.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingInput(_) => "MISSING_INPUT",
            Self::EmptyDataset(_) => "EMPTY_DATASET",
            Self::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EtlError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            EtlError::MissingInput(PathBuf::from("data/raw/books.csv")).error_code(),
            "MISSING_INPUT"
        );
        assert_eq!(
            EtlError::EmptyDataset("cleaner".to_string()).error_code(),
            "EMPTY_DATASET"
        );
        assert_eq!(
            EtlError::CapacityExceeded {
                requested: 1_000_000,
                capacity: 900_000,
                digits: 6,
            }
            .error_code(),
            "CAPACITY_EXCEEDED"
        );
    }

    #[test]
    fn test_with_context_preserves_code() {
        let err = EtlError::ColumnNotFound("price".to_string()).with_context("during scaling");
        assert!(err.to_string().contains("during scaling"));
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_capacity_exceeded_message() {
        let err = EtlError::CapacityExceeded {
            requested: 10_000,
            capacity: 9_000,
            digits: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("10000"));
        assert!(msg.contains("9000"));
        assert!(msg.contains("4 digits"));
    }
}
