//! Shared types used across pipeline stages.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Coarse category of a column's data type, used to dispatch cleaning and
/// transformation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Integer or floating point numbers
    Numeric,
    /// String/text or categorical type
    Categorical,
    /// Boolean type
    Boolean,
    /// Other/unknown types
    Other,
}

impl ColumnKind {
    /// Classify a polars data type.
    pub fn of(dtype: &DataType) -> Self {
        if is_numeric_dtype(dtype) {
            ColumnKind::Numeric
        } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
            ColumnKind::Categorical
        } else if matches!(dtype, DataType::Boolean) {
            ColumnKind::Boolean
        } else {
            ColumnKind::Other
        }
    }

    /// Label used in the column types report.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Other => "other",
        }
    }
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Terminal status of a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    Success,
    Failed,
    Skipped,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Success => "success",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
        }
    }
}

/// Result of running one pipeline stage, one row of the execution report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    /// Stage name (e.g. "clean", "transform").
    pub stage: String,
    /// Terminal status.
    pub status: StageStatus,
    /// Wall-clock duration in seconds.
    pub duration_sec: f64,
    /// Primary artifact produced, when the stage ran.
    pub artifact: Option<String>,
    /// Error description for failed stages.
    pub error: Option<String>,
}

impl StageOutcome {
    pub fn success(stage: impl Into<String>, duration_sec: f64, artifact: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            status: StageStatus::Success,
            duration_sec,
            artifact: Some(artifact.into()),
            error: None,
        }
    }

    pub fn failed(stage: impl Into<String>, duration_sec: f64, error: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            status: StageStatus::Failed,
            duration_sec,
            artifact: None,
            error: Some(error.into()),
        }
    }

    pub fn skipped(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            status: StageStatus::Skipped,
            duration_sec: 0.0,
            artifact: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_kind_dispatch() {
        assert_eq!(ColumnKind::of(&DataType::Int64), ColumnKind::Numeric);
        assert_eq!(ColumnKind::of(&DataType::Float64), ColumnKind::Numeric);
        assert_eq!(ColumnKind::of(&DataType::String), ColumnKind::Categorical);
        assert_eq!(ColumnKind::of(&DataType::Boolean), ColumnKind::Boolean);
        assert_eq!(ColumnKind::of(&DataType::Date), ColumnKind::Other);
    }

    #[test]
    fn test_column_kind_labels() {
        assert_eq!(ColumnKind::Numeric.as_str(), "numeric");
        assert_eq!(ColumnKind::Other.as_str(), "other");
    }

    #[test]
    fn test_stage_outcome_constructors() {
        let ok = StageOutcome::success("clean", 0.5, "data/cleaned/cleaned_books.csv");
        assert_eq!(ok.status, StageStatus::Success);
        assert!(ok.error.is_none());

        let failed = StageOutcome::failed("transform", 0.1, "boom");
        assert_eq!(failed.status, StageStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("boom"));

        let skipped = StageOutcome::skipped("features");
        assert_eq!(skipped.status, StageStatus::Skipped);
        assert_eq!(skipped.duration_sec, 0.0);
    }
}
