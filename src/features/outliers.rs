//! IQR outlier filtering, fit on train and applied to both partitions.

use polars::prelude::*;
use tracing::{info, warn};

use crate::error::Result;
use crate::types::is_numeric_dtype;
use crate::utils::{numeric_values, numeric_values_with_nulls, quantile_nearest};

/// IQR bounds fitted on the train partition of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    /// Fit bounds from a train series. Returns `None` when the series has no
    /// non-null values or its IQR collapses to zero.
    pub fn fit(series: &Series, factor: f64) -> Result<FitResult> {
        let mut values = numeric_values(series)?;
        if values.is_empty() {
            return Ok(FitResult::NoQuantiles);
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let q1 = quantile_nearest(&values, 0.25).unwrap_or(f64::NAN);
        let q3 = quantile_nearest(&values, 0.75).unwrap_or(f64::NAN);
        let iqr = q3 - q1;
        if iqr == 0.0 {
            return Ok(FitResult::ZeroIqr { q1, q3 });
        }

        Ok(FitResult::Bounds(OutlierBounds {
            q1,
            q3,
            lower: q1 - factor * iqr,
            upper: q3 + factor * iqr,
        }))
    }

    /// Remove rows whose value falls outside the bounds. Null values are
    /// always retained. Returns the filtered frame and the removed count.
    pub fn apply(&self, df: &DataFrame, column: &str) -> Result<(DataFrame, usize)> {
        let before = df.height();
        let series = df.column(column)?.as_materialized_series().clone();
        let keep: Vec<bool> = numeric_values_with_nulls(&series)?
            .into_iter()
            .map(|v| v.map_or(true, |x| x >= self.lower && x <= self.upper))
            .collect();

        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        let filtered = df.filter(&mask)?;
        let removed = before - filtered.height();
        Ok((filtered, removed))
    }
}

/// Outcome of fitting bounds on one column.
pub enum FitResult {
    Bounds(OutlierBounds),
    ZeroIqr { q1: f64, q3: f64 },
    NoQuantiles,
}

/// Per-column outcome of the outlier stage, one row of the report.
struct OutlierRecord {
    column: String,
    status: String,
    q1: Option<f64>,
    q3: Option<f64>,
    lower: Option<f64>,
    upper: Option<f64>,
    removed_train: Option<i64>,
    removed_test: Option<i64>,
}

/// Filter outliers from both partitions with bounds fitted on train.
pub fn filter_outliers(
    mut train: DataFrame,
    mut test: DataFrame,
    columns: &[String],
    factor: f64,
) -> Result<(DataFrame, DataFrame, DataFrame)> {
    let mut records: Vec<OutlierRecord> = Vec::with_capacity(columns.len());

    for column in columns {
        let Ok(col) = train.column(column) else {
            warn!(column = %column, "outlier column absent");
            records.push(OutlierRecord {
                column: column.clone(),
                status: "missing".to_string(),
                q1: None,
                q3: None,
                lower: None,
                upper: None,
                removed_train: None,
                removed_test: None,
            });
            continue;
        };

        if !is_numeric_dtype(col.dtype()) {
            records.push(OutlierRecord {
                column: column.clone(),
                status: format!("non_numeric({:?})", col.dtype()),
                q1: None,
                q3: None,
                lower: None,
                upper: None,
                removed_train: None,
                removed_test: None,
            });
            continue;
        }

        let series = col.as_materialized_series().clone();
        match OutlierBounds::fit(&series, factor)? {
            FitResult::NoQuantiles => {
                records.push(OutlierRecord {
                    column: column.clone(),
                    status: "no_quantiles".to_string(),
                    q1: None,
                    q3: None,
                    lower: None,
                    upper: None,
                    removed_train: None,
                    removed_test: None,
                });
            }
            FitResult::ZeroIqr { q1, q3 } => {
                records.push(OutlierRecord {
                    column: column.clone(),
                    status: "zero_iqr".to_string(),
                    q1: Some(q1),
                    q3: Some(q3),
                    lower: None,
                    upper: None,
                    removed_train: None,
                    removed_test: None,
                });
            }
            FitResult::Bounds(bounds) => {
                let (filtered_train, removed_train) = bounds.apply(&train, column)?;
                train = filtered_train;

                let removed_test = if test.column(column).is_ok() {
                    let (filtered_test, removed) = bounds.apply(&test, column)?;
                    test = filtered_test;
                    removed
                } else {
                    0
                };

                info!(
                    column = %column,
                    lower = bounds.lower,
                    upper = bounds.upper,
                    removed_train,
                    removed_test,
                    "filtered outliers"
                );
                records.push(OutlierRecord {
                    column: column.clone(),
                    status: "filtered".to_string(),
                    q1: Some(bounds.q1),
                    q3: Some(bounds.q3),
                    lower: Some(bounds.lower),
                    upper: Some(bounds.upper),
                    removed_train: Some(removed_train as i64),
                    removed_test: Some(removed_test as i64),
                });
            }
        }
    }

    let report = DataFrame::new(vec![
        Column::new(
            "column".into(),
            records.iter().map(|r| r.column.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "status".into(),
            records.iter().map(|r| r.status.clone()).collect::<Vec<_>>(),
        ),
        Column::new("q1".into(), records.iter().map(|r| r.q1).collect::<Vec<_>>()),
        Column::new("q3".into(), records.iter().map(|r| r.q3).collect::<Vec<_>>()),
        Column::new(
            "lower".into(),
            records.iter().map(|r| r.lower).collect::<Vec<_>>(),
        ),
        Column::new(
            "upper".into(),
            records.iter().map(|r| r.upper).collect::<Vec<_>>(),
        ),
        Column::new(
            "removed_train".into(),
            records.iter().map(|r| r.removed_train).collect::<Vec<_>>(),
        ),
        Column::new(
            "removed_test".into(),
            records.iter().map(|r| r.removed_test).collect::<Vec<_>>(),
        ),
    ])?;

    Ok((train, test, report))
}
