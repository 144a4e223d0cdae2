//! Stage 1: dataset cleaning.
//!
//! Drops columns with too many nulls, imputes the rest, and removes
//! duplicate records, keeping the first occurrence. Expected columns that
//! are absent from the input are reported but never synthesized.

use std::collections::HashSet;
use std::path::PathBuf;

use polars::prelude::*;
use tracing::{info, warn};

use crate::config::{ImputationStrategy, PipelineConfig};
use crate::error::{EtlError, Result, ResultExt};
use crate::reporting;
use crate::types::is_numeric_dtype;

/// Output of the cleaning stage.
pub struct CleanOutcome {
    pub df: DataFrame,
    pub nulls_report: DataFrame,
    pub duplicates_report: DataFrame,
}

/// Cleans the raw book dataset.
pub struct DataCleaner {
    config: PipelineConfig,
}

impl DataCleaner {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Read the raw CSV, clean it, and write the cleaned dataset plus its
    /// reports. Returns the path of the cleaned artifact.
    pub fn run(&self) -> Result<PathBuf> {
        let paths = self.config.paths();
        let df = reporting::read_csv(&paths.raw_books())?;
        if df.height() == 0 {
            return Err(EtlError::EmptyDataset("raw book dataset".to_string()));
        }

        let mut outcome = self.clean(df)?;

        let out = paths.cleaned_books();
        reporting::write_csv(&mut outcome.df, &out)?;
        reporting::write_csv(&mut outcome.nulls_report, &paths.nulls_report())?;
        reporting::write_csv(&mut outcome.duplicates_report, &paths.duplicates_report())?;
        Ok(out)
    }

    /// Clean an in-memory DataFrame.
    pub fn clean(&self, df: DataFrame) -> Result<CleanOutcome> {
        let (df, nulls_report) = self.handle_nulls(df)?;
        let (df, duplicates_report) = self.deduplicate(df)?;
        Ok(CleanOutcome {
            df,
            nulls_report,
            duplicates_report,
        })
    }

    /// Per-column null handling: drop above the threshold, impute below it.
    fn handle_nulls(&self, mut df: DataFrame) -> Result<(DataFrame, DataFrame)> {
        let height = df.height();

        let mut rep_column: Vec<String> = Vec::new();
        let mut rep_dtype: Vec<String> = Vec::new();
        let mut rep_nulls: Vec<String> = Vec::new();
        let mut rep_pct: Vec<String> = Vec::new();
        let mut rep_action: Vec<String> = Vec::new();
        let mut rep_strategy: Vec<String> = Vec::new();

        let present: HashSet<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();

        for required in &self.config.required_columns {
            if !present.contains(required) {
                warn!(column = %required, "expected column absent from input");
                rep_column.push(required.clone());
                rep_dtype.push("MISSING".to_string());
                rep_nulls.push("N/A".to_string());
                rep_pct.push("100% (missing)".to_string());
                rep_action.push("missing_not_created".to_string());
                rep_strategy.push("none".to_string());
            }
        }

        let column_names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();

        let mut dropped: Vec<String> = Vec::new();

        for name in &column_names {
            let series = df.column(name)?.as_materialized_series().clone();
            let nulls = series.null_count();
            let frac = if height == 0 {
                0.0
            } else {
                nulls as f64 / height as f64
            };

            rep_column.push(name.clone());
            rep_dtype.push(format!("{:?}", series.dtype()));
            rep_nulls.push(nulls.to_string());
            rep_pct.push(format!("{:.2}%", frac * 100.0));

            if nulls == 0 {
                rep_action.push("none".to_string());
                rep_strategy.push("none".to_string());
            } else if frac >= self.config.null_threshold {
                dropped.push(name.clone());
                rep_action.push("column_dropped".to_string());
                rep_strategy.push("none".to_string());
            } else if is_numeric_dtype(series.dtype()) {
                let fill = match self.config.numeric_imputation {
                    ImputationStrategy::Median => series.median(),
                    ImputationStrategy::Mean => series.mean(),
                };
                if let Some(value) = fill {
                    let filled = fill_numeric_nulls(&series, value)
                        .context(format!("imputing column '{name}'"))?;
                    df.replace(name, filled)?;
                }
                rep_action.push("imputed".to_string());
                rep_strategy.push(self.config.numeric_imputation.as_str().to_string());
            } else {
                let as_string = if matches!(
                    series.dtype(),
                    DataType::String | DataType::Categorical(_, _)
                ) {
                    series.clone()
                } else {
                    series.cast(&DataType::String)?
                };
                let filled = fill_string_nulls(&as_string, &self.config.unknown_fill_value)
                    .context(format!("imputing column '{name}'"))?;
                df.replace(name, filled)?;
                rep_action.push("imputed".to_string());
                rep_strategy.push(format!("constant_{}", self.config.unknown_fill_value));
            }
        }

        for name in &dropped {
            df.drop_in_place(name)?;
            info!(column = %name, "dropped high-null column");
        }

        let report = DataFrame::new(vec![
            Column::new("column".into(), rep_column),
            Column::new("type".into(), rep_dtype),
            Column::new("nulls".into(), rep_nulls),
            Column::new("pct_nulls".into(), rep_pct),
            Column::new("action".into(), rep_action),
            Column::new("strategy".into(), rep_strategy),
        ])?;

        Ok((df, report))
    }

    /// Remove duplicate rows over the present subset of required columns,
    /// keeping the first occurrence in input order.
    fn deduplicate(&self, df: DataFrame) -> Result<(DataFrame, DataFrame)> {
        let rows_before = df.height();

        let subset: Vec<String> = self
            .config
            .required_columns
            .iter()
            .filter(|c| df.get_column_names().iter().any(|n| n.as_str() == c.as_str()))
            .cloned()
            .collect();

        let deduped = if subset.is_empty() {
            df
        } else {
            let key_columns: Vec<Series> = subset
                .iter()
                .map(|name| {
                    df.column(name)
                        .map(|c| c.as_materialized_series().clone())
                })
                .collect::<PolarsResult<_>>()?;

            let mut seen: HashSet<String> = HashSet::with_capacity(rows_before);
            let mut keep: Vec<bool> = Vec::with_capacity(rows_before);

            for row in 0..rows_before {
                let mut key = String::new();
                for series in &key_columns {
                    key.push_str(&format!("{}\u{1f}", series.get(row)?));
                }
                keep.push(seen.insert(key));
            }

            let mask = BooleanChunked::from_slice("keep".into(), &keep);
            df.filter(&mask)?
        };

        let rows_after = deduped.height();
        let removed = rows_before - rows_after;
        let pct_removed = if rows_before == 0 {
            0.0
        } else {
            removed as f64 / rows_before as f64 * 100.0
        };
        info!(rows_before, rows_after, removed, "deduplicated dataset");

        let report = DataFrame::new(vec![
            Column::new("rows_before".into(), vec![rows_before as i64]),
            Column::new("rows_after".into(), vec![rows_after as i64]),
            Column::new("duplicates_removed".into(), vec![removed as i64]),
            Column::new("pct_removed".into(), vec![pct_removed]),
        ])?;

        Ok((deduped, report))
    }
}

/// Fill null values in a numeric series with a specific value.
fn fill_numeric_nulls(series: &Series, fill_value: f64) -> Result<Series> {
    let casted = series.cast(&DataType::Float64)?;
    let ca = casted.f64()?;
    let filled: Vec<f64> = ca
        .into_iter()
        .map(|v| v.unwrap_or(fill_value))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a string series with a specific value.
fn fill_string_nulls(series: &Series, fill_value: &str) -> Result<Series> {
    let ca = series.str()?;
    let filled: Vec<String> = ca
        .into_iter()
        .map(|v| v.unwrap_or(fill_value).to_string())
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_config() -> PipelineConfig {
        PipelineConfig::builder()
            .required_columns(["title", "price", "category"])
            .build()
            .unwrap()
    }

    fn report_value(report: &DataFrame, column: &str, field: &str) -> String {
        let names = report.column("column").unwrap().str().unwrap();
        let row = names
            .into_iter()
            .position(|v| v == Some(column))
            .expect("column row present");
        report
            .column(field)
            .unwrap()
            .str()
            .unwrap()
            .get(row)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_high_null_column_dropped() {
        let df = df!(
            "title" => &["a", "b", "c", "d"],
            "price" => &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            "category" => &["x", "y", "x", "y"],
            "image_base64" => &[None::<&str>, None, None, Some("data")],
        )
        .unwrap();

        let outcome = DataCleaner::new(test_config()).clean(df).unwrap();
        assert!(outcome.df.column("image_base64").is_err());
        assert_eq!(
            report_value(&outcome.nulls_report, "image_base64", "action"),
            "column_dropped"
        );
    }

    #[test]
    fn test_numeric_imputation_uses_median() {
        let df = df!(
            "title" => &["a", "b", "c"],
            "price" => &[Some(10.0), None, Some(30.0)],
            "category" => &["x", "y", "z"],
        )
        .unwrap();

        let outcome = DataCleaner::new(test_config()).clean(df).unwrap();
        let price = outcome.df.column("price").unwrap();
        assert_eq!(price.null_count(), 0);
        let values: Vec<f64> = price.f64().unwrap().into_iter().flatten().collect();
        assert_eq!(values, vec![10.0, 20.0, 30.0]);
        assert_eq!(
            report_value(&outcome.nulls_report, "price", "strategy"),
            "median"
        );
    }

    #[test]
    fn test_string_imputation_fills_unknown() {
        let df = df!(
            "title" => &["a", "b", "c"],
            "price" => &[1.0, 2.0, 3.0],
            "category" => &[Some("x"), None, Some("z")],
        )
        .unwrap();

        let outcome = DataCleaner::new(test_config()).clean(df).unwrap();
        let category = outcome.df.column("category").unwrap();
        assert_eq!(category.null_count(), 0);
        assert_eq!(category.str().unwrap().get(1), Some("unknown"));
        assert_eq!(
            report_value(&outcome.nulls_report, "category", "strategy"),
            "constant_unknown"
        );
    }

    #[test]
    fn test_string_imputation_strategy_names_fill_value() {
        let df = df!(
            "title" => &["a", "b"],
            "price" => &[1.0, 2.0],
            "category" => &[Some("x"), None],
        )
        .unwrap();

        let config = PipelineConfig::builder()
            .required_columns(["title", "price", "category"])
            .unknown_fill_value("n/a")
            .build()
            .unwrap();

        let outcome = DataCleaner::new(config).clean(df).unwrap();
        let category = outcome.df.column("category").unwrap();
        assert_eq!(category.str().unwrap().get(1), Some("n/a"));
        assert_eq!(
            report_value(&outcome.nulls_report, "category", "strategy"),
            "constant_n/a"
        );
    }

    #[test]
    fn test_missing_required_column_reported_not_created() {
        let df = df!(
            "title" => &["a", "b"],
            "price" => &[1.0, 2.0],
        )
        .unwrap();

        let outcome = DataCleaner::new(test_config()).clean(df).unwrap();
        assert!(outcome.df.column("category").is_err());
        assert_eq!(
            report_value(&outcome.nulls_report, "category", "action"),
            "missing_not_created"
        );
        assert_eq!(
            report_value(&outcome.nulls_report, "category", "type"),
            "MISSING"
        );
    }

    #[test]
    fn test_deduplication_keeps_first_in_order() {
        let df = df!(
            "title" => &["a", "b", "a", "c", "b"],
            "price" => &[1.0, 2.0, 1.0, 3.0, 2.0],
            "category" => &["x", "y", "x", "z", "y"],
            "extra" => &[1i64, 2, 99, 4, 98],
        )
        .unwrap();

        let outcome = DataCleaner::new(test_config()).clean(df).unwrap();
        assert_eq!(outcome.df.height(), 3);

        // first occurrences survive with their non-key payload
        let extra: Vec<i64> = outcome
            .df
            .column("extra")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(extra, vec![1, 2, 4]);

        let removed = outcome
            .duplicates_report
            .column("duplicates_removed")
            .unwrap()
            .i64()
            .unwrap()
            .get(0)
            .unwrap();
        assert_eq!(removed, 2);
    }

    #[test]
    fn test_clean_never_grows_dataset() {
        let df = df!(
            "title" => &["a", "b", "c"],
            "price" => &[1.0, 2.0, 3.0],
            "category" => &["x", "y", "z"],
        )
        .unwrap();
        let input_height = df.height();

        let outcome = DataCleaner::new(test_config()).clean(df).unwrap();
        assert!(outcome.df.height() <= input_height);
        assert_eq!(outcome.df.height(), 3);
    }
}
