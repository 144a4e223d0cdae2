//! Stage 2: dataset transformation.
//!
//! Classifies column types, assigns synthetic record IDs, normalizes the
//! configured text columns, and parses raw price strings into floats.

use std::path::PathBuf;

use polars::prelude::*;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{EtlError, Result};
use crate::reporting;
use crate::types::ColumnKind;
use crate::utils::{generate_unique_ids, normalize_text, parse_price};

/// Output of the transformation stage.
#[derive(Debug)]
pub struct TransformOutcome {
    pub df: DataFrame,
    pub column_types_report: DataFrame,
    pub id_report: DataFrame,
    pub text_report: DataFrame,
    pub price_report: DataFrame,
}

/// Transforms the cleaned book dataset into its processed form.
pub struct DataTransformer {
    config: PipelineConfig,
}

impl DataTransformer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Read the cleaned CSV, transform it, and write the processed dataset
    /// plus its reports. Returns the path of the processed artifact.
    pub fn run(&self) -> Result<PathBuf> {
        let paths = self.config.paths();
        let df = reporting::read_csv(&paths.cleaned_books())?;
        if df.height() == 0 {
            return Err(EtlError::EmptyDataset("cleaned book dataset".to_string()));
        }

        let mut outcome = self.transform(df)?;

        let out = paths.processed_books();
        reporting::write_csv(&mut outcome.df, &out)?;
        reporting::write_csv(&mut outcome.column_types_report, &paths.column_types_report())?;
        reporting::write_csv(&mut outcome.id_report, &paths.id_generation_report())?;
        reporting::write_csv(&mut outcome.text_report, &paths.text_normalization_report())?;
        reporting::write_csv(&mut outcome.price_report, &paths.price_transform_report())?;
        Ok(out)
    }

    /// Transform an in-memory DataFrame.
    pub fn transform(&self, df: DataFrame) -> Result<TransformOutcome> {
        let column_types_report = self.column_types_report(&df)?;
        let (df, id_report) = self.assign_ids(df)?;
        let (df, text_report) = self.normalize_text_columns(df)?;
        let (df, price_report) = self.parse_prices(df)?;
        Ok(TransformOutcome {
            df,
            column_types_report,
            id_report,
            text_report,
            price_report,
        })
    }

    /// One row per column with its dtype and coarse kind.
    fn column_types_report(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut names: Vec<String> = Vec::with_capacity(df.width());
        let mut dtypes: Vec<String> = Vec::with_capacity(df.width());
        let mut kinds: Vec<String> = Vec::with_capacity(df.width());

        for column in df.get_columns() {
            names.push(column.name().to_string());
            dtypes.push(format!("{:?}", column.dtype()));
            kinds.push(ColumnKind::of(column.dtype()).as_str().to_string());
        }

        let report = DataFrame::new(vec![
            Column::new("column".into(), names),
            Column::new("dtype".into(), dtypes),
            Column::new("kind".into(), kinds),
        ])?;
        Ok(report)
    }

    /// Prepend a synthetic ID column unless one already exists.
    fn assign_ids(&self, mut df: DataFrame) -> Result<(DataFrame, DataFrame)> {
        let id_column = &self.config.id_column;
        let rows = df.height();

        if df.column(id_column).is_ok() {
            warn!(column = %id_column, "id column already present, skipping generation");
            let report = id_report_frame("id_column_exists", rows, self.config.id_digits, None)?;
            return Ok((df, report));
        }

        let ids = generate_unique_ids(rows, self.config.id_digits, self.config.random_seed)?;
        let min = ids.iter().min().copied();
        let max = ids.iter().max().copied();
        let unique = ids.len();
        info!(rows, digits = self.config.id_digits, "generated synthetic ids");

        let series = Series::new(id_column.as_str().into(), ids);
        df.insert_column(0, series)?;

        let report = id_report_frame(
            "generated",
            rows,
            self.config.id_digits,
            Some((min, max, unique)),
        )?;
        Ok((df, report))
    }

    /// Normalize the configured text columns to snake_case tokens.
    fn normalize_text_columns(&self, mut df: DataFrame) -> Result<(DataFrame, DataFrame)> {
        let mut rep_column: Vec<String> = Vec::new();
        let mut rep_status: Vec<String> = Vec::new();
        let mut rep_before: Vec<Option<String>> = Vec::new();
        let mut rep_after: Vec<Option<String>> = Vec::new();

        for name in &self.config.text_columns {
            let Ok(column) = df.column(name) else {
                warn!(column = %name, "text column absent, skipping normalization");
                rep_column.push(name.clone());
                rep_status.push("missing".to_string());
                rep_before.push(None);
                rep_after.push(None);
                continue;
            };

            let series = column.as_materialized_series().cast(&DataType::String)?;
            let ca = series.str()?;

            let before = ca.into_iter().flatten().next().map(|s| s.to_string());
            let normalized: Vec<Option<String>> = ca
                .into_iter()
                .map(|v| v.map(normalize_text))
                .collect();
            let after = normalized.iter().flatten().next().cloned();

            df.replace(name, Series::new(name.as_str().into(), normalized))?;

            rep_column.push(name.clone());
            rep_status.push("normalized".to_string());
            rep_before.push(before);
            rep_after.push(after);
        }

        let report = DataFrame::new(vec![
            Column::new("column".into(), rep_column),
            Column::new("status".into(), rep_status),
            Column::new("example_before".into(), rep_before),
            Column::new("example_after".into(), rep_after),
        ])?;
        Ok((df, report))
    }

    /// Parse the price column from raw currency strings into f64.
    fn parse_prices(&self, mut df: DataFrame) -> Result<(DataFrame, DataFrame)> {
        let name = &self.config.price_column;

        let Ok(column) = df.column(name) else {
            warn!(column = %name, "price column absent, skipping parse");
            let report = reporting::status_report("price_column_missing")?;
            return Ok((df, report));
        };

        let rows = df.height();
        let series = column.as_materialized_series().cast(&DataType::String)?;
        let ca = series.str()?;

        let mut converted = 0usize;
        let parsed: Vec<Option<f64>> = ca
            .into_iter()
            .map(|v| {
                let value = v.and_then(parse_price);
                if value.is_some() {
                    converted += 1;
                }
                value
            })
            .collect();

        let nulls_after = parsed.iter().filter(|v| v.is_none()).count();
        let pct_converted = if rows == 0 {
            0.0
        } else {
            converted as f64 / rows as f64 * 100.0
        };
        info!(rows, converted, nulls_after, "parsed price column");

        df.replace(name, Series::new(name.as_str().into(), parsed))?;

        let report = DataFrame::new(vec![
            Column::new("column".into(), vec![name.clone()]),
            Column::new("rows".into(), vec![rows as i64]),
            Column::new("nulls_after".into(), vec![nulls_after as i64]),
            Column::new("converted_values".into(), vec![converted as i64]),
            Column::new("pct_converted".into(), vec![pct_converted]),
        ])?;
        Ok((df, report))
    }
}

fn id_report_frame(
    status: &str,
    rows: usize,
    digits: u32,
    stats: Option<(Option<i64>, Option<i64>, usize)>,
) -> Result<DataFrame> {
    let (min, max, unique) = match stats {
        Some((min, max, unique)) => (min, max, Some(unique as i64)),
        None => (None, None, None),
    };

    let report = DataFrame::new(vec![
        Column::new("status".into(), vec![status.to_string()]),
        Column::new("rows".into(), vec![rows as i64]),
        Column::new("digits".into(), vec![digits as i64]),
        Column::new("min".into(), vec![min]),
        Column::new("max".into(), vec![max]),
        Column::new("unique_ids".into(), vec![unique]),
    ])?;
    Ok(report)
}
