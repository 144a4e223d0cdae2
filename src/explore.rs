//! Stage 4: exploratory profiling.
//!
//! Builds descriptive profiles for the cleaned, processed, and full feature
//! datasets, plus Pearson correlations over the feature set. Profiles for
//! absent artifacts are silently skipped so the stage can run on partial
//! pipelines.

use std::collections::HashMap;
use std::path::PathBuf;

use polars::prelude::*;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::reporting;
use crate::types::is_numeric_dtype;
use crate::utils::{
    mean, numeric_values, numeric_values_with_nulls, quantile_nearest, safe_correlation,
    std_sample,
};

/// One row of the combined dataset profile.
#[derive(Debug, Default, Clone)]
struct ProfileRow {
    dataset: String,
    kind: String,
    column: String,
    status: Option<String>,
    count: Option<i64>,
    missing: Option<i64>,
    mean: Option<f64>,
    std: Option<f64>,
    min: Option<f64>,
    p25: Option<f64>,
    p50: Option<f64>,
    p75: Option<f64>,
    max: Option<f64>,
    zeros: Option<i64>,
    unique: Option<i64>,
    top: Option<String>,
    top_freq: Option<i64>,
    top_pct: Option<f64>,
}

/// Profiles pipeline artifacts and computes feature correlations.
pub struct ExploratoryAnalyzer {
    config: PipelineConfig,
}

impl ExploratoryAnalyzer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Profile whichever artifacts exist and write the EDA reports.
    /// Returns the path of the last profile written.
    pub fn run(&self) -> Result<PathBuf> {
        let paths = self.config.paths();
        let mut last = paths.statistics_dir.clone();

        let targets = [
            ("cleaned", paths.cleaned_books(), paths.eda_cleaned_profile()),
            (
                "processed",
                paths.processed_books(),
                paths.eda_processed_profile(),
            ),
            ("features", paths.features_full(), paths.eda_features_profile()),
        ];

        for (name, input, output) in targets {
            if !input.exists() {
                info!(dataset = name, "artifact absent, skipping profile");
                continue;
            }
            let df = reporting::read_csv(&input)?;
            let mut profile = self.profile(name, &df)?;
            reporting::write_csv(&mut profile, &output)?;
            last = output;

            if name == "features" {
                let mut correlations = self.correlations(&df)?;
                let out = paths.eda_features_correlations();
                reporting::write_csv(&mut correlations, &out)?;
                last = out;
            }
        }

        Ok(last)
    }

    /// Combined numeric and categorical summary of one dataset.
    pub fn profile(&self, dataset: &str, df: &DataFrame) -> Result<DataFrame> {
        let mut rows: Vec<ProfileRow> = Vec::new();

        for column in df.get_columns() {
            let series = column.as_materialized_series();
            if is_numeric_dtype(series.dtype()) {
                rows.push(numeric_profile(dataset, series)?);
            } else if matches!(
                series.dtype(),
                DataType::String | DataType::Categorical(_, _)
            ) {
                rows.push(categorical_profile(dataset, series)?);
            }
        }

        if rows.is_empty() {
            return reporting::status_report("no_profilable_columns");
        }
        profile_frame(rows)
    }

    /// Pearson correlations over the numeric columns of the feature set.
    ///
    /// When the configured target is present and numeric, every other
    /// numeric column is correlated against it; otherwise all numeric
    /// pairs are reported.
    pub fn correlations(&self, df: &DataFrame) -> Result<DataFrame> {
        let target = &self.config.target_column;

        let numeric_cols: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|c| is_numeric_dtype(c.dtype()))
            .map(|c| c.name().to_string())
            .collect();

        if numeric_cols.contains(target) {
            let target_series = df.column(target)?.as_materialized_series().clone();
            if target_series.null_count() == target_series.len() {
                return reporting::status_report("target_all_null");
            }
            let others: Vec<&String> = numeric_cols.iter().filter(|c| *c != target).collect();
            if others.is_empty() {
                return reporting::status_report("no_numeric_columns_except_target");
            }

            let target_values = numeric_values_with_nulls(&target_series)?;
            let mut features: Vec<String> = Vec::with_capacity(others.len());
            let mut correlations: Vec<Option<f64>> = Vec::with_capacity(others.len());
            for name in others {
                let series = df.column(name)?.as_materialized_series().clone();
                let values = numeric_values_with_nulls(&series)?;
                features.push(name.clone());
                correlations.push(safe_correlation(&values, &target_values));
            }

            let report = DataFrame::new(vec![
                Column::new("feature".into(), features),
                Column::new("correlation_with_target".into(), correlations),
            ])?;
            return Ok(report);
        }

        if numeric_cols.len() < 2 {
            return reporting::status_report("insufficient_numeric_columns");
        }

        let mut feature_a: Vec<String> = Vec::new();
        let mut feature_b: Vec<String> = Vec::new();
        let mut pearson: Vec<Option<f64>> = Vec::new();
        for i in 0..numeric_cols.len() {
            let left = numeric_values_with_nulls(
                df.column(&numeric_cols[i])?.as_materialized_series(),
            )?;
            for j in (i + 1)..numeric_cols.len() {
                let right = numeric_values_with_nulls(
                    df.column(&numeric_cols[j])?.as_materialized_series(),
                )?;
                feature_a.push(numeric_cols[i].clone());
                feature_b.push(numeric_cols[j].clone());
                pearson.push(safe_correlation(&left, &right));
            }
        }

        let report = DataFrame::new(vec![
            Column::new("feature_a".into(), feature_a),
            Column::new("feature_b".into(), feature_b),
            Column::new("pearson_corr".into(), pearson),
        ])?;
        Ok(report)
    }
}

fn numeric_profile(dataset: &str, series: &Series) -> Result<ProfileRow> {
    let mut row = ProfileRow {
        dataset: dataset.to_string(),
        kind: "numeric".to_string(),
        column: series.name().to_string(),
        ..ProfileRow::default()
    };

    let total = series.len();
    let missing = series.null_count();
    if missing == total {
        row.status = Some("all_null".to_string());
        return Ok(row);
    }

    let mut values = numeric_values(series)?;
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    row.count = Some(total as i64);
    row.missing = Some(missing as i64);
    row.mean = mean(&values);
    row.std = std_sample(&values);
    row.min = values.first().copied();
    row.p25 = quantile_nearest(&values, 0.25);
    row.p50 = quantile_nearest(&values, 0.5);
    row.p75 = quantile_nearest(&values, 0.75);
    row.max = values.last().copied();
    row.zeros = Some(values.iter().filter(|&&v| v == 0.0).count() as i64);

    let mut distinct = values.clone();
    distinct.dedup();
    row.unique = Some(distinct.len() as i64);

    Ok(row)
}

fn categorical_profile(dataset: &str, series: &Series) -> Result<ProfileRow> {
    let mut row = ProfileRow {
        dataset: dataset.to_string(),
        kind: "categorical".to_string(),
        column: series.name().to_string(),
        ..ProfileRow::default()
    };

    let total = series.len();
    let missing = series.null_count();
    if missing == total {
        row.status = Some("all_null".to_string());
        return Ok(row);
    }

    let ca = series.cast(&DataType::String)?;
    let ca = ca.str()?;
    let mut counts: HashMap<String, i64> = HashMap::new();
    for value in ca.into_iter().flatten() {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }

    // lexicographically smallest among max-count values, so ties are stable
    let top = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(value, freq)| (value.clone(), *freq));

    let non_null = (total - missing) as f64;
    row.count = Some(total as i64);
    row.missing = Some(missing as i64);
    row.unique = Some(counts.len() as i64);
    if let Some((value, freq)) = top {
        row.top = Some(value);
        row.top_freq = Some(freq);
        row.top_pct = Some(freq as f64 / non_null);
    }

    Ok(row)
}

fn profile_frame(rows: Vec<ProfileRow>) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Column::new(
            "dataset".into(),
            rows.iter().map(|r| r.dataset.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "type".into(),
            rows.iter().map(|r| r.kind.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "column".into(),
            rows.iter().map(|r| r.column.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "status".into(),
            rows.iter().map(|r| r.status.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "count".into(),
            rows.iter().map(|r| r.count).collect::<Vec<_>>(),
        ),
        Column::new(
            "missing".into(),
            rows.iter().map(|r| r.missing).collect::<Vec<_>>(),
        ),
        Column::new(
            "mean".into(),
            rows.iter().map(|r| r.mean).collect::<Vec<_>>(),
        ),
        Column::new("std".into(), rows.iter().map(|r| r.std).collect::<Vec<_>>()),
        Column::new("min".into(), rows.iter().map(|r| r.min).collect::<Vec<_>>()),
        Column::new("p25".into(), rows.iter().map(|r| r.p25).collect::<Vec<_>>()),
        Column::new("p50".into(), rows.iter().map(|r| r.p50).collect::<Vec<_>>()),
        Column::new("p75".into(), rows.iter().map(|r| r.p75).collect::<Vec<_>>()),
        Column::new("max".into(), rows.iter().map(|r| r.max).collect::<Vec<_>>()),
        Column::new(
            "zeros".into(),
            rows.iter().map(|r| r.zeros).collect::<Vec<_>>(),
        ),
        Column::new(
            "unique".into(),
            rows.iter().map(|r| r.unique).collect::<Vec<_>>(),
        ),
        Column::new("top".into(), rows.iter().map(|r| r.top.clone()).collect::<Vec<_>>()),
        Column::new(
            "top_freq".into(),
            rows.iter().map(|r| r.top_freq).collect::<Vec<_>>(),
        ),
        Column::new(
            "top_pct".into(),
            rows.iter().map(|r| r.top_pct).collect::<Vec<_>>(),
        ),
    ])?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn analyzer() -> ExploratoryAnalyzer {
        ExploratoryAnalyzer::new(PipelineConfig::default())
    }

    fn profile_row<'a>(profile: &'a DataFrame, column: &str) -> usize {
        profile
            .column("column")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .position(|v| v == Some(column))
            .expect("profile row present")
    }

    #[test]
    fn test_numeric_profile_statistics() {
        let df = df!(
            "stock" => &[Some(0i64), Some(1), Some(2), Some(3), Some(4), None],
        )
        .unwrap();

        let profile = analyzer().profile("cleaned", &df).unwrap();
        let row = profile_row(&profile, "stock");

        let count = profile.column("count").unwrap().i64().unwrap().get(row).unwrap();
        assert_eq!(count, 6);
        let missing = profile.column("missing").unwrap().i64().unwrap().get(row).unwrap();
        assert_eq!(missing, 1);
        let mean = profile.column("mean").unwrap().f64().unwrap().get(row).unwrap();
        assert_eq!(mean, 2.0);
        let p50 = profile.column("p50").unwrap().f64().unwrap().get(row).unwrap();
        assert_eq!(p50, 2.0);
        let zeros = profile.column("zeros").unwrap().i64().unwrap().get(row).unwrap();
        assert_eq!(zeros, 1);
        let unique = profile.column("unique").unwrap().i64().unwrap().get(row).unwrap();
        assert_eq!(unique, 5);

        // sample std of [0,1,2,3,4]
        let std = profile.column("std").unwrap().f64().unwrap().get(row).unwrap();
        assert!((std - 1.5811).abs() < 1e-3);
    }

    #[test]
    fn test_all_null_numeric_column() {
        let df = df!("price" => &[None::<f64>, None]).unwrap();
        let profile = analyzer().profile("cleaned", &df).unwrap();
        let row = profile_row(&profile, "price");
        let status = profile.column("status").unwrap().str().unwrap().get(row).unwrap();
        assert_eq!(status, "all_null");
    }

    #[test]
    fn test_categorical_top_with_deterministic_tie_break() {
        let df = df!(
            "category" => &["b", "a", "b", "a", "c"],
        )
        .unwrap();

        let profile = analyzer().profile("cleaned", &df).unwrap();
        let row = profile_row(&profile, "category");

        // "a" and "b" both occur twice; the lexicographically smaller wins
        let top = profile.column("top").unwrap().str().unwrap().get(row).unwrap();
        assert_eq!(top, "a");
        let top_freq = profile.column("top_freq").unwrap().i64().unwrap().get(row).unwrap();
        assert_eq!(top_freq, 2);
        let top_pct = profile.column("top_pct").unwrap().f64().unwrap().get(row).unwrap();
        assert_eq!(top_pct, 0.4);
    }

    #[test]
    fn test_correlations_against_target() {
        let df = df!(
            "price" => &[1.0, 2.0, 3.0, 4.0],
            "stock" => &[2.0, 4.0, 6.0, 8.0],
            "flat" => &[5.0, 5.0, 5.0, 5.0],
        )
        .unwrap();

        let report = analyzer().correlations(&df).unwrap();
        let features: Vec<&str> = report
            .column("feature")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(features, vec!["stock", "flat"]);

        let values: Vec<Option<f64>> = report
            .column("correlation_with_target")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert!((values[0].unwrap() - 1.0).abs() < 1e-12);
        // zero variance correlates to exactly 0.0
        assert_eq!(values[1], Some(0.0));
    }

    #[test]
    fn test_correlations_pairwise_without_target() {
        let df = df!(
            "a" => &[1.0, 2.0, 3.0],
            "b" => &[3.0, 2.0, 1.0],
            "c" => &[1.0, 1.0, 2.0],
        )
        .unwrap();

        let report = analyzer().correlations(&df).unwrap();
        // 3 columns -> 3 pairs
        assert_eq!(report.height(), 3);
        assert!(report.column("feature_a").is_ok());
    }

    #[test]
    fn test_correlation_with_too_few_joint_observations_is_null() {
        let df = df!(
            "price" => &[Some(1.0), None, Some(3.0)],
            "sparse" => &[None::<f64>, Some(2.0), Some(6.0)],
        )
        .unwrap();

        let report = analyzer().correlations(&df).unwrap();
        let value = report
            .column("correlation_with_target")
            .unwrap()
            .f64()
            .unwrap()
            .get(0);
        assert_eq!(value, None);
    }
}
