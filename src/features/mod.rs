//! Stage 3: feature engineering.
//!
//! Order of execution: split, outlier filtering, text features, price
//! scaling, one-hot encoding, extra features, selection, save. Every
//! transform that learns parameters fits them on the train partition only.

pub mod encoding;
pub mod outliers;
pub mod selection;
pub mod split;
pub mod text;
pub mod transforms;

use std::path::PathBuf;

use polars::prelude::*;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::reporting;
use transforms::{FitTransform, MinMaxScaler, QuantileBuckets};

/// Output of the feature engineering stage.
pub struct FeatureOutcome {
    pub train: DataFrame,
    pub test: DataFrame,
    pub split_report: DataFrame,
    pub outlier_report: DataFrame,
    pub text_report: DataFrame,
    pub scaling_report: DataFrame,
    pub encoding_report: DataFrame,
    pub extra_report: DataFrame,
    pub selection_report: DataFrame,
}

/// Builds the train/test feature sets from the processed dataset.
pub struct FeatureEngineer {
    config: PipelineConfig,
}

impl FeatureEngineer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Read the processed CSV, engineer features, and write the train, test
    /// and full feature sets plus every stage report. Returns the path of
    /// the full feature set.
    pub fn run(&self) -> Result<PathBuf> {
        let paths = self.config.paths();
        let df = reporting::read_csv(&paths.processed_books())?;

        let mut outcome = self.engineer(df)?;

        reporting::write_csv(&mut outcome.train, &paths.features_train())?;
        reporting::write_csv(&mut outcome.test, &paths.features_test())?;

        let mut full = concat_full(&outcome.train, &outcome.test)?;
        let out = paths.features_full();
        reporting::write_csv(&mut full, &out)?;

        reporting::write_csv(&mut outcome.split_report, &paths.dataset_split_report())?;
        reporting::write_csv(&mut outcome.outlier_report, &paths.outlier_report())?;
        reporting::write_csv(&mut outcome.text_report, &paths.text_features_report())?;
        reporting::write_csv(&mut outcome.scaling_report, &paths.feature_scaling_report())?;
        reporting::write_csv(
            &mut outcome.encoding_report,
            &paths.categorical_encoding_report(),
        )?;
        reporting::write_csv(&mut outcome.extra_report, &paths.extra_features_report())?;
        reporting::write_csv(
            &mut outcome.selection_report,
            &paths.feature_selection_report(),
        )?;
        Ok(out)
    }

    /// Engineer features from an in-memory processed DataFrame.
    pub fn engineer(&self, df: DataFrame) -> Result<FeatureOutcome> {
        let cfg = &self.config;

        let split = split::split(&df, cfg.test_fraction, cfg.random_seed)?;
        let (train, test, outlier_report) = outliers::filter_outliers(
            split.train,
            split.test,
            &cfg.outlier_columns,
            cfg.iqr_factor,
        )?;
        let (train, test, text_report) = text::add_text_features(train, test)?;
        let (train, test, scaling_report) = self.scale_price(train, test)?;
        let (train, test, encoding_report) = encoding::encode_categoricals(train, test, cfg)?;
        let (train, test, extra_report) = self.extra_features(train, test)?;
        let (train, test, selection_report) = selection::select_features(train, test, cfg)?;

        Ok(FeatureOutcome {
            train,
            test,
            split_report: split.report,
            outlier_report,
            text_report,
            scaling_report,
            encoding_report,
            extra_report,
            selection_report,
        })
    }

    /// Add a min-max scaled copy of the price column, fit on train.
    fn scale_price(
        &self,
        mut train: DataFrame,
        mut test: DataFrame,
    ) -> Result<(DataFrame, DataFrame, DataFrame)> {
        let column = &self.config.price_column;
        let scaled_name = format!("{column}_minmax");

        let Ok(col) = train.column(column) else {
            let report = DataFrame::new(vec![
                Column::new("status".into(), vec!["missing_price_column".to_string()]),
                Column::new("column".into(), vec![column.clone()]),
            ])?;
            return Ok((train, test, report));
        };

        let series = col.as_materialized_series().clone();
        let Some(scaler) = MinMaxScaler::fit(&series)? else {
            let report = DataFrame::new(vec![
                Column::new("status".into(), vec!["no_price_values".to_string()]),
                Column::new("column".into(), vec![column.clone()]),
            ])?;
            return Ok((train, test, report));
        };

        let scaled = scaler.transform(&series)?;
        train.with_column(scaled.with_name(scaled_name.as_str().into()))?;

        if test.column(column).is_ok() {
            let test_series = test.column(column)?.as_materialized_series().clone();
            let scaled = scaler.transform(&test_series)?;
            test.with_column(scaled.with_name(scaled_name.as_str().into()))?;
        }
        info!(column = %column, min = scaler.min, max = scaler.max, "scaled price");

        let report = DataFrame::new(vec![
            Column::new("column".into(), vec![column.clone()]),
            Column::new("min".into(), vec![scaler.min]),
            Column::new("max".into(), vec![scaler.max]),
            Column::new("scaled_feature".into(), vec![scaled_name]),
            Column::new("method".into(), vec!["minmax".to_string()]),
        ])?;
        Ok((train, test, report))
    }

    /// Add the derived price features: natural log and train-quintile bucket.
    fn extra_features(
        &self,
        mut train: DataFrame,
        mut test: DataFrame,
    ) -> Result<(DataFrame, DataFrame, DataFrame)> {
        let column = &self.config.price_column;

        if train.column(column).is_err() {
            let report = reporting::status_report("no_extra_features")?;
            return Ok((train, test, report));
        }

        let mut rep_feature: Vec<String> = Vec::new();
        let mut rep_source: Vec<String> = Vec::new();
        let mut rep_type: Vec<String> = Vec::new();
        let mut rep_quantiles: Vec<Option<String>> = Vec::new();

        let log_name = format!("{column}_log");
        add_log_column(&mut train, column, &log_name)?;
        if test.column(column).is_ok() {
            add_log_column(&mut test, column, &log_name)?;
        }
        rep_feature.push(log_name);
        rep_source.push(column.clone());
        rep_type.push("log_transform".to_string());
        rep_quantiles.push(None);

        let train_price = train.column(column)?.as_materialized_series().clone();
        if let Some(buckets) = QuantileBuckets::fit(&train_price)? {
            let bucket_name = format!("{column}_bucket");
            let assigned = buckets.transform(&train_price)?;
            train.with_column(assigned.with_name(bucket_name.as_str().into()))?;
            if test.column(column).is_ok() {
                let test_price = test.column(column)?.as_materialized_series().clone();
                let assigned = buckets.transform(&test_price)?;
                test.with_column(assigned.with_name(bucket_name.as_str().into()))?;
            }
            rep_feature.push(bucket_name);
            rep_source.push(column.clone());
            rep_type.push("quantile_bucket".to_string());
            rep_quantiles.push(Some(format!("{:?}", buckets.cuts)));
        }

        let report = DataFrame::new(vec![
            Column::new("feature".into(), rep_feature),
            Column::new("source".into(), rep_source),
            Column::new("type".into(), rep_type),
            Column::new("quantiles".into(), rep_quantiles),
        ])?;
        Ok((train, test, report))
    }
}

/// Natural log of positive values, null otherwise.
fn add_log_column(df: &mut DataFrame, source: &str, name: &str) -> Result<()> {
    let series = df.column(source)?.as_materialized_series().clone();
    let values = crate::utils::numeric_values_with_nulls(&series)?;
    let logged: Vec<Option<f64>> = values
        .into_iter()
        .map(|v| v.and_then(|x| if x > 0.0 { Some(x.ln()) } else { None }))
        .collect();
    df.with_column(Series::new(name.into(), logged))?;
    Ok(())
}

/// Vertical concat of train and test over their common columns, train
/// column order, train rows first.
fn concat_full(train: &DataFrame, test: &DataFrame) -> Result<DataFrame> {
    let common: Vec<String> = train
        .get_column_names()
        .iter()
        .filter(|name| test.column(name.as_str()).is_ok())
        .map(|name| name.to_string())
        .collect();

    let train_part = train.select(common.clone())?;
    let test_part = test.select(common)?;
    Ok(train_part.vstack(&test_part)?)
}
