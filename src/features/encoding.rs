//! One-hot encoding of low-cardinality string columns, fit on train.

use std::collections::BTreeSet;

use polars::prelude::*;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::reporting;
use crate::utils::string_values;

/// One-hot encoder for a single column, with categories learned from train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneHotEncoder {
    pub column: String,
    /// Sorted distinct non-null train values.
    pub categories: Vec<String>,
}

impl OneHotEncoder {
    /// Learn the sorted category set from a train series.
    pub fn fit(column: &str, train: &Series) -> Result<Self> {
        let categories: BTreeSet<String> = string_values(train)?.into_iter().collect();
        Ok(Self {
            column: column.to_string(),
            categories: categories.into_iter().collect(),
        })
    }

    /// Indicator column names, `column__category`.
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|cat| format!("{}__{}", self.column, cat))
            .collect()
    }

    /// Append one f64 indicator column per category. Values unseen during
    /// fit (and nulls) produce all zeros.
    pub fn apply(&self, df: &mut DataFrame) -> Result<()> {
        let series = df
            .column(&self.column)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let ca = series.str()?;
        let values: Vec<Option<String>> =
            ca.into_iter().map(|v| v.map(|s| s.to_string())).collect();

        for (cat, name) in self.categories.iter().zip(self.feature_names()) {
            let indicator: Vec<f64> = values
                .iter()
                .map(|v| match v {
                    Some(s) if s == cat => 1.0,
                    _ => 0.0,
                })
                .collect();
            df.with_column(Series::new(name.as_str().into(), indicator))?;
        }
        Ok(())
    }
}

/// Encode eligible string columns of both partitions.
///
/// Eligible columns are String/Categorical, not the id/price/scaled-price
/// columns, and have train cardinality at or below the configured ceiling.
pub fn encode_categoricals(
    mut train: DataFrame,
    mut test: DataFrame,
    config: &PipelineConfig,
) -> Result<(DataFrame, DataFrame, DataFrame)> {
    let excluded = [
        config.id_column.clone(),
        config.price_column.clone(),
        format!("{}_minmax", config.price_column),
    ];

    let mut candidates: Vec<(String, usize)> = Vec::new();
    for column in train.get_columns() {
        let name = column.name().to_string();
        if excluded.contains(&name) {
            continue;
        }
        if !matches!(
            column.dtype(),
            DataType::String | DataType::Categorical(_, _)
        ) {
            continue;
        }
        let cardinality = column.as_materialized_series().n_unique()?;
        if cardinality <= config.max_ohe_cardinality {
            candidates.push((name, cardinality));
        }
    }

    if candidates.is_empty() {
        let report = reporting::status_report("no_categorical_columns_encoded")?;
        return Ok((train, test, report));
    }

    let mut rep_column: Vec<String> = Vec::new();
    let mut rep_cardinality: Vec<i64> = Vec::new();
    let mut rep_created: Vec<i64> = Vec::new();
    let mut rep_encoder: Vec<String> = Vec::new();

    for (name, cardinality) in &candidates {
        let series = train
            .column(name)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let encoder = OneHotEncoder::fit(name, &series)?;
        encoder.apply(&mut train)?;
        if test.column(name).is_ok() {
            encoder.apply(&mut test)?;
        }
        info!(
            column = %name,
            categories = encoder.categories.len(),
            "one-hot encoded column"
        );

        rep_column.push(name.clone());
        rep_cardinality.push(*cardinality as i64);
        rep_created.push(encoder.categories.len() as i64);
        rep_encoder.push("one_hot".to_string());
    }

    let report = DataFrame::new(vec![
        Column::new("column".into(), rep_column),
        Column::new("cardinality".into(), rep_cardinality),
        Column::new("created_features".into(), rep_created),
        Column::new("encoder".into(), rep_encoder),
    ])?;

    Ok((train, test, report))
}
