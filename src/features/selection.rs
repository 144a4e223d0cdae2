//! Variance and correlation based feature selection.

use polars::prelude::*;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::types::is_numeric_dtype;
use crate::utils::{numeric_values, numeric_values_with_nulls, safe_correlation, variance_population};

/// Reduce both partitions to the strongest numeric features.
///
/// Features with train variance at or below the threshold are dropped
/// (only when the threshold is positive), then the top `k` by absolute
/// Pearson correlation with the target survive. Both partitions are
/// projected onto the selected features plus the target and, when
/// present, the id column.
pub fn select_features(
    train: DataFrame,
    test: DataFrame,
    config: &PipelineConfig,
) -> Result<(DataFrame, DataFrame, DataFrame)> {
    let target = &config.target_column;

    let numeric_cols: Vec<String> = train
        .get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()))
        .map(|c| c.name().to_string())
        .collect();

    if !numeric_cols.contains(target) {
        warn!(target = %target, "selection target absent or non-numeric");
        let report = DataFrame::new(vec![
            Column::new(
                "status".into(),
                vec!["target_not_numeric_or_missing".to_string()],
            ),
            Column::new("target".into(), vec![target.clone()]),
        ])?;
        return Ok((train, test, report));
    }

    let mut feature_cols: Vec<String> = numeric_cols
        .into_iter()
        .filter(|c| c != target)
        .collect();

    if config.variance_threshold > 0.0 {
        let mut kept = Vec::with_capacity(feature_cols.len());
        for name in feature_cols {
            let series = train.column(&name)?.as_materialized_series().clone();
            let variance = variance_population(&numeric_values(&series)?).unwrap_or(0.0);
            if variance > config.variance_threshold {
                kept.push(name);
            }
        }
        feature_cols = kept;
    }

    let target_values =
        numeric_values_with_nulls(train.column(target)?.as_materialized_series())?;

    let mut scored: Vec<(String, f64)> = Vec::with_capacity(feature_cols.len());
    for name in feature_cols {
        let series = train.column(&name)?.as_materialized_series().clone();
        let values = numeric_values_with_nulls(&series)?;
        let score = safe_correlation(&values, &target_values)
            .map(f64::abs)
            .unwrap_or(0.0);
        scored.push((name, score));
    }

    // stable sort keeps column order among ties
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let k = config.select_k.min(scored.len());
    let selected = &scored[..k];
    info!(selected = k, candidates = scored.len(), "selected features");

    let mut keep: Vec<String> = selected.iter().map(|(name, _)| name.clone()).collect();
    keep.push(target.clone());
    if train.column(&config.id_column).is_ok() && !keep.contains(&config.id_column) {
        keep.push(config.id_column.clone());
    }

    let train = train.select(keep.clone())?;
    let available: Vec<String> = keep
        .iter()
        .filter(|c| test.column(c).is_ok())
        .cloned()
        .collect();
    let test = test.select(available)?;

    let report = DataFrame::new(vec![
        Column::new(
            "selected_feature".into(),
            selected.iter().map(|(name, _)| name.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "score".into(),
            selected.iter().map(|(_, score)| *score).collect::<Vec<_>>(),
        ),
        Column::new(
            "rank".into(),
            (1..=k as i64).collect::<Vec<_>>(),
        ),
    ])?;

    Ok((train, test, report))
}
