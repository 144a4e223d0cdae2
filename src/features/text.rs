//! Derived features from the title and category text columns.

use polars::prelude::*;
use tracing::info;

use crate::error::Result;

const TITLE_COLUMN: &str = "title";
const CATEGORY_COLUMN: &str = "category";

/// Add text-derived features to both partitions.
///
/// From the title: character length, whitespace word count, and a digit
/// flag. From the category: count of `_`-separated tokens. Each group is
/// applied only when its source column is present; nulls propagate.
pub fn add_text_features(
    mut train: DataFrame,
    mut test: DataFrame,
) -> Result<(DataFrame, DataFrame, DataFrame)> {
    let mut rep_group: Vec<String> = Vec::new();
    let mut rep_features: Vec<String> = Vec::new();

    if train.column(TITLE_COLUMN).is_ok() {
        add_title_features(&mut train)?;
        if test.column(TITLE_COLUMN).is_ok() {
            add_title_features(&mut test)?;
        }
        rep_group.push(TITLE_COLUMN.to_string());
        rep_features.push("len,word_count,has_number".to_string());
    }

    if train.column(CATEGORY_COLUMN).is_ok() {
        add_category_features(&mut train)?;
        if test.column(CATEGORY_COLUMN).is_ok() {
            add_category_features(&mut test)?;
        }
        rep_group.push(CATEGORY_COLUMN.to_string());
        rep_features.push("token_count".to_string());
    }

    let report = if rep_group.is_empty() {
        crate::reporting::status_report("no_text_features")?
    } else {
        info!(groups = rep_group.len(), "added text features");
        DataFrame::new(vec![
            Column::new("group".into(), rep_group),
            Column::new("features".into(), rep_features),
        ])?
    };

    Ok((train, test, report))
}

fn add_title_features(df: &mut DataFrame) -> Result<()> {
    let series = df
        .column(TITLE_COLUMN)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let ca = series.str()?;

    let lens: Vec<Option<i64>> = ca
        .into_iter()
        .map(|v| v.map(|s| s.chars().count() as i64))
        .collect();
    let word_counts: Vec<Option<i64>> = ca
        .into_iter()
        .map(|v| v.map(|s| s.split_whitespace().count() as i64))
        .collect();
    let has_number: Vec<Option<bool>> = ca
        .into_iter()
        .map(|v| v.map(|s| s.chars().any(|c| c.is_ascii_digit())))
        .collect();

    df.with_column(Series::new("title_len".into(), lens))?;
    df.with_column(Series::new("title_word_count".into(), word_counts))?;
    df.with_column(Series::new("title_has_number".into(), has_number))?;
    Ok(())
}

fn add_category_features(df: &mut DataFrame) -> Result<()> {
    let series = df
        .column(CATEGORY_COLUMN)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let ca = series.str()?;

    let token_counts: Vec<Option<i64>> = ca
        .into_iter()
        .map(|v| v.map(|s| s.split('_').count() as i64))
        .collect();

    df.with_column(Series::new("category_token_count".into(), token_counts))?;
    Ok(())
}
