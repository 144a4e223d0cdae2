//! Seeded train/test split.

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::error::{EtlError, Result};

/// Result of splitting a dataset into train and test partitions.
#[derive(Debug)]
pub struct SplitOutcome {
    pub train: DataFrame,
    pub test: DataFrame,
    pub report: DataFrame,
}

/// Split `df` into train and test partitions.
///
/// Row indices are shuffled with a seeded RNG and the first
/// `ceil(n * test_fraction)` shuffled indices form the test set. Both
/// partitions preserve the input row order.
pub fn split(df: &DataFrame, test_fraction: f64, seed: u64) -> Result<SplitOutcome> {
    let total = df.height();
    if total == 0 {
        return Err(EtlError::EmptyDataset("dataset split".to_string()));
    }

    let test_rows = (total as f64 * test_fraction).ceil() as usize;

    let mut indices: Vec<usize> = (0..total).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut is_test = vec![false; total];
    for &idx in indices.iter().take(test_rows) {
        is_test[idx] = true;
    }

    let test_mask = BooleanChunked::from_slice("is_test".into(), &is_test);
    let train_mask = !(&test_mask);

    let train = df.filter(&train_mask)?;
    let test = df.filter(&test_mask)?;
    info!(
        total,
        train_rows = train.height(),
        test_rows = test.height(),
        "split dataset"
    );

    let observed = test.height() as f64 / total as f64;
    let report = DataFrame::new(vec![
        Column::new("total_rows".into(), vec![total as i64]),
        Column::new("train_rows".into(), vec![train.height() as i64]),
        Column::new("test_rows".into(), vec![test.height() as i64]),
        Column::new("test_ratio_requested".into(), vec![test_fraction]),
        Column::new(
            "test_ratio_observed".into(),
            vec![format!("{:.2}%", observed * 100.0)],
        ),
    ])?;

    Ok(SplitOutcome {
        train,
        test,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_df(n: usize) -> DataFrame {
        let ids: Vec<i64> = (0..n as i64).collect();
        df!("row" => ids).unwrap()
    }

    #[test]
    fn test_split_sizes_use_ceiling() {
        let outcome = split(&sample_df(10), 0.3, 42).unwrap();
        assert_eq!(outcome.test.height(), 3);
        assert_eq!(outcome.train.height(), 7);

        // ceil(7 * 0.3) = 3
        let outcome = split(&sample_df(7), 0.3, 42).unwrap();
        assert_eq!(outcome.test.height(), 3);
        assert_eq!(outcome.train.height(), 4);
    }

    #[test]
    fn test_split_is_deterministic() {
        let df = sample_df(20);
        let a = split(&df, 0.3, 42).unwrap();
        let b = split(&df, 0.3, 42).unwrap();
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
    }

    #[test]
    fn test_split_partitions_preserve_order() {
        let outcome = split(&sample_df(50), 0.3, 42).unwrap();

        for part in [&outcome.train, &outcome.test] {
            let rows: Vec<i64> = part
                .column("row")
                .unwrap()
                .i64()
                .unwrap()
                .into_iter()
                .flatten()
                .collect();
            let mut sorted = rows.clone();
            sorted.sort_unstable();
            assert_eq!(rows, sorted);
        }
    }

    #[test]
    fn test_split_covers_all_rows_exactly_once() {
        let outcome = split(&sample_df(30), 0.3, 7).unwrap();
        let mut rows: Vec<i64> = Vec::new();
        for part in [&outcome.train, &outcome.test] {
            rows.extend(
                part.column("row")
                    .unwrap()
                    .i64()
                    .unwrap()
                    .into_iter()
                    .flatten(),
            );
        }
        rows.sort_unstable();
        let expected: Vec<i64> = (0..30).collect();
        assert_eq!(rows, expected);
    }

    #[test]
    fn test_split_empty_dataset_fails() {
        let df = DataFrame::new(vec![Column::new("row".into(), Vec::<i64>::new())]).unwrap();
        let err = split(&df, 0.3, 42).unwrap_err();
        assert!(matches!(err, EtlError::EmptyDataset(_)));
    }
}
