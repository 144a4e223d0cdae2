//! Fit-on-train, apply-to-both column transforms.
//!
//! Every transform that learns parameters from data fits them on the train
//! partition only and applies the same parameters to both partitions, so
//! nothing about the test set leaks into the learned state.

use polars::prelude::*;

use crate::error::Result;
use crate::utils::{numeric_values, numeric_values_with_nulls, quantile_nearest};

/// A column transform whose parameters are learned from the train partition.
///
/// `fit` returns `None` when the train series carries no usable signal
/// (e.g. all nulls), in which case the stage records a status row instead
/// of transforming anything.
pub trait FitTransform: Sized {
    /// Learn parameters from the train series.
    fn fit(train: &Series) -> Result<Option<Self>>;

    /// Apply the learned parameters to a series from either partition.
    fn transform(&self, series: &Series) -> Result<Series>;
}

/// Min-max scaler over the observed train range.
///
/// A degenerate train range (zero variance) maps every non-null value to
/// zero; otherwise values scale to `[0, 1]` on train while test values
/// outside the train range are left unclamped. Nulls stay null.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    pub min: f64,
    pub max: f64,
}

impl FitTransform for MinMaxScaler {
    fn fit(train: &Series) -> Result<Option<Self>> {
        let values = numeric_values(train)?;
        if values.is_empty() {
            return Ok(None);
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Some(Self { min, max }))
    }

    fn transform(&self, series: &Series) -> Result<Series> {
        let range = self.max - self.min;
        let scaled: Vec<Option<f64>> = numeric_values_with_nulls(series)?
            .into_iter()
            .map(|v| {
                v.map(|x| {
                    if range == 0.0 {
                        0.0
                    } else {
                        (x - self.min) / range
                    }
                })
            })
            .collect();
        Ok(Series::new(series.name().clone(), scaled))
    }
}

/// Quintile bucketing with cut points learned from train.
///
/// Values fall into buckets 0 through 4 by comparison against the train
/// q20/q40/q60/q80 cut points (nearest-rank). Nulls stay null.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantileBuckets {
    pub cuts: [f64; 4],
}

impl FitTransform for QuantileBuckets {
    fn fit(train: &Series) -> Result<Option<Self>> {
        let mut values = numeric_values(train)?;
        if values.is_empty() {
            return Ok(None);
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let cuts = [
            quantile_nearest(&values, 0.2),
            quantile_nearest(&values, 0.4),
            quantile_nearest(&values, 0.6),
            quantile_nearest(&values, 0.8),
        ];
        match cuts {
            [Some(a), Some(b), Some(c), Some(d)] => Ok(Some(Self {
                cuts: [a, b, c, d],
            })),
            _ => Ok(None),
        }
    }

    fn transform(&self, series: &Series) -> Result<Series> {
        let buckets: Vec<Option<i64>> = numeric_values_with_nulls(series)?
            .into_iter()
            .map(|v| {
                v.map(|x| {
                    self.cuts
                        .iter()
                        .position(|&cut| x <= cut)
                        .unwrap_or(self.cuts.len()) as i64
                })
            })
            .collect();
        Ok(Series::new(series.name().clone(), buckets))
    }
}
