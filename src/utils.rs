//! Shared utilities for the book data pipeline.
//!
//! Statistical helpers operate on plain sorted slices so every stage uses
//! the same quantile and variance conventions; string parsing and ID
//! sampling live here because the transformer and the feature engineer
//! both need them.

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use regex::Regex;

use polars::prelude::*;

use crate::error::{EtlError, Result};

// =============================================================================
// Series extraction
// =============================================================================

/// Collect the non-null values of a numeric series as f64, in row order.
pub fn numeric_values(series: &Series) -> Result<Vec<f64>> {
    let casted = series.cast(&DataType::Float64)?;
    let ca = casted.f64()?;
    Ok(ca.into_iter().flatten().collect())
}

/// Collect every value of a numeric series as `Option<f64>`, in row order.
pub fn numeric_values_with_nulls(series: &Series) -> Result<Vec<Option<f64>>> {
    let casted = series.cast(&DataType::Float64)?;
    let ca = casted.f64()?;
    Ok(ca.into_iter().collect())
}

/// Collect the non-null values of a string series, in row order.
pub fn string_values(series: &Series) -> Result<Vec<String>> {
    let ca = series.str()?;
    Ok(ca.into_iter().flatten().map(|s| s.to_string()).collect())
}

// =============================================================================
// Statistics
// =============================================================================

/// Quantile of a sorted slice using nearest-rank interpolation:
/// the value at index `round(q * (n - 1))`.
pub fn quantile_nearest(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let idx = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted.get(idx).copied()
}

/// Arithmetic mean. None for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). None below two values.
pub fn std_sample(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Population variance (n denominator). None for an empty slice.
pub fn variance_population(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Pearson correlation over joint non-null pairs of two aligned series.
///
/// Fewer than two joint observations yield `None`; zero variance on either
/// side yields exactly `Some(0.0)` so constant columns rank last instead of
/// producing NaN.
pub fn safe_correlation(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys.iter())
        .filter_map(|(x, y)| match (x, y) {
            (Some(a), Some(b)) => Some((*a, *b)),
            _ => None,
        })
        .collect();

    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return Some(0.0);
    }

    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

// =============================================================================
// String parsing
// =============================================================================

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static NON_PRICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9,.]").unwrap());

/// Normalize free text to lowercase snake_case tokens.
///
/// # Example
///
/// ```rust,ignore
/// use bookdata_pipeline::utils::normalize_text;
///
/// assert_eq!(normalize_text("It's Only the Himalayas"), "it_s_only_the_himalayas");
/// ```
pub fn normalize_text(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let replaced = NON_ALNUM.replace_all(&lower, "_");
    replaced.trim_matches('_').to_string()
}

/// Parse a raw price string into f64.
///
/// Currency symbols and whitespace are stripped; only digits and the two
/// separator characters survive. When both separators are present the one
/// occurring later is the decimal separator and the other marks thousands,
/// so `"1.234,56"` and `"1,234.56"` both parse to 1234.56. A lone comma is
/// treated as a decimal separator. Unparseable input yields `None`.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned = NON_PRICE.replace_all(raw.trim(), "");
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) => {
            if comma > dot {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned.into_owned(),
    };

    normalized.parse::<f64>().ok()
}

// =============================================================================
// Synthetic IDs
// =============================================================================

/// Sample `count` distinct integers from `[10^(digits-1), 10^digits - 1]`
/// with a seeded RNG.
///
/// Returns [`EtlError::CapacityExceeded`] when the digit width cannot
/// address that many distinct values.
pub fn generate_unique_ids(count: usize, digits: u32, seed: u64) -> Result<Vec<i64>> {
    let low = 10i64.pow(digits - 1);
    let capacity = (9 * 10i64.pow(digits - 1)) as usize;

    if count > capacity {
        return Err(EtlError::CapacityExceeded {
            requested: count,
            capacity,
            digits,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let ids = rand::seq::index::sample(&mut rng, capacity, count)
        .into_iter()
        .map(|offset| low + offset as i64)
        .collect();

    Ok(ids)
}
