//! CSV input/output for datasets and stage reports.

use std::fs::{self, File};
use std::path::Path;

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{EtlError, Result};

/// Read a CSV file into a DataFrame.
///
/// Returns [`EtlError::MissingInput`] when the file does not exist, so the
/// orchestrator can distinguish an absent artifact from a malformed one.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(EtlError::MissingInput(path.to_path_buf()));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "loaded CSV"
    );
    Ok(df)
}

/// Write a DataFrame to CSV, creating parent directories as needed.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)?;

    info!(path = %path.display(), rows = df.height(), "wrote CSV");
    Ok(())
}

/// Single-row report carrying only a `status` column, used when a stage has
/// nothing substantive to record.
pub fn status_report(status: &str) -> Result<DataFrame> {
    let df = DataFrame::new(vec![Column::new("status".into(), vec![status.to_string()])])?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("bookdata-reporting-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_csv(Path::new("/nonexistent/books.csv")).unwrap_err();
        assert!(matches!(err, EtlError::MissingInput(_)));
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let mut df = df!(
            "title" => &["a", "b"],
            "stock" => &[3i64, 5],
        )
        .unwrap();

        let path = temp_path("round-trip.csv");
        write_csv(&mut df, &path).unwrap();

        let loaded = read_csv(&path).unwrap();
        assert_eq!(loaded.height(), 2);
        assert_eq!(loaded.width(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = temp_path("nested");
        let path = dir.join("deep").join("report.csv");

        let mut df = df!("status" => &["ok"]).unwrap();
        write_csv(&mut df, &path).unwrap();
        assert!(path.exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_status_report_shape() {
        let df = status_report("no_categorical_columns_encoded").unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.get_column_names()[0].as_str(), "status");
    }
}
