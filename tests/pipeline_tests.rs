//! End-to-end pipeline tests against the bundled fixture dataset.

use std::fs;
use std::path::{Path, PathBuf};

use bookdata_pipeline::{
    reporting, DataCleaner, DataTransformer, PipelineConfig, PipelineRunner, StageStatus,
};
use pretty_assertions::assert_eq;

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/books_sample.csv")
}

/// Build a config rooted at a unique temp directory with the fixture staged
/// as the raw dataset.
fn staged_config(tag: &str) -> PipelineConfig {
    let data_dir = std::env::temp_dir().join(format!(
        "bookdata-it-{}-{}",
        std::process::id(),
        tag
    ));
    let config = PipelineConfig::builder()
        .data_dir(&data_dir)
        .build()
        .unwrap();

    let raw = config.paths().raw_books();
    fs::create_dir_all(raw.parent().unwrap()).unwrap();
    fs::copy(fixture_path(), &raw).unwrap();
    config
}

fn cleanup(config: &PipelineConfig) {
    fs::remove_dir_all(&config.data_dir).ok();
}

#[test]
fn full_pipeline_succeeds_on_fixture() {
    let config = staged_config("full-run");
    let paths = config.paths();

    let mut runner = PipelineRunner::new(config.clone());
    let report_path = runner.run().unwrap();

    for outcome in runner.outcomes() {
        assert_eq!(
            outcome.status,
            StageStatus::Success,
            "stage {} did not succeed: {:?}",
            outcome.stage,
            outcome.error
        );
    }
    assert!(!runner.any_failed());

    // every primary artifact exists
    assert!(paths.cleaned_books().exists());
    assert!(paths.processed_books().exists());
    assert!(paths.features_train().exists());
    assert!(paths.features_test().exists());
    assert!(paths.features_full().exists());
    assert!(paths.eda_cleaned_profile().exists());
    assert!(paths.eda_features_correlations().exists());
    assert!(report_path.exists());

    let report = reporting::read_csv(&report_path).unwrap();
    assert_eq!(report.height(), 4);

    cleanup(&config);
}

#[test]
fn cleaning_deduplicates_and_drops_sparse_column() {
    let config = staged_config("cleaning");
    let paths = config.paths();

    let raw = reporting::read_csv(&paths.raw_books()).unwrap();
    DataCleaner::new(config.clone()).run().unwrap();
    let cleaned = reporting::read_csv(&paths.cleaned_books()).unwrap();

    // the fixture carries two exact duplicate records
    assert_eq!(cleaned.height(), raw.height() - 2);

    // image_base64 is mostly null and must be dropped
    assert!(cleaned.column("image_base64").is_err());

    // imputed columns carry no nulls
    assert_eq!(cleaned.column("rating").unwrap().null_count(), 0);
    assert_eq!(cleaned.column("availability").unwrap().null_count(), 0);
    assert_eq!(cleaned.column("stock").unwrap().null_count(), 0);

    cleanup(&config);
}

#[test]
fn transformation_assigns_ids_and_parses_prices() {
    let config = staged_config("transform");
    let paths = config.paths();

    DataCleaner::new(config.clone()).run().unwrap();
    DataTransformer::new(config.clone()).run().unwrap();

    let processed = reporting::read_csv(&paths.processed_books()).unwrap();

    // ids are distinct six-digit integers
    let ids: Vec<i64> = processed
        .column("id")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(ids.len(), processed.height());
    assert!(ids.iter().all(|&id| (100_000..=999_999).contains(&id)));
    let mut distinct = ids.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), ids.len());

    // all fixture prices are parseable, including the comma-decimal one
    let prices: Vec<f64> = processed
        .column("price")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(prices.len(), processed.height());
    assert!(prices.contains(&13.99));
    assert!(prices.contains(&51.77));

    // titles are normalized to snake_case tokens
    let titles: Vec<&str> = processed
        .column("title")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert!(titles.contains(&"a_light_in_the_attic"));
    assert!(titles
        .iter()
        .all(|t| t.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')));

    cleanup(&config);
}

#[test]
fn feature_sets_partition_the_processed_rows() {
    let config = staged_config("features");
    let paths = config.paths();

    let mut runner = PipelineRunner::new(config.clone());
    runner.run().unwrap();

    let train = reporting::read_csv(&paths.features_train()).unwrap();
    let test = reporting::read_csv(&paths.features_test()).unwrap();
    let full = reporting::read_csv(&paths.features_full()).unwrap();

    assert!(train.height() > 0);
    assert!(test.height() > 0);
    assert_eq!(full.height(), train.height() + test.height());

    // selection keeps the target and at most k features
    assert!(train.column("price").is_ok());
    let selection = reporting::read_csv(&paths.feature_selection_report()).unwrap();
    assert!(selection.height() <= config.select_k);

    // train and test feature ids are disjoint
    let train_ids: Vec<i64> = train
        .column("id")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    let test_ids: Vec<i64> = test
        .column("id")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    for id in &test_ids {
        assert!(!train_ids.contains(id));
    }

    cleanup(&config);
}

#[test]
fn rerun_with_same_seed_is_reproducible() {
    let config_a = staged_config("repro-a");
    let config_b = staged_config("repro-b");

    PipelineRunner::new(config_a.clone()).run().unwrap();
    PipelineRunner::new(config_b.clone()).run().unwrap();

    let full_a = reporting::read_csv(&config_a.paths().features_full()).unwrap();
    let full_b = reporting::read_csv(&config_b.paths().features_full()).unwrap();
    assert_eq!(full_a, full_b);

    cleanup(&config_a);
    cleanup(&config_b);
}

#[test]
fn missing_raw_input_reports_failure_and_skips_downstream() {
    let data_dir = std::env::temp_dir().join(format!(
        "bookdata-it-{}-no-input",
        std::process::id()
    ));
    let config = PipelineConfig::builder()
        .data_dir(&data_dir)
        .build()
        .unwrap();

    let mut runner = PipelineRunner::new(config.clone());
    let report_path = runner.run().unwrap();

    let statuses: Vec<StageStatus> = runner.outcomes().iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            StageStatus::Failed,
            StageStatus::Skipped,
            StageStatus::Skipped,
            StageStatus::Skipped,
        ]
    );
    assert!(report_path.exists());

    cleanup(&config);
}
