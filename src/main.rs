//! CLI entry point for the book data pipeline.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::Path;
use tracing::info;

use bookdata_pipeline::{
    DataCleaner, DataTransformer, ExploratoryAnalyzer, FeatureEngineer, PipelineConfig,
    PipelineRunner,
};

/// Pipeline stage selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliStage {
    /// Run every stage in order
    All,
    /// Data cleaning only
    Clean,
    /// Data transformation only
    Transform,
    /// Feature engineering only
    Features,
    /// Exploratory profiling only
    Explore,
}

#[derive(Parser, Debug)]
#[command(
    name = "bookdata-pipeline",
    version,
    about = "ETL pipeline for the scraped book dataset",
    long_about = "Runs the book dataset ETL pipeline: cleaning, transformation, \
                  feature engineering, and exploratory profiling.\n\n\
                  EXAMPLES:\n  \
                  # Full pipeline against ./data\n  \
                  bookdata-pipeline\n\n  \
                  # Stage a raw export first\n  \
                  bookdata-pipeline -i exports/books.csv\n\n  \
                  # One stage with a custom config file\n  \
                  bookdata-pipeline --stage features --config pipeline.json\n\n  \
                  # Quick experiment with overrides\n  \
                  bookdata-pipeline --test-fraction 0.2 --seed 7 --select-k 10"
)]
struct Args {
    /// Raw books CSV to stage into <data-dir>/raw before running
    ///
    /// If not specified, the pipeline reads whatever is already staged
    #[arg(short, long)]
    input: Option<String>,

    /// Root data directory (raw/cleaned/processed/features/statistics)
    #[arg(short, long)]
    data_dir: Option<String>,

    /// Pipeline stage to run
    #[arg(short, long, value_enum, default_value = "all")]
    stage: CliStage,

    /// JSON configuration file
    ///
    /// Fields not present keep their defaults; CLI flags override the file
    #[arg(short, long)]
    config: Option<String>,

    /// Null fraction at or above which a column is dropped (0.0 - 1.0)
    #[arg(long)]
    null_threshold: Option<f64>,

    /// Fraction of rows assigned to the test partition (0.0 - 1.0)
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Seed for the split shuffle and ID sampling
    #[arg(long)]
    seed: Option<u64>,

    /// IQR multiplier for outlier bounds
    #[arg(long)]
    iqr_factor: Option<f64>,

    /// Number of features kept by selection
    #[arg(long)]
    select_k: Option<usize>,

    /// Target column for correlation ranking
    #[arg(short, long)]
    target: Option<String>,

    /// Maximum train cardinality for one-hot encoding
    #[arg(long)]
    max_cardinality: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Build the pipeline configuration from the config file plus CLI overrides.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config file {path}"))?;
            serde_json::from_str::<PipelineConfig>(&raw)
                .with_context(|| format!("parsing config file {path}"))?
        }
        None => PipelineConfig::default(),
    };

    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.into();
    }
    if let Some(threshold) = args.null_threshold {
        config.null_threshold = threshold;
    }
    if let Some(fraction) = args.test_fraction {
        config.test_fraction = fraction;
    }
    if let Some(seed) = args.seed {
        config.random_seed = seed;
    }
    if let Some(factor) = args.iqr_factor {
        config.iqr_factor = factor;
    }
    if let Some(k) = args.select_k {
        config.select_k = k;
    }
    if let Some(target) = &args.target {
        config.target_column = target.clone();
    }
    if let Some(max) = args.max_cardinality {
        config.max_ohe_cardinality = max;
    }

    config.validate()?;
    Ok(config)
}

/// Copy the input CSV into the raw data directory.
fn stage_input(input: &str, config: &PipelineConfig) -> Result<()> {
    if !Path::new(input).exists() {
        return Err(anyhow!("Input file not found: {input}"));
    }

    let raw_path = config.paths().raw_books();
    if let Some(parent) = raw_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(input, &raw_path)
        .with_context(|| format!("staging {input} into {}", raw_path.display()))?;
    info!(input, staged = %raw_path.display(), "staged raw dataset");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet);

    let config = build_config(&args)?;

    if let Some(input) = &args.input {
        stage_input(input, &config)?;
    }

    match args.stage {
        CliStage::All => {
            let mut runner = PipelineRunner::new(config);
            let report = runner.run()?;

            for outcome in runner.outcomes() {
                info!(
                    stage = %outcome.stage,
                    status = outcome.status.as_str(),
                    duration_sec = outcome.duration_sec,
                    "stage result"
                );
            }
            info!(report = %report.display(), "pipeline finished");

            if runner.any_failed() {
                return Err(anyhow!("pipeline finished with failed stages"));
            }
        }
        CliStage::Clean => {
            let artifact = DataCleaner::new(config).run()?;
            info!(artifact = %artifact.display(), "cleaning finished");
        }
        CliStage::Transform => {
            let artifact = DataTransformer::new(config).run()?;
            info!(artifact = %artifact.display(), "transformation finished");
        }
        CliStage::Features => {
            let artifact = FeatureEngineer::new(config).run()?;
            info!(artifact = %artifact.display(), "feature engineering finished");
        }
        CliStage::Explore => {
            let artifact = ExploratoryAnalyzer::new(config).run()?;
            info!(artifact = %artifact.display(), "exploratory analysis finished");
        }
    }

    Ok(())
}
