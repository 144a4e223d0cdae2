//! Book Dataset ETL Pipeline
//!
//! A batch ETL pipeline for a scraped book dataset, built with Rust and
//! Polars.
//!
//! # Overview
//!
//! The pipeline runs four sequential stages, each reading the previous
//! stage's CSV artifact and writing its own outputs plus audit reports:
//!
//! - **Cleaning**: drops high-null columns, imputes the rest, removes
//!   duplicate records
//! - **Transformation**: classifies column types, assigns synthetic IDs,
//!   normalizes text, parses price strings
//! - **Feature Engineering**: seeded train/test split, IQR outlier
//!   filtering, text features, min-max scaling, one-hot encoding, derived
//!   price features, correlation-based selection (everything fit on train)
//! - **Exploration**: descriptive profiles and Pearson correlations
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bookdata_pipeline::{PipelineConfig, PipelineRunner};
//!
//! let config = PipelineConfig::builder()
//!     .data_dir("data")
//!     .test_fraction(0.3)
//!     .random_seed(42)
//!     .build()?;
//!
//! let mut runner = PipelineRunner::new(config);
//! let report = runner.run()?;
//! println!("Execution report: {}", report.display());
//! ```
//!
//! Each stage is also usable on its own through [`cleaner::DataCleaner`],
//! [`transformer::DataTransformer`], [`features::FeatureEngineer`], and
//! [`explore::ExploratoryAnalyzer`].

pub mod cleaner;
pub mod config;
pub mod error;
pub mod explore;
pub mod features;
pub mod pipeline;
pub mod reporting;
pub mod transformer;
pub mod types;
pub mod utils;

pub use cleaner::DataCleaner;
pub use config::{ArtifactPaths, ImputationStrategy, PipelineConfig};
pub use error::{EtlError, Result};
pub use explore::ExploratoryAnalyzer;
pub use features::FeatureEngineer;
pub use pipeline::PipelineRunner;
pub use transformer::DataTransformer;
pub use types::{ColumnKind, StageOutcome, StageStatus};
