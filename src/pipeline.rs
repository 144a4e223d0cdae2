//! Sequential pipeline orchestration.
//!
//! Runs cleaning, transformation, feature engineering, and exploration in
//! order. A failed stage marks every later stage as skipped, and the
//! consolidated execution report is written regardless of how far the
//! pipeline got.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use polars::prelude::*;
use tracing::{error, info};

use crate::cleaner::DataCleaner;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::explore::ExploratoryAnalyzer;
use crate::features::FeatureEngineer;
use crate::reporting;
use crate::transformer::DataTransformer;
use crate::types::{StageOutcome, StageStatus};

/// Runs the full ETL pipeline stage by stage.
pub struct PipelineRunner {
    config: PipelineConfig,
    outcomes: Vec<StageOutcome>,
}

impl PipelineRunner {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            outcomes: Vec::new(),
        }
    }

    /// Per-stage results of the last run.
    pub fn outcomes(&self) -> &[StageOutcome] {
        &self.outcomes
    }

    /// Whether any stage of the last run failed.
    pub fn any_failed(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.status == StageStatus::Failed)
    }

    /// Run every stage and write the consolidated execution report.
    /// Returns the report path.
    pub fn run(&mut self) -> Result<PathBuf> {
        self.outcomes.clear();

        let config = self.config.clone();
        self.run_stage("data_cleaning", move || DataCleaner::new(config).run());

        let config = self.config.clone();
        self.run_stage("data_transformation", move || {
            DataTransformer::new(config).run()
        });

        let config = self.config.clone();
        self.run_stage("feature_engineering", move || {
            FeatureEngineer::new(config).run()
        });

        let config = self.config.clone();
        self.run_stage("eda", move || ExploratoryAnalyzer::new(config).run());

        self.write_report()
    }

    /// Run one stage unless a previous stage failed, recording its outcome.
    fn run_stage<F>(&mut self, name: &str, stage: F)
    where
        F: FnOnce() -> Result<PathBuf>,
    {
        if self.any_failed() {
            info!(stage = name, "skipping stage after earlier failure");
            self.outcomes.push(StageOutcome::skipped(name));
            return;
        }

        info!(stage = name, "running stage");
        let start = Instant::now();
        let result = stage();
        let duration = (start.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;

        match result {
            Ok(artifact) => {
                info!(stage = name, duration_sec = duration, "stage finished");
                self.outcomes.push(StageOutcome::success(
                    name,
                    duration,
                    artifact.display().to_string(),
                ));
            }
            Err(e) => {
                error!(stage = name, error = %e, "stage failed");
                self.outcomes.push(StageOutcome::failed(
                    name,
                    duration,
                    format!("{}: {}", e.error_code(), e),
                ));
            }
        }
    }

    fn write_report(&self) -> Result<PathBuf> {
        let finished_at = Local::now().to_rfc3339();

        let mut report = DataFrame::new(vec![
            Column::new(
                "step".into(),
                self.outcomes
                    .iter()
                    .map(|o| o.stage.clone())
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                "status".into(),
                self.outcomes
                    .iter()
                    .map(|o| o.status.as_str().to_string())
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                "duration_sec".into(),
                self.outcomes
                    .iter()
                    .map(|o| o.duration_sec)
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                "artifact".into(),
                self.outcomes
                    .iter()
                    .map(|o| o.artifact.clone().unwrap_or_default())
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                "error".into(),
                self.outcomes
                    .iter()
                    .map(|o| o.error.clone().unwrap_or_default())
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                "finished_at".into(),
                self.outcomes
                    .iter()
                    .map(|_| finished_at.clone())
                    .collect::<Vec<_>>(),
            ),
        ])?;

        let path = self.config.paths().pipeline_execution_report();
        reporting::write_csv(&mut report, &path)?;
        Ok(path)
    }
}
