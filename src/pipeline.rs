//! Pipeline orchestration.
//!
//! A run walks a fixed sequence of stages, each consuming the previous
//! stage's dataset:
//!
//! `Idle → Ingesting → CleaningMissing → EngineeringFeatures → Splitting → Done`
//!
//! Any stage error moves the run to `Failed` and aborts it. There are no
//! retries and no partial results; the caller gets either a
//! [`PipelineOutput`] or a [`FailureReport`] naming the failing stage.
//!
//! # Example
//!
//! ```no_run
//! use prices_predictor::config::PipelineConfig;
//! use prices_predictor::pipeline::{Pipeline, TracingObserver};
//!
//! let config = PipelineConfig::from_file("pipeline.json")?;
//! let params = config.params()?;
//! let output = Pipeline::new(&config.work_dir)
//!     .run(&config.archive_path, &params, &mut TracingObserver)?;
//! println!("{}", output.report.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Concurrent runs must not share a working directory.

pub mod observer;
pub mod report;
pub mod state;

pub use observer::{
    NoopObserver, ObserverEvent, PipelineObserver, RecordingObserver, TracingObserver,
};
pub use report::{FailureReport, RunReport, StageSummary};
pub use state::PipelineState;

use crate::dataset::{ColumnSelector, TabularDataset};
use crate::error::{PipelineError, Result};
use crate::features::{self, FeaturePolicy};
use crate::ingest::{DEFAULT_WORK_DIR, IngestedData, IngestorRegistry};
use crate::missing::{self, MissingValuePolicy};
use crate::split::{self, SplitPolicy, SplitResult};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Strategy descriptors and column choices for one run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineParams {
    pub missing_policy: MissingValuePolicy,
    pub feature_policy: FeaturePolicy,
    pub feature_columns: ColumnSelector,
    pub target_column: String,
    pub split_policy: SplitPolicy,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub split: SplitResult,
    /// Data file the dataset was loaded from
    pub data_file: PathBuf,
    pub report: RunReport,
}

/// Sequences ingestion, cleaning, feature engineering and splitting.
pub struct Pipeline {
    registry: IngestorRegistry,
    work_dir: PathBuf,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_DIR)
    }
}

impl Pipeline {
    /// Pipeline with the built-in archive formats
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self::with_registry(IngestorRegistry::with_defaults(), work_dir)
    }

    pub fn with_registry(registry: IngestorRegistry, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn registry(&self) -> &IngestorRegistry {
        &self.registry
    }

    /// Run every stage against `archive_path`.
    ///
    /// # Errors
    ///
    /// Returns a [`FailureReport`] for the first stage that fails.
    pub fn run(
        &self,
        archive_path: &Path,
        params: &PipelineParams,
        observer: &mut dyn PipelineObserver,
    ) -> std::result::Result<PipelineOutput, FailureReport> {
        let mut tracker = RunTracker::new(observer);

        let ingested = tracker.run_stage(
            || self.ingest(archive_path),
            |data: &IngestedData| (data.dataset.height(), data.dataset.width()),
        )?;
        let IngestedData { dataset, file_path } = ingested;

        let cleaned = tracker.run_stage(
            || missing::handle(&dataset, &params.missing_policy),
            |df: &TabularDataset| (df.height(), df.width()),
        )?;
        drop(dataset);

        let engineered = tracker.run_stage(
            || features::apply(&cleaned, &params.feature_policy, &params.feature_columns),
            |df: &TabularDataset| (df.height(), df.width()),
        )?;
        drop(cleaned);

        let split = tracker.run_stage(
            || split::split(&engineered, &params.target_column, &params.split_policy),
            |split: &SplitResult| (split.total_rows(), split.x_train.width() + 1),
        )?;

        let report = tracker.finish(file_path.clone());
        Ok(PipelineOutput {
            split,
            data_file: file_path,
            report,
        })
    }

    fn ingest(&self, archive_path: &Path) -> Result<IngestedData> {
        let ingestor = self.registry.ingestor_for(archive_path)?;
        tracing::debug!(
            "Ingesting {} with the {} ingestor into {}",
            archive_path.display(),
            ingestor.name(),
            self.work_dir.display()
        );
        ingestor.ingest(archive_path, &self.work_dir)
    }
}

/// Run with the default work directory and tracing-backed reporting.
///
/// # Errors
///
/// See [`Pipeline::run`].
pub fn run_pipeline(
    archive_path: &Path,
    params: &PipelineParams,
) -> std::result::Result<PipelineOutput, FailureReport> {
    Pipeline::default().run(archive_path, params, &mut TracingObserver)
}

/// Bookkeeping for one run: current state, visited states, stage timings.
struct RunTracker<'a> {
    state: PipelineState,
    visited: Vec<PipelineState>,
    stages: Vec<StageSummary>,
    started: Instant,
    started_at: chrono::DateTime<Utc>,
    observer: &'a mut dyn PipelineObserver,
}

impl<'a> RunTracker<'a> {
    fn new(observer: &'a mut dyn PipelineObserver) -> Self {
        Self {
            state: PipelineState::Idle,
            visited: vec![PipelineState::Idle],
            stages: Vec::new(),
            started: Instant::now(),
            started_at: Utc::now(),
            observer,
        }
    }

    fn enter(&mut self, to: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(to),
            "illegal transition {} -> {to}",
            self.state
        );
        self.observer.on_transition(self.state, to);
        self.state = to;
        self.visited.push(to);
    }

    /// Advance to the next stage and execute it.
    fn run_stage<T>(
        &mut self,
        op: impl FnOnce() -> Result<T>,
        shape: impl FnOnce(&T) -> (usize, usize),
    ) -> std::result::Result<T, FailureReport> {
        let Some(stage) = self.state.next_stage() else {
            return Err(self.fail(PipelineError::InvalidParameter(format!(
                "no stage follows {}",
                self.state
            ))));
        };
        self.enter(stage);

        let stage_started = Instant::now();
        match op() {
            Ok(value) => {
                let (rows, columns) = shape(&value);
                let summary = StageSummary {
                    stage,
                    rows,
                    columns,
                    duration: stage_started.elapsed(),
                };
                self.observer.on_stage_complete(&summary);
                self.stages.push(summary);
                Ok(value)
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    fn fail(&mut self, error: PipelineError) -> FailureReport {
        let stage = self.state;
        self.observer.on_failure(stage, &error);
        self.enter(PipelineState::Failed);
        FailureReport {
            stage,
            error,
            visited: std::mem::take(&mut self.visited),
            elapsed: self.started.elapsed(),
        }
    }

    fn finish(mut self, data_file: PathBuf) -> RunReport {
        self.enter(PipelineState::Done);
        RunReport {
            started_at: self.started_at,
            stages: self.stages,
            duration: self.started.elapsed(),
            data_file,
        }
    }
}
