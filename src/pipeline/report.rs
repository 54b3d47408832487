//! Run and failure reports

use super::state::PipelineState;
use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Shape of the dataset after one stage completed
#[derive(Debug, Clone, PartialEq)]
pub struct StageSummary {
    pub stage: PipelineState,
    pub rows: usize,
    pub columns: usize,
    pub duration: Duration,
}

/// Report generated after a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    /// Completed stages in execution order
    pub stages: Vec<StageSummary>,
    pub duration: Duration,
    /// Data file selected from the archive
    pub data_file: PathBuf,
}

impl RunReport {
    pub fn stage(&self, stage: PipelineState) -> Option<&StageSummary> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Create a summary message
    pub fn summary(&self) -> String {
        let shape = |stage| {
            self.stage(stage)
                .map_or_else(|| "-".to_owned(), |s| format!("{}x{}", s.rows, s.columns))
        };
        format!(
            "Pipeline completed: loaded {} from {}, cleaned {}, engineered {}, {} stages, {:.2}s",
            shape(PipelineState::Ingesting),
            self.data_file.display(),
            shape(PipelineState::CleaningMissing),
            shape(PipelineState::EngineeringFeatures),
            self.stages.len(),
            self.duration.as_secs_f64()
        )
    }
}

/// Why and where a run stopped
#[derive(Debug)]
pub struct FailureReport {
    /// Stage that was executing when the failure occurred
    pub stage: PipelineState,
    pub error: PipelineError,
    /// States entered before the failure, ending with `Failed`
    pub visited: Vec<PipelineState>,
    pub elapsed: Duration,
}

impl FailureReport {
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipeline failed during {}: {}", self.stage, self.error)
    }
}

impl std::error::Error for FailureReport {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_mentions_shapes() {
        let report = RunReport {
            started_at: Utc::now(),
            stages: vec![
                StageSummary {
                    stage: PipelineState::Ingesting,
                    rows: 100,
                    columns: 3,
                    duration: Duration::from_millis(5),
                },
                StageSummary {
                    stage: PipelineState::CleaningMissing,
                    rows: 98,
                    columns: 3,
                    duration: Duration::from_millis(1),
                },
            ],
            duration: Duration::from_millis(6),
            data_file: PathBuf::from("artifacts/dataset/houses.csv"),
        };
        let summary = report.summary();
        assert!(summary.contains("loaded 100x3"));
        assert!(summary.contains("cleaned 98x3"));
        assert!(summary.contains("engineered -"));
    }

    #[test]
    fn test_failure_display() {
        let failure = FailureReport {
            stage: PipelineState::Splitting,
            error: PipelineError::ColumnNotFound("SalePrice".to_owned()),
            visited: vec![PipelineState::Idle, PipelineState::Failed],
            elapsed: Duration::ZERO,
        };
        assert_eq!(failure.kind(), "ColumnNotFound");
        assert!(failure.to_string().starts_with("pipeline failed during Splitting"));
    }
}
