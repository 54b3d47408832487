//! Orchestrator state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// States of a single pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineState {
    /// Created, nothing executed yet
    Idle,
    /// Extracting the archive and loading the data file
    Ingesting,
    /// Applying the missing-value policy
    CleaningMissing,
    /// Applying the feature policy to the selected columns
    EngineeringFeatures,
    /// Partitioning rows and separating the target
    Splitting,
    /// Split produced
    Done,
    /// A stage failed; the run was aborted
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Ingesting => "Ingesting",
            Self::CleaningMissing => "CleaningMissing",
            Self::EngineeringFeatures => "EngineeringFeatures",
            Self::Splitting => "Splitting",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }

    /// Next state on success, `None` once terminal
    pub fn next_stage(&self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Ingesting),
            Self::Ingesting => Some(Self::CleaningMissing),
            Self::CleaningMissing => Some(Self::EngineeringFeatures),
            Self::EngineeringFeatures => Some(Self::Splitting),
            Self::Splitting => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Strictly linear forward steps, plus `Failed` from any non-terminal state
    pub fn can_transition_to(&self, target: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == Self::Failed || self.next_stage() == Some(target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
