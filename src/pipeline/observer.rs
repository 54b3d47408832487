//! Progress reporting for pipeline runs.
//!
//! The orchestrator never logs directly; it reports to whichever observer
//! the caller passes in.

use super::report::StageSummary;
use super::state::PipelineState;
use crate::error::PipelineError;

/// Receives state changes of one run. All methods default to no-ops.
pub trait PipelineObserver {
    fn on_transition(&mut self, _from: PipelineState, _to: PipelineState) {}

    fn on_stage_complete(&mut self, _summary: &StageSummary) {}

    fn on_failure(&mut self, _stage: PipelineState, _error: &PipelineError) {}
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_transition(&mut self, from: PipelineState, to: PipelineState) {
        tracing::debug!("Pipeline state {from} -> {to}");
    }

    fn on_stage_complete(&mut self, summary: &StageSummary) {
        tracing::info!(
            "{} finished: {} rows, {} columns in {:.3}s",
            summary.stage,
            summary.rows,
            summary.columns,
            summary.duration.as_secs_f64()
        );
    }

    fn on_failure(&mut self, stage: PipelineState, error: &PipelineError) {
        tracing::error!("{stage} failed ({}): {error}", error.kind());
    }
}

/// Event captured by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    Transition {
        from: PipelineState,
        to: PipelineState,
    },
    StageComplete(StageSummary),
    Failure {
        stage: PipelineState,
        kind: &'static str,
        message: String,
    },
}

/// Keeps every event in memory, mostly for tests and the CLI report
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    pub events: Vec<ObserverEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target states of every recorded transition, in order
    pub fn transitions(&self) -> Vec<PipelineState> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ObserverEvent::Transition { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, ObserverEvent::Failure { .. }))
            .count()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_transition(&mut self, from: PipelineState, to: PipelineState) {
        self.events.push(ObserverEvent::Transition { from, to });
    }

    fn on_stage_complete(&mut self, summary: &StageSummary) {
        self.events.push(ObserverEvent::StageComplete(summary.clone()));
    }

    fn on_failure(&mut self, stage: PipelineState, error: &PipelineError) {
        self.events.push(ObserverEvent::Failure {
            stage,
            kind: error.kind(),
            message: error.to_string(),
        });
    }
}
