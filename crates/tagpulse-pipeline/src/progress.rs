//! Progress reporting for long-running stages.

use crate::types::RunState;

/// A checkpoint inside a run, emitted to a [`ProgressSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    StateChanged { from: RunState, to: RunState },
    StageStarted { stage: RunState, total: usize },
    /// One model batch finished.
    BatchProcessed {
        stage: RunState,
        batch: usize,
        batches: usize,
    },
    /// Emitted every 10 records and after the last one.
    RecordsProcessed {
        stage: RunState,
        done: usize,
        total: usize,
    },
    StageFinished { stage: RunState, total: usize },
}

/// Receives progress events. Implementations must be cheap; they are called
/// inline from the stages.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::StateChanged { from, to } => {
                tracing::info!(from = %from, to = %to, "run state changed");
            }
            ProgressEvent::StageStarted { stage, total } => {
                tracing::info!(stage = %stage, total, "stage started");
            }
            ProgressEvent::BatchProcessed {
                stage,
                batch,
                batches,
            } => {
                tracing::debug!(stage = %stage, batch, batches, "batch processed");
            }
            ProgressEvent::RecordsProcessed { stage, done, total } => {
                tracing::debug!(stage = %stage, done, total, "records processed");
            }
            ProgressEvent::StageFinished { stage, total } => {
                tracing::info!(stage = %stage, total, "stage finished");
            }
        }
    }
}
