use serde::Serialize;
use thiserror::Error;

/// Errors that end a job attempt.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("Job attempt panicked: {0}")]
    Panicked(String),

    #[error("Job queue is closed")]
    QueueClosed,
}

/// What one attempt at the messages job did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum JobOutcome {
    /// The app has not signalled readiness yet.
    NotReady,
    /// No run is pending.
    NothingScheduled,
    /// The pending run was processed to the end.
    Completed { batches: usize, processed: usize },
}
