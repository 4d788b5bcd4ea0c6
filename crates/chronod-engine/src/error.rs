use thiserror::Error;

/// Errors surfaced by the scheduler engine and its administrative façade.
///
/// Job execution failures are not part of this taxonomy: they are recorded
/// as a [`RunStatus::Failed`](chronod_store::RunStatus) on the definition
/// and never propagate out of a tick.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A field failed validation (non-positive interval, duplicate
    /// system name on create).
    #[error("Validation error: {0}")]
    Validation(String),

    /// No job definition with the given ID is visible.
    #[error("Job not found: {id}")]
    NotFound { id: String },

    /// The system name has no registered implementation.
    #[error("No job registered for system name: {system_name}")]
    UnknownJob { system_name: String },

    /// Two implementations were registered under the same system name.
    #[error("Duplicate job registration: {system_name}")]
    DuplicateJob { system_name: String },

    /// Force-trigger rejected because the job is currently executing.
    #[error("Job is already running: {id}")]
    AlreadyRunning { id: String },

    /// The schedule store failed; the dispatcher retries on its next tick,
    /// administrative callers see this directly.
    #[error("Store error: {0}")]
    Store(#[from] chronod_store::StoreError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
