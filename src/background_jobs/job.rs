use async_trait::async_trait;
use std::time::Duration;

/// Errors that can occur during job execution.
#[derive(Debug)]
pub enum JobError {
    ExecutionFailed(String),
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::ExecutionFailed(msg) => write!(f, "Execution failed: {}", msg),
        }
    }
}

impl std::error::Error for JobError {}

/// Trait for recurring background jobs.
///
/// Each job runs on its own fixed interval. The scheduler guarantees at
/// most one execution of a given job at a time; a tick that fires while
/// the previous run is still going is skipped, not queued.
#[async_trait]
pub trait BackgroundJob: Send + Sync {
    /// Unique identifier for this job.
    fn id(&self) -> &'static str;

    /// Human-readable name for this job.
    fn name(&self) -> &'static str;

    /// Description of what this job does.
    fn description(&self) -> &'static str;

    /// Fixed period between run starts.
    fn interval(&self) -> Duration;

    /// Whether the job should also run once when the scheduler starts,
    /// before the first interval elapses.
    fn run_at_startup(&self) -> bool {
        false
    }

    async fn execute(&self) -> Result<(), JobError>;
}
