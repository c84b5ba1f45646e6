//! Background job scheduling and execution

mod job;
pub mod jobs;
mod scheduler;

pub use job::{BackgroundJob, JobError};
pub use scheduler::JobScheduler;
