//! Concrete background job implementations.

mod server_count_sync;

pub use server_count_sync::{CycleSummary, ServerCountSyncJob};
