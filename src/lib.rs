//! Directory Sync Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod background_jobs;
pub mod commands;
pub mod config;
pub mod listing_store;
pub mod notifications;
pub mod platform;
pub mod server;

// Re-export commonly used types for convenience
pub use listing_store::{Listing, ListingStatus, ListingStore, SqliteListingStore};
pub use platform::{PlatformClient, PlatformError};
pub use server::{run_server, RequestsLoggingLevel};
