//! Shared constants for end-to-end tests

pub const REQUEST_TIMEOUT_SECS: u64 = 5;
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Channel that receives moderation notifications in tests
pub const LOG_CHANNEL_ID: &str = "555";

/// Invoker ids used by command tests
pub const ADMIN_ID: &str = "100";
pub const MEMBER_ID: &str = "200";

pub const STOREFRONT_BASE_URL: &str = "https://botdir.example";
