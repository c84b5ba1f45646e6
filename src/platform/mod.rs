//! External platform client.
//!
//! Thin wrapper over the chat platform's REST API: guild-count lookup,
//! user lookup and channel message sends. All outbound calls go through a
//! shared [`CallPacer`] so the aggregate rate across the reconciliation
//! loop, the notifier and the command dispatcher stays under the
//! platform's ceiling. Calls are single-attempt; transient failures are
//! surfaced to the caller and retried at next-call or next-cycle
//! granularity, never synchronously.

mod http_client;
mod models;
mod pacer;
pub mod testing;

pub use http_client::HttpPlatformClient;
pub use models::{LinkButton, MessageField, PlatformUser, RichMessage};
pub use pacer::CallPacer;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("invalid identifier: {0:?}")]
    InvalidId(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {status} from {endpoint}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("malformed response from {endpoint}: {message}")]
    MalformedResponse {
        endpoint: &'static str,
        message: String,
    },

    #[error("{0}")]
    Scripted(String),
}

#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Current guild membership count for an application. An `Err` means
    /// the count could not be determined this call; callers skip and move
    /// on rather than aborting their batch.
    async fn guild_count(&self, app_id: &str) -> Result<u64, PlatformError>;

    /// Look up a user's display identity.
    async fn fetch_user(&self, user_id: &str) -> Result<PlatformUser, PlatformError>;

    /// Send a structured message to a channel.
    async fn send_rich_message(
        &self,
        channel_id: &str,
        message: &RichMessage,
    ) -> Result<(), PlatformError>;

    /// Send a plain text message to a channel.
    async fn send_plain_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<(), PlatformError>;
}
