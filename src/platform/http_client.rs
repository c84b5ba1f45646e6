use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use tracing::warn;

use crate::server::metrics;

use super::models::{ApplicationResponse, UserResponse};
use super::{CallPacer, PlatformClient, PlatformError, PlatformUser, RichMessage};

/// REST client for the chat platform. One instance is shared by the
/// reconciliation loop, the notifier and the command dispatcher, all
/// funnelled through the same [`CallPacer`].
pub struct HttpPlatformClient {
    client: reqwest::Client,
    base_url: String,
    cdn_base_url: String,
    bot_token: String,
    pacer: Arc<CallPacer>,
}

impl HttpPlatformClient {
    pub fn new(
        base_url: &str,
        cdn_base_url: &str,
        bot_token: &str,
        request_timeout: Duration,
        pacer: Arc<CallPacer>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cdn_base_url: cdn_base_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            pacer,
        })
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Ids are interpolated into URL paths; reject anything empty or
    /// unable to form a single path segment. No format beyond that is
    /// assumed.
    fn require_id(id: &str) -> Result<(), PlatformError> {
        if id.is_empty() || id.contains('/') || id.chars().any(|c| c.is_whitespace()) {
            return Err(PlatformError::InvalidId(id.to_string()));
        }
        Ok(())
    }

    fn check_status(
        endpoint: &'static str,
        status: StatusCode,
    ) -> Result<(), PlatformError> {
        metrics::record_platform_request(endpoint, status.as_u16());
        if status.is_success() {
            Ok(())
        } else {
            Err(PlatformError::Status {
                endpoint,
                status: status.as_u16(),
            })
        }
    }

    fn message_body(message: &RichMessage) -> serde_json::Value {
        let fields: Vec<_> = message
            .fields
            .iter()
            .map(|f| json!({ "name": f.name, "value": f.value }))
            .collect();
        let mut embed = json!({
            "title": message.title,
            "description": message.description,
            "color": message.color,
            "fields": fields,
        });
        if let Some(thumbnail_url) = &message.thumbnail_url {
            embed["thumbnail"] = json!({ "url": thumbnail_url });
        }
        let mut body = json!({ "embeds": [embed] });
        if !message.links.is_empty() {
            let buttons: Vec<_> = message
                .links
                .iter()
                .map(|link| json!({ "type": 2, "style": 5, "label": link.label, "url": link.url }))
                .collect();
            body["components"] = json!([{ "type": 1, "components": buttons }]);
        }
        body
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn guild_count(&self, app_id: &str) -> Result<u64, PlatformError> {
        Self::require_id(app_id)?;
        self.pacer.pace().await;
        let url = format!("{}/applications/{}", self.base_url, app_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .inspect_err(|e| warn!("Guild count request for {app_id} failed: {e}"))?;
        Self::check_status("applications", response.status())?;
        let application: ApplicationResponse = response.json().await?;
        application
            .approximate_guild_count
            .ok_or_else(|| PlatformError::MalformedResponse {
                endpoint: "applications",
                message: "missing approximate_guild_count".to_string(),
            })
    }

    async fn fetch_user(&self, user_id: &str) -> Result<PlatformUser, PlatformError> {
        Self::require_id(user_id)?;
        self.pacer.pace().await;
        let url = format!("{}/users/{}", self.base_url, user_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .inspect_err(|e| warn!("User lookup for {user_id} failed: {e}"))?;
        Self::check_status("users", response.status())?;
        let user: UserResponse = response.json().await?;
        Ok(user.into_platform_user(&self.cdn_base_url))
    }

    async fn send_rich_message(
        &self,
        channel_id: &str,
        message: &RichMessage,
    ) -> Result<(), PlatformError> {
        Self::require_id(channel_id)?;
        self.pacer.pace().await;
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&Self::message_body(message))
            .send()
            .await
            .inspect_err(|e| warn!("Rich message to {channel_id} failed: {e}"))?;
        Self::check_status("messages", response.status())
    }

    async fn send_plain_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<(), PlatformError> {
        Self::require_id(channel_id)?;
        self.pacer.pace().await;
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&json!({ "content": content }))
            .send()
            .await
            .inspect_err(|e| warn!("Plain message to {channel_id} failed: {e}"))?;
        Self::check_status("messages", response.status())
    }
}
