//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all directory-sync-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// GET /
    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    /// POST /v1/notify with an arbitrary JSON body
    pub async fn notify(&self, body: serde_json::Value) -> Response {
        self.client
            .post(format!("{}/v1/notify", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Notify request failed")
    }

    /// POST /v1/command
    pub async fn command(&self, text: &str, invoker_id: &str, is_admin: bool) -> Response {
        self.client
            .post(format!("{}/v1/command", self.base_url))
            .json(&json!({
                "text": text,
                "invoker_id": invoker_id,
                "is_admin": is_admin,
                "channel_id": LOG_CHANNEL_ID,
            }))
            .send()
            .await
            .expect("Command request failed")
    }

    /// POST /v1/command as an administrator
    pub async fn admin_command(&self, text: &str) -> Response {
        self.command(text, ADMIN_ID, true).await
    }

    /// POST /v1/command as a regular member
    pub async fn member_command(&self, text: &str) -> Response {
        self.command(text, MEMBER_ID, false).await
    }
}
