//! Scripted in-memory platform client for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{PlatformClient, PlatformError, PlatformUser, RichMessage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Rich {
        channel_id: String,
        message: RichMessage,
    },
    Plain {
        channel_id: String,
        content: String,
    },
}

/// A [`PlatformClient`] whose responses are scripted per test. Records
/// every message send so assertions can inspect exactly what went out.
#[derive(Default)]
pub struct ScriptedPlatformClient {
    guild_counts: Mutex<HashMap<String, u64>>,
    users: Mutex<HashMap<String, PlatformUser>>,
    failing_guild_lookups: Mutex<Vec<String>>,
    fail_user_lookups: AtomicBool,
    fail_rich_with_links: AtomicBool,
    fail_all_rich: AtomicBool,
    fail_plain: AtomicBool,
    send_delay: Mutex<Duration>,
    guild_count_calls: AtomicUsize,
    sent: Mutex<Vec<SentMessage>>,
}

impl ScriptedPlatformClient {
    pub fn set_guild_count(&self, app_id: &str, count: u64) {
        self.guild_counts
            .lock()
            .unwrap()
            .insert(app_id.to_string(), count);
    }

    /// Make guild-count lookups for this id fail.
    pub fn fail_guild_count(&self, app_id: &str) {
        self.failing_guild_lookups
            .lock()
            .unwrap()
            .push(app_id.to_string());
    }

    pub fn set_user(&self, user: PlatformUser) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn fail_user_lookups(&self, fail: bool) {
        self.fail_user_lookups.store(fail, Ordering::SeqCst);
    }

    /// Fail rich sends that carry link buttons, letting the link-free
    /// variant through. Simulates embed-with-components rejection.
    pub fn fail_rich_with_links(&self, fail: bool) {
        self.fail_rich_with_links.store(fail, Ordering::SeqCst);
    }

    pub fn fail_all_rich(&self, fail: bool) {
        self.fail_all_rich.store(fail, Ordering::SeqCst);
    }

    pub fn fail_plain(&self, fail: bool) {
        self.fail_plain.store(fail, Ordering::SeqCst);
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = delay;
    }

    pub fn guild_count_calls(&self) -> usize {
        self.guild_count_calls.load(Ordering::SeqCst)
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear_sent_messages(&self) {
        self.sent.lock().unwrap().clear();
    }

    async fn apply_send_delay(&self) {
        let delay = *self.send_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PlatformClient for ScriptedPlatformClient {
    async fn guild_count(&self, app_id: &str) -> Result<u64, PlatformError> {
        self.guild_count_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_guild_lookups
            .lock()
            .unwrap()
            .iter()
            .any(|id| id == app_id)
        {
            return Err(PlatformError::Scripted(format!(
                "scripted guild count failure for {app_id}"
            )));
        }
        self.guild_counts
            .lock()
            .unwrap()
            .get(app_id)
            .copied()
            .ok_or_else(|| PlatformError::Scripted(format!("no scripted count for {app_id}")))
    }

    async fn fetch_user(&self, user_id: &str) -> Result<PlatformUser, PlatformError> {
        if self.fail_user_lookups.load(Ordering::SeqCst) {
            return Err(PlatformError::Scripted(
                "scripted user lookup failure".to_string(),
            ));
        }
        self.users
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| PlatformError::Scripted(format!("no scripted user {user_id}")))
    }

    async fn send_rich_message(
        &self,
        channel_id: &str,
        message: &RichMessage,
    ) -> Result<(), PlatformError> {
        self.apply_send_delay().await;
        if self.fail_all_rich.load(Ordering::SeqCst) {
            return Err(PlatformError::Scripted(
                "scripted rich send failure".to_string(),
            ));
        }
        if self.fail_rich_with_links.load(Ordering::SeqCst) && !message.links.is_empty() {
            return Err(PlatformError::Scripted(
                "scripted rejection of link components".to_string(),
            ));
        }
        self.sent.lock().unwrap().push(SentMessage::Rich {
            channel_id: channel_id.to_string(),
            message: message.clone(),
        });
        Ok(())
    }

    async fn send_plain_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<(), PlatformError> {
        self.apply_send_delay().await;
        if self.fail_plain.load(Ordering::SeqCst) {
            return Err(PlatformError::Scripted(
                "scripted plain send failure".to_string(),
            ));
        }
        self.sent.lock().unwrap().push(SentMessage::Plain {
            channel_id: channel_id.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }
}
