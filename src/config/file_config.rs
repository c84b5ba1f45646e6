use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,

    // Feature configs
    pub platform: Option<PlatformConfig>,
    pub reconciliation: Option<ReconciliationConfig>,
    pub notifications: Option<NotificationsConfig>,
    pub commands: Option<CommandsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PlatformConfig {
    pub base_url: Option<String>,
    pub cdn_base_url: Option<String>,
    pub bot_token: Option<String>,
    pub log_channel_id: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub min_call_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub interval_secs: Option<u64>,
    pub startup_jitter_secs: Option<u64>,
    pub run_at_startup: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct NotificationsConfig {
    pub storefront_base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CommandsConfig {
    pub ack_after_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
