mod file_config;

pub use file_config::{
    CommandsConfig, FileConfig, NotificationsConfig, PlatformConfig, ReconciliationConfig,
};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub platform_base_url: Option<String>,
    pub platform_cdn_base_url: Option<String>,
    pub bot_token: Option<String>,
    pub log_channel_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,

    // Feature configs (with defaults)
    pub platform: PlatformSettings,
    pub reconciliation: ReconciliationSettings,
    pub notifications: NotificationsSettings,
    pub commands: CommandsSettings,
}

#[derive(Debug, Clone)]
pub struct PlatformSettings {
    pub base_url: String,
    pub cdn_base_url: String,
    pub bot_token: String,
    pub log_channel_id: String,
    pub request_timeout: Duration,
    pub min_call_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ReconciliationSettings {
    pub interval: Duration,
    pub startup_jitter: Duration,
    pub run_at_startup: bool,
}

#[derive(Debug, Clone)]
pub struct NotificationsSettings {
    pub storefront_base_url: String,
}

#[derive(Debug, Clone)]
pub struct CommandsSettings {
    pub ack_after: Duration,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        // Validate db_dir exists
        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let platform_file = file.platform.unwrap_or_default();
        let base_url = platform_file
            .base_url
            .or_else(|| cli.platform_base_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "platform base_url must be specified via --platform-base-url or in config file"
                )
            })?;
        let cdn_base_url = platform_file
            .cdn_base_url
            .or_else(|| cli.platform_cdn_base_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "platform cdn_base_url must be specified via --platform-cdn-base-url or in config file"
                )
            })?;
        let bot_token = platform_file
            .bot_token
            .or_else(|| cli.bot_token.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("bot_token must be specified via --bot-token or in config file")
            })?;
        let log_channel_id = platform_file
            .log_channel_id
            .or_else(|| cli.log_channel_id.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "log_channel_id must be specified via --log-channel-id or in config file"
                )
            })?;
        let platform = PlatformSettings {
            base_url,
            cdn_base_url,
            bot_token,
            log_channel_id,
            request_timeout: Duration::from_secs(
                platform_file.request_timeout_secs.unwrap_or(5),
            ),
            min_call_interval: Duration::from_millis(
                platform_file.min_call_interval_ms.unwrap_or(1100),
            ),
        };

        let reconciliation_file = file.reconciliation.unwrap_or_default();
        let reconciliation = ReconciliationSettings {
            interval: Duration::from_secs(reconciliation_file.interval_secs.unwrap_or(3600)),
            startup_jitter: Duration::from_secs(
                reconciliation_file.startup_jitter_secs.unwrap_or(0),
            ),
            run_at_startup: reconciliation_file.run_at_startup.unwrap_or(true),
        };

        let notifications_file = file.notifications.unwrap_or_default();
        let notifications = NotificationsSettings {
            storefront_base_url: notifications_file
                .storefront_base_url
                .unwrap_or_else(|| "https://localhost".to_string()),
        };

        let commands_file = file.commands.unwrap_or_default();
        let commands = CommandsSettings {
            ack_after: Duration::from_millis(commands_file.ack_after_ms.unwrap_or(2000)),
        };

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            platform,
            reconciliation,
            notifications,
            commands,
        })
    }

    pub fn directory_db_path(&self) -> PathBuf {
        self.db_dir.join("directory.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
