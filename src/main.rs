use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use std::{fmt::Debug, path::PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use directory_sync_server::background_jobs::jobs::ServerCountSyncJob;
use directory_sync_server::background_jobs::JobScheduler;
use directory_sync_server::commands::CommandDispatcher;
use directory_sync_server::config::{AppConfig, CliConfig, FileConfig};
use directory_sync_server::listing_store::{ListingStore, SqliteListingStore};
use directory_sync_server::notifications::ChannelNotifier;
use directory_sync_server::platform::{CallPacer, HttpPlatformClient, PlatformClient};
use directory_sync_server::server::state::ServerState;
use directory_sync_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the SQLite database files.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to a TOML config file. Values in it override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3010)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Base URL of the platform REST API.
    #[clap(long)]
    pub platform_base_url: Option<String>,

    /// Base URL of the platform CDN (avatars).
    #[clap(long)]
    pub platform_cdn_base_url: Option<String>,

    /// Bot token for authenticating platform calls. Falls back to the
    /// BOT_TOKEN environment variable.
    #[clap(long)]
    pub bot_token: Option<String>,

    /// Channel that receives moderation notifications.
    #[clap(long)]
    pub log_channel_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        port: cli_args.port,
        metrics_port: cli_args.metrics_port,
        logging_level: cli_args.logging_level,
        platform_base_url: cli_args.platform_base_url,
        platform_cdn_base_url: cli_args.platform_cdn_base_url,
        bot_token: cli_args
            .bot_token
            .or_else(|| std::env::var("BOT_TOKEN").ok()),
        log_channel_id: cli_args.log_channel_id,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!(
        "Opening SQLite directory database at {:?}...",
        config.directory_db_path()
    );
    let listing_store: Arc<dyn ListingStore> =
        Arc::new(SqliteListingStore::new(&config.directory_db_path())?);

    let pacer = Arc::new(CallPacer::new(config.platform.min_call_interval));
    let platform: Arc<dyn PlatformClient> = Arc::new(HttpPlatformClient::new(
        &config.platform.base_url,
        &config.platform.cdn_base_url,
        &config.platform.bot_token,
        config.platform.request_timeout,
        pacer,
    )?);

    let notifier = Arc::new(ChannelNotifier::new(
        platform.clone(),
        listing_store.clone(),
        &config.platform.log_channel_id,
        &config.notifications.storefront_base_url,
    ));

    let dispatcher = Arc::new(CommandDispatcher::new(
        listing_store.clone(),
        notifier.clone(),
        config.commands.ack_after,
    ));

    let shutdown_token = CancellationToken::new();

    let mut scheduler = JobScheduler::new(
        shutdown_token.clone(),
        config.reconciliation.startup_jitter,
    );
    scheduler.register_job(Arc::new(ServerCountSyncJob::new(
        listing_store.clone(),
        platform.clone(),
        config.reconciliation.interval,
        config.reconciliation.run_at_startup,
    )));
    let scheduler_handle = tokio::spawn(scheduler.run());

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_token.cancel();
        }
    });

    let state = ServerState {
        config: ServerConfig {
            requests_logging_level: config.logging_level.clone(),
            port: config.port,
            metrics_port: config.metrics_port,
        },
        start_time: Instant::now(),
        listing_store,
        platform,
        notifier,
        dispatcher,
        hash: env!("GIT_HASH").to_string(),
    };

    info!("Ready to serve at port {}!", config.port);
    info!("Metrics available at port {}!", config.metrics_port);
    run_server(state, shutdown_token).await?;

    scheduler_handle.await?;
    Ok(())
}
