//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own database and a
//! scripted platform client.

use super::constants::*;
use directory_sync_server::commands::CommandDispatcher;
use directory_sync_server::listing_store::{Listing, ListingStatus, ListingStore, SqliteListingStore};
use directory_sync_server::notifications::ChannelNotifier;
use directory_sync_server::platform::testing::ScriptedPlatformClient;
use directory_sync_server::server::server::make_app;
use directory_sync_server::server::state::ServerState;
use directory_sync_server::server::{RequestsLoggingLevel, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated database and scripted platform
///
/// When dropped, the server gracefully shuts down and temp resources are
/// cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Listing store for direct database access in tests
    pub listing_store: Arc<SqliteListingStore>,

    /// Scripted platform client for stubbing lookups and inspecting sends
    pub platform: Arc<ScriptedPlatformClient>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with the default
    /// acknowledgement window.
    pub async fn spawn() -> Self {
        Self::spawn_with_ack_after(Duration::from_millis(500)).await
    }

    /// Spawns a test server whose command dispatcher acknowledges after
    /// the given window. Tests of the deferred-reply path shrink it.
    pub async fn spawn_with_ack_after(ack_after: Duration) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_db_dir.path().join("directory.db");
        let listing_store =
            Arc::new(SqliteListingStore::new(&db_path).expect("Failed to open listing store"));

        let platform = Arc::new(ScriptedPlatformClient::default());
        // Most tests don't script actor lookups; the renderer falls back
        // to a mention.
        platform.fail_user_lookups(true);

        let notifier = Arc::new(ChannelNotifier::new(
            platform.clone(),
            listing_store.clone(),
            LOG_CHANNEL_ID,
            STOREFRONT_BASE_URL,
        ));

        let dispatcher = Arc::new(CommandDispatcher::new(
            listing_store.clone(),
            notifier.clone(),
            ack_after,
        ));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state = ServerState {
            config: ServerConfig {
                requests_logging_level: RequestsLoggingLevel::None,
                port,
                metrics_port: 0,
            },
            start_time: Instant::now(),
            listing_store: listing_store.clone(),
            platform: platform.clone(),
            notifier,
            dispatcher,
            hash: "test".to_string(),
        };

        let app = make_app(state);

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            listing_store,
            platform,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Insert a listing directly into the store
    pub fn seed_listing(&self, id: &str, name: &str, status: ListingStatus) -> Listing {
        let mut listing = Listing::new_submission(id, name, "300");
        listing.status = status;
        self.listing_store
            .insert(&listing)
            .expect("Failed to seed listing");
        listing
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        // TempDir will be cleaned up automatically
    }
}
