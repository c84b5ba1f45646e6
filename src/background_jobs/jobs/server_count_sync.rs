//! Server-count reconciliation job.
//!
//! One cycle snapshots the approved listings and refreshes each one's
//! membership count from the platform, sequentially through the shared
//! call pacer. Failures are per-listing; the cycle always runs to the
//! end of the snapshot.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::background_jobs::{BackgroundJob, JobError};
use crate::listing_store::ListingStore;
use crate::platform::PlatformClient;
use crate::server::metrics;

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub processed: u64,
    pub updated: u64,
    pub failed: u64,
}

pub struct ServerCountSyncJob {
    listing_store: Arc<dyn ListingStore>,
    platform: Arc<dyn PlatformClient>,
    interval: Duration,
    run_at_startup: bool,
}

impl ServerCountSyncJob {
    pub fn new(
        listing_store: Arc<dyn ListingStore>,
        platform: Arc<dyn PlatformClient>,
        interval: Duration,
        run_at_startup: bool,
    ) -> Self {
        Self {
            listing_store,
            platform,
            interval,
            run_at_startup,
        }
    }

    /// Run one full cycle over the current approved snapshot. Listings
    /// approved after the snapshot is taken are picked up next cycle.
    pub async fn run_cycle(&self) -> anyhow::Result<CycleSummary> {
        let listings = self.listing_store.list_approved()?;
        let mut summary = CycleSummary::default();

        for listing in listings {
            summary.processed += 1;

            let count = match self.platform.guild_count(&listing.id).await {
                Ok(count) => count,
                Err(e) => {
                    warn!("Guild count lookup for listing {} failed: {e}", listing.id);
                    summary.failed += 1;
                    continue;
                }
            };

            // An unchanged count is not rewritten, so the update
            // timestamp only moves when the value actually changed.
            if count == listing.server_count {
                continue;
            }

            match self
                .listing_store
                .update_server_count(&listing.id, count, Utc::now())
            {
                Ok(()) => {
                    info!(
                        "Listing {} server count {} -> {}",
                        listing.id, listing.server_count, count
                    );
                    summary.updated += 1;
                }
                Err(e) => {
                    warn!("Persisting count for listing {} failed: {e}", listing.id);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Reconciliation cycle done: processed={} updated={} failed={}",
            summary.processed, summary.updated, summary.failed
        );
        metrics::record_reconciliation_cycle(summary.processed, summary.updated, summary.failed);
        Ok(summary)
    }
}

#[async_trait]
impl BackgroundJob for ServerCountSyncJob {
    fn id(&self) -> &'static str {
        "server_count_sync"
    }

    fn name(&self) -> &'static str {
        "Server Count Sync"
    }

    fn description(&self) -> &'static str {
        "Refresh membership counts for approved listings from the platform"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn run_at_startup(&self) -> bool {
        self.run_at_startup
    }

    async fn execute(&self) -> Result<(), JobError> {
        self.run_cycle()
            .await
            .map(|_| ())
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))
    }
}
