//! End-to-end tests for the reconciliation loop
//!
//! Drives the real scheduler and sync job against an isolated SQLite
//! store and a scripted platform client.

mod common;

use directory_sync_server::background_jobs::jobs::ServerCountSyncJob;
use directory_sync_server::background_jobs::JobScheduler;
use directory_sync_server::listing_store::{Listing, ListingStatus, ListingStore, SqliteListingStore};
use directory_sync_server::platform::testing::ScriptedPlatformClient;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn seeded_store(listings: &[(&str, ListingStatus, u64)]) -> (Arc<SqliteListingStore>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteListingStore::new(&temp_dir.path().join("directory.db")).unwrap());
    for (id, status, server_count) in listings {
        let mut listing = Listing::new_submission(id, &format!("Bot {id}"), "300");
        listing.status = *status;
        listing.server_count = *server_count;
        store.insert(&listing).unwrap();
    }
    (store, temp_dir)
}

#[tokio::test]
async fn test_startup_cycle_refreshes_approved_listings() {
    let (store, _tmp) = seeded_store(&[
        ("1", ListingStatus::Approved, 10),
        ("2", ListingStatus::Approved, 5),
        ("3", ListingStatus::Pending, 0),
    ]);
    let platform = Arc::new(ScriptedPlatformClient::default());
    platform.set_guild_count("1", 15);
    platform.set_guild_count("2", 5);
    platform.set_guild_count("3", 99);

    let token = CancellationToken::new();
    let mut scheduler = JobScheduler::new(token.clone(), Duration::ZERO);
    scheduler.register_job(Arc::new(ServerCountSyncJob::new(
        store.clone(),
        platform.clone(),
        Duration::from_secs(3600),
        true,
    )));
    let handle = tokio::spawn(scheduler.run());

    tokio::time::sleep(Duration::from_millis(200)).await;
    token.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;

    // Changed count written, unchanged left alone, pending never looked up.
    assert_eq!(store.get("1").unwrap().unwrap().server_count, 15);
    assert!(store.get("1").unwrap().unwrap().last_server_count_update.is_some());
    assert_eq!(store.get("2").unwrap().unwrap().server_count, 5);
    assert!(store.get("2").unwrap().unwrap().last_server_count_update.is_none());
    assert_eq!(store.get("3").unwrap().unwrap().server_count, 0);
    assert_eq!(platform.guild_count_calls(), 2);
}

#[tokio::test]
async fn test_failing_listing_does_not_block_the_rest() {
    let (store, _tmp) = seeded_store(&[
        ("1", ListingStatus::Approved, 1),
        ("2", ListingStatus::Approved, 2),
        ("3", ListingStatus::Approved, 3),
    ]);
    let platform = Arc::new(ScriptedPlatformClient::default());
    platform.fail_guild_count("2");
    platform.set_guild_count("1", 11);
    platform.set_guild_count("3", 33);

    let token = CancellationToken::new();
    let mut scheduler = JobScheduler::new(token.clone(), Duration::ZERO);
    scheduler.register_job(Arc::new(ServerCountSyncJob::new(
        store.clone(),
        platform.clone(),
        Duration::from_secs(3600),
        true,
    )));
    let handle = tokio::spawn(scheduler.run());

    tokio::time::sleep(Duration::from_millis(200)).await;
    token.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;

    assert_eq!(store.get("1").unwrap().unwrap().server_count, 11);
    assert_eq!(store.get("2").unwrap().unwrap().server_count, 2);
    assert_eq!(store.get("3").unwrap().unwrap().server_count, 33);
}

#[tokio::test]
async fn test_listing_leaving_approved_is_not_reconciled_next_cycle() {
    let (store, _tmp) = seeded_store(&[("1", ListingStatus::Approved, 10)]);
    let platform = Arc::new(ScriptedPlatformClient::default());
    platform.set_guild_count("1", 10);

    let job = ServerCountSyncJob::new(
        store.clone(),
        platform.clone(),
        Duration::from_secs(3600),
        false,
    );

    job.run_cycle().await.unwrap();
    assert_eq!(platform.guild_count_calls(), 1);

    // The approved set is re-queried at cycle start, not cached.
    store
        .set_status("1", ListingStatus::Rejected, Some("spam"))
        .unwrap();
    let summary = job.run_cycle().await.unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(platform.guild_count_calls(), 1);
}
