//! Listing repository.
//!
//! The directory's "Listings" and "Votes" collections live in SQLite; this
//! module exposes the thin repository interface the reconciliation loop and
//! the command dispatcher share. The storefront writes through the same
//! tables, so nothing here assumes exclusive ownership of a listing.

mod models;
mod sqlite_listing_store;

pub use models::{DirectoryStats, Listing, ListingStatus};
pub use sqlite_listing_store::SqliteListingStore;

use anyhow::Result;
use chrono::{DateTime, Utc};

#[cfg_attr(feature = "mock", mockall::automock)]
pub trait ListingStore: Send + Sync {
    /// Snapshot of all listings currently eligible for reconciliation.
    fn list_approved(&self) -> Result<Vec<Listing>>;

    fn get(&self, id: &str) -> Result<Option<Listing>>;

    fn insert(&self, listing: &Listing) -> Result<()>;

    /// Persist a refreshed server count and stamp the update time.
    /// Fails if the listing no longer exists.
    fn update_server_count(&self, id: &str, count: u64, timestamp: DateTime<Utc>) -> Result<()>;

    /// Move a listing to a new moderation status. The reason is stored for
    /// rejections and cleared otherwise.
    fn set_status(&self, id: &str, status: ListingStatus, reason: Option<&str>) -> Result<()>;

    /// Record a vote, deduplicated per (listing, voter). Returns the
    /// listing's vote count after the write.
    fn record_vote(&self, listing_id: &str, voter_id: &str) -> Result<u64>;

    fn stats(&self) -> Result<DirectoryStats>;
}
