use super::models::{DirectoryStats, Listing, ListingStatus};
use super::ListingStore;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

const SCHEMA_VERSION: i64 = 1;

pub struct SqliteListingStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteListingStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open listings database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        if is_new_db {
            info!("Creating new listings database at {:?}", path);
            Self::create_schema(&conn)?;
        } else {
            let version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            if version != SCHEMA_VERSION {
                bail!(
                    "Listings database version {} is unsupported (expected {})",
                    version,
                    SCHEMA_VERSION
                );
            }
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE listings (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '[]',
                owner_id TEXT NOT NULL DEFAULT '',
                avatar_url TEXT,
                invite_url TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                rejection_reason TEXT,
                server_count INTEGER NOT NULL DEFAULT 0,
                last_server_count_update TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX idx_listings_status ON listings(status);
            CREATE TABLE votes (
                listing_id TEXT NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
                voter_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (listing_id, voter_id)
            );
            CREATE INDEX idx_votes_listing ON votes(listing_id);",
        )?;
        conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        Ok(())
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    fn row_to_listing(row: &rusqlite::Row) -> rusqlite::Result<Listing> {
        let status_str: String = row.get("status")?;
        let tags_json: String = row.get("tags")?;
        let created_at_str: String = row.get("created_at")?;
        let last_update_str: Option<String> = row.get("last_server_count_update")?;
        let server_count: i64 = row.get("server_count")?;

        Ok(Listing {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            owner_id: row.get("owner_id")?,
            avatar_url: row.get("avatar_url")?,
            invite_url: row.get("invite_url")?,
            status: ListingStatus::parse(&status_str).unwrap_or(ListingStatus::Pending),
            rejection_reason: row.get("rejection_reason")?,
            server_count: server_count.max(0) as u64,
            last_server_count_update: last_update_str.as_deref().and_then(Self::parse_datetime),
            created_at: Self::parse_datetime(&created_at_str).unwrap_or_else(Utc::now),
        })
    }
}

impl ListingStore for SqliteListingStore {
    fn list_approved(&self) -> Result<Vec<Listing>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT * FROM listings WHERE status = 'approved' ORDER BY created_at, id")?;
        let listings = stmt
            .query_map([], Self::row_to_listing)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to load approved listings")?;
        Ok(listings)
    }

    fn get(&self, id: &str) -> Result<Option<Listing>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM listings WHERE id = ?1",
            params![id],
            Self::row_to_listing,
        )
        .optional()
        .with_context(|| format!("Failed to load listing {}", id))
    }

    fn insert(&self, listing: &Listing) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO listings (
                id, name, description, tags, owner_id, avatar_url, invite_url,
                status, rejection_reason, server_count, last_server_count_update, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                listing.id,
                listing.name,
                listing.description,
                serde_json::to_string(&listing.tags)?,
                listing.owner_id,
                listing.avatar_url,
                listing.invite_url,
                listing.status.as_str(),
                listing.rejection_reason,
                listing.server_count as i64,
                listing
                    .last_server_count_update
                    .as_ref()
                    .map(Self::format_datetime),
                Self::format_datetime(&listing.created_at),
            ],
        )
        .with_context(|| format!("Failed to insert listing {}", listing.id))?;
        Ok(())
    }

    fn update_server_count(&self, id: &str, count: u64, timestamp: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE listings SET server_count = ?1, last_server_count_update = ?2 WHERE id = ?3",
            params![count as i64, Self::format_datetime(&timestamp), id],
        )?;
        if affected == 0 {
            bail!("Listing {} not found for server count update", id);
        }
        Ok(())
    }

    fn set_status(&self, id: &str, status: ListingStatus, reason: Option<&str>) -> Result<()> {
        let reason = match status {
            ListingStatus::Rejected => reason,
            _ => None,
        };
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE listings SET status = ?1, rejection_reason = ?2 WHERE id = ?3",
            params![status.as_str(), reason, id],
        )?;
        if affected == 0 {
            bail!("Listing {} not found for status update", id);
        }
        Ok(())
    }

    fn record_vote(&self, listing_id: &str, voter_id: &str) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO votes (listing_id, voter_id, created_at) VALUES (?1, ?2, ?3)",
            params![listing_id, voter_id, Self::format_datetime(&Utc::now())],
        )
        .with_context(|| format!("Failed to record vote for listing {}", listing_id))?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM votes WHERE listing_id = ?1",
            params![listing_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn stats(&self) -> Result<DirectoryStats> {
        let conn = self.conn.lock().unwrap();
        let (total, approved, pending): (i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'approved'),
                    COUNT(*) FILTER (WHERE status = 'pending')
             FROM listings",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let (votes, voters): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT voter_id) FROM votes",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(DirectoryStats {
            total_listings: total.max(0) as u64,
            approved_listings: approved.max(0) as u64,
            pending_listings: pending.max(0) as u64,
            total_votes: votes.max(0) as u64,
            distinct_voters: voters.max(0) as u64,
        })
    }
}
