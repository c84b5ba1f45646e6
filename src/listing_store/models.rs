//! Listing data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation status of a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Approved => "approved",
            ListingStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ListingStatus::Pending),
            "approved" => Some(ListingStatus::Approved),
            "rejected" => Some(ListingStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered third-party bot tracked by the directory.
///
/// `name`, `description`, `tags`, `avatar_url` and `invite_url` are display
/// metadata owned by the storefront; this service only reads them when
/// rendering notifications. `server_count` and `last_server_count_update`
/// are mutated exclusively by the reconciliation loop, `status` and
/// `rejection_reason` by moderation actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// External platform application id. Stable and unique.
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub owner_id: String,
    /// Stored avatar URL, used as the thumbnail fallback when the live
    /// lookup fails.
    pub avatar_url: Option<String>,
    pub invite_url: Option<String>,
    pub status: ListingStatus,
    pub rejection_reason: Option<String>,
    pub server_count: u64,
    pub last_server_count_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// A fresh pending submission with no counts yet.
    pub fn new_submission(id: &str, name: &str, owner_id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            tags: Vec::new(),
            owner_id: owner_id.to_string(),
            avatar_url: None,
            invite_url: None,
            status: ListingStatus::Pending,
            rejection_reason: None,
            server_count: 0,
            last_server_count_update: None,
            created_at: Utc::now(),
        }
    }
}

/// Aggregate counts backing the `stats` command and the home route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryStats {
    pub total_listings: u64,
    pub approved_listings: u64,
    pub pending_listings: u64,
    pub total_votes: u64,
    pub distinct_voters: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in [
            ListingStatus::Pending,
            ListingStatus::Approved,
            ListingStatus::Rejected,
        ] {
            assert_eq!(ListingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ListingStatus::parse("banned"), None);
    }

    #[test]
    fn status_serde_uses_snake_case() {
        let serialized = serde_json::to_string(&ListingStatus::Approved).unwrap();
        assert_eq!(serialized, "\"approved\"");
    }

    #[test]
    fn new_submission_is_pending() {
        let listing = Listing::new_submission("42", "ModBot", "owner-1");
        assert_eq!(listing.status, ListingStatus::Pending);
        assert_eq!(listing.server_count, 0);
        assert!(listing.last_server_count_update.is_none());
        assert!(listing.rejection_reason.is_none());
    }
}
