use serde::{Deserialize, Serialize};

/// A moderation or engagement action to be logged to the notification
/// channel. Constructed by the storefront (over the ingestion endpoint)
/// or by a command handler, consumed exactly once, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NotificationEvent {
    Submit {
        listing_id: String,
        actor_id: String,
    },
    Approve {
        listing_id: String,
        actor_id: String,
    },
    Reject {
        listing_id: String,
        actor_id: String,
        reason: String,
    },
    Vote {
        listing_id: String,
        actor_id: String,
        vote_count: u64,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            NotificationEvent::Submit { .. } => EventKind::Submit,
            NotificationEvent::Approve { .. } => EventKind::Approve,
            NotificationEvent::Reject { .. } => EventKind::Reject,
            NotificationEvent::Vote { .. } => EventKind::Vote,
        }
    }

    pub fn listing_id(&self) -> &str {
        match self {
            NotificationEvent::Submit { listing_id, .. }
            | NotificationEvent::Approve { listing_id, .. }
            | NotificationEvent::Reject { listing_id, .. }
            | NotificationEvent::Vote { listing_id, .. } => listing_id,
        }
    }

    pub fn actor_id(&self) -> &str {
        match self {
            NotificationEvent::Submit { actor_id, .. }
            | NotificationEvent::Approve { actor_id, .. }
            | NotificationEvent::Reject { actor_id, .. }
            | NotificationEvent::Vote { actor_id, .. } => actor_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Submit,
    Approve,
    Reject,
    Vote,
}

/// Presentation attributes per event kind. This table is the single
/// source of truth for how each kind is titled and colored.
pub(super) struct EventStyle {
    pub title: &'static str,
    pub color: u32,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Submit => "submit",
            EventKind::Approve => "approve",
            EventKind::Reject => "reject",
            EventKind::Vote => "vote",
        }
    }

    pub(super) fn style(&self) -> EventStyle {
        match self {
            EventKind::Submit => EventStyle {
                title: "New Bot Submitted",
                color: 0x3498db,
            },
            EventKind::Approve => EventStyle {
                title: "Bot Approved",
                color: 0x2ecc71,
            },
            EventKind::Reject => EventStyle {
                title: "Bot Rejected",
                color: 0xe74c3c,
            },
            EventKind::Vote => EventStyle {
                title: "New Vote",
                color: 0xf1c40f,
            },
        }
    }
}
