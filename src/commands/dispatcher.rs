use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::listing_store::{Listing, ListingStatus, ListingStore};
use crate::notifications::{ChannelNotifier, NotificationEvent};
use crate::server::metrics;

use super::{CommandInvocation, CommandReply};

/// Where a command's replies go. The HTTP surface backs this with the
/// invoking channel; tests capture replies in memory.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Intermediate "processing" acknowledgement, sent at most once when
    /// the handler outlives the response window.
    async fn acknowledge(&self);

    async fn reply(&self, reply: &CommandReply);
}

pub struct CommandDispatcher {
    listing_store: Arc<dyn ListingStore>,
    notifier: Arc<ChannelNotifier>,
    ack_after: Duration,
}

impl CommandDispatcher {
    pub fn new(
        listing_store: Arc<dyn ListingStore>,
        notifier: Arc<ChannelNotifier>,
        ack_after: Duration,
    ) -> Self {
        Self {
            listing_store,
            notifier,
            ack_after,
        }
    }

    /// Run one invocation to completion, acknowledging first if the
    /// handler has not resolved within the response window.
    pub async fn dispatch_deferred(&self, invocation: CommandInvocation, sink: &dyn ReplySink) {
        let handler = self.dispatch(&invocation);
        tokio::pin!(handler);

        let reply = tokio::select! {
            reply = &mut handler => reply,
            _ = tokio::time::sleep(self.ack_after) => {
                sink.acknowledge().await;
                handler.await
            }
        };

        metrics::record_command(&invocation.command_name, reply.outcome());
        sink.reply(&reply).await;
    }

    pub async fn dispatch(&self, invocation: &CommandInvocation) -> CommandReply {
        info!(
            "Dispatching command {:?} from {}",
            invocation.command_name, invocation.invoker_id
        );
        match invocation.command_name.as_str() {
            "stats" => self.handle_stats(),
            "bot" => self.handle_bot(invocation),
            "approve" => self.handle_approve(invocation).await,
            "reject" => self.handle_reject(invocation).await,
            other => CommandReply::Rejected(format!("Unknown command: {other}")),
        }
    }

    fn handle_stats(&self) -> CommandReply {
        match self.listing_store.stats() {
            Ok(stats) => CommandReply::Success(format!(
                "Directory stats: {} listings ({} approved, {} pending), {} votes from {} voters",
                stats.total_listings,
                stats.approved_listings,
                stats.pending_listings,
                stats.total_votes,
                stats.distinct_voters,
            )),
            Err(e) => {
                warn!("Stats query failed: {e}");
                CommandReply::Rejected("Stats are unavailable right now".to_string())
            }
        }
    }

    fn handle_bot(&self, invocation: &CommandInvocation) -> CommandReply {
        let Some(id) = invocation.args.first() else {
            return CommandReply::Rejected("Usage: bot <id>".to_string());
        };
        match self.listing_store.get(id) {
            Ok(Some(listing)) => CommandReply::Success(describe_listing(&listing)),
            Ok(None) => CommandReply::Rejected(format!("No listing with id {id}")),
            Err(e) => {
                warn!("Listing lookup for {id} failed: {e}");
                CommandReply::Rejected("Lookup failed, try again later".to_string())
            }
        }
    }

    async fn handle_approve(&self, invocation: &CommandInvocation) -> CommandReply {
        if !invocation.is_admin {
            return CommandReply::Forbidden("Approving listings requires admin".to_string());
        }
        let Some(id) = invocation.args.first() else {
            return CommandReply::Rejected("Usage: approve <id>".to_string());
        };
        let listing = match self.listing_store.get(id) {
            Ok(Some(listing)) => listing,
            Ok(None) => return CommandReply::Rejected(format!("No listing with id {id}")),
            Err(e) => {
                warn!("Listing lookup for {id} failed: {e}");
                return CommandReply::Rejected("Lookup failed, try again later".to_string());
            }
        };
        if listing.status == ListingStatus::Approved {
            return CommandReply::Success(format!("{} is already approved", listing.name));
        }
        if let Err(e) = self
            .listing_store
            .set_status(id, ListingStatus::Approved, None)
        {
            warn!("Approving {id} failed: {e}");
            return CommandReply::Rejected("Could not persist the approval".to_string());
        }
        self.notify_after_mutation(NotificationEvent::Approve {
            listing_id: id.clone(),
            actor_id: invocation.invoker_id.clone(),
        })
        .await;
        CommandReply::Success(format!("Approved {}", listing.name))
    }

    async fn handle_reject(&self, invocation: &CommandInvocation) -> CommandReply {
        if !invocation.is_admin {
            return CommandReply::Forbidden("Rejecting listings requires admin".to_string());
        }
        let Some(id) = invocation.args.first() else {
            return CommandReply::Rejected("Usage: reject <id> <reason>".to_string());
        };
        let reason = invocation.args[1..].join(" ");
        if reason.is_empty() {
            return CommandReply::Rejected("Usage: reject <id> <reason>".to_string());
        }
        let listing = match self.listing_store.get(id) {
            Ok(Some(listing)) => listing,
            Ok(None) => return CommandReply::Rejected(format!("No listing with id {id}")),
            Err(e) => {
                warn!("Listing lookup for {id} failed: {e}");
                return CommandReply::Rejected("Lookup failed, try again later".to_string());
            }
        };
        if listing.status == ListingStatus::Rejected {
            return CommandReply::Success(format!("{} is already rejected", listing.name));
        }
        if let Err(e) = self
            .listing_store
            .set_status(id, ListingStatus::Rejected, Some(&reason))
        {
            warn!("Rejecting {id} failed: {e}");
            return CommandReply::Rejected("Could not persist the rejection".to_string());
        }
        self.notify_after_mutation(NotificationEvent::Reject {
            listing_id: id.clone(),
            actor_id: invocation.invoker_id.clone(),
            reason,
        })
        .await;
        CommandReply::Success(format!("Rejected {}", listing.name))
    }

    /// The mutation has already committed; a notification failure is an
    /// observability loss only and must not change the reply.
    async fn notify_after_mutation(&self, event: NotificationEvent) {
        if let Err(e) = self.notifier.notify(&event).await {
            warn!("Post-mutation notification failed: {e}");
        }
    }
}

fn describe_listing(listing: &Listing) -> String {
    let mut text = format!(
        "{} ({}) - status: {}, servers: {}",
        listing.name, listing.id, listing.status, listing.server_count
    );
    if !listing.tags.is_empty() {
        text.push_str(&format!(", tags: {}", listing.tags.join(", ")));
    }
    if let Some(reason) = &listing.rejection_reason {
        text.push_str(&format!(", rejection reason: {reason}"));
    }
    text
}
