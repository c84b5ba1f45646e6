use std::sync::Arc;

use tracing::{info, warn};

use crate::listing_store::ListingStore;
use crate::platform::PlatformClient;
use crate::server::metrics;

use super::renderer::{flatten_message, render_event};
use super::NotificationEvent;

/// Delivery tiers, richest first. Walked in order; first success wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryTier {
    Rich,
    RichWithoutLinks,
    PlainText,
}

const DELIVERY_TIERS: [DeliveryTier; 3] = [
    DeliveryTier::Rich,
    DeliveryTier::RichWithoutLinks,
    DeliveryTier::PlainText,
];

impl DeliveryTier {
    fn as_str(&self) -> &'static str {
        match self {
            DeliveryTier::Rich => "rich",
            DeliveryTier::RichWithoutLinks => "rich_without_links",
            DeliveryTier::PlainText => "plain_text",
        }
    }
}

/// Posts moderation events to the designated log channel.
///
/// Delivery is best effort: a send failure degrades through the tier
/// list and a total failure is logged and swallowed, so the triggering
/// workflow (an approval, a vote) never observes it. [`notify`] only
/// errors when the listing lookup itself fails at the store.
pub struct ChannelNotifier {
    platform: Arc<dyn PlatformClient>,
    listing_store: Arc<dyn ListingStore>,
    channel_id: String,
    storefront_base_url: String,
}

impl ChannelNotifier {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        listing_store: Arc<dyn ListingStore>,
        channel_id: &str,
        storefront_base_url: &str,
    ) -> Self {
        Self {
            platform,
            listing_store,
            channel_id: channel_id.to_string(),
            storefront_base_url: storefront_base_url.to_string(),
        }
    }

    pub async fn notify(&self, event: &NotificationEvent) -> anyhow::Result<()> {
        let Some(listing) = self.listing_store.get(event.listing_id())? else {
            warn!(
                "Dropping {} event for unknown listing {}",
                event.kind().as_str(),
                event.listing_id()
            );
            return Ok(());
        };

        let actor = match self.platform.fetch_user(event.actor_id()).await {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Actor lookup for {} failed: {e}", event.actor_id());
                None
            }
        };

        // The listing's own platform identity supplies the thumbnail.
        let listing_identity = match self.platform.fetch_user(&listing.id).await {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Avatar lookup for listing {} failed: {e}", listing.id);
                None
            }
        };

        let message = render_event(
            event,
            &listing,
            listing_identity.as_ref(),
            actor.as_ref(),
            &self.storefront_base_url,
        );

        for tier in DELIVERY_TIERS {
            let result = match tier {
                DeliveryTier::Rich => {
                    self.platform
                        .send_rich_message(&self.channel_id, &message)
                        .await
                }
                DeliveryTier::RichWithoutLinks => {
                    let mut stripped = message.clone();
                    stripped.links.clear();
                    self.platform
                        .send_rich_message(&self.channel_id, &stripped)
                        .await
                }
                DeliveryTier::PlainText => {
                    self.platform
                        .send_plain_message(&self.channel_id, &flatten_message(&message))
                        .await
                }
            };
            match result {
                Ok(()) => {
                    info!(
                        "Delivered {} notification for listing {} at tier {}",
                        event.kind().as_str(),
                        listing.id,
                        tier.as_str()
                    );
                    metrics::record_notification_delivery(event.kind().as_str(), tier.as_str());
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Tier {} delivery failed for listing {}: {e}",
                        tier.as_str(),
                        listing.id
                    );
                }
            }
        }

        warn!(
            "All delivery tiers failed for {} event on listing {}",
            event.kind().as_str(),
            listing.id
        );
        metrics::record_notification_delivery(event.kind().as_str(), "failed");
        Ok(())
    }
}
