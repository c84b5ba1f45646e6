//! Event-to-message rendering.

use crate::listing_store::Listing;
use crate::platform::{LinkButton, MessageField, PlatformUser, RichMessage};

use super::NotificationEvent;

/// Render an event into the full structured message. The delivery layer
/// degrades it from there; rendering itself is infallible.
///
/// The thumbnail prefers the listing's live platform avatar over its
/// stored one, and is omitted entirely when neither resolves.
pub fn render_event(
    event: &NotificationEvent,
    listing: &Listing,
    listing_identity: Option<&PlatformUser>,
    actor: Option<&PlatformUser>,
    storefront_base_url: &str,
) -> RichMessage {
    let style = event.kind().style();

    let actor_label = actor
        .map(|user| user.display_name.clone())
        .unwrap_or_else(|| format!("<@{}>", event.actor_id()));

    let mut fields = vec![
        MessageField::new("Bot", listing.name.clone()),
        MessageField::new("Actor", actor_label),
    ];
    if !listing.tags.is_empty() {
        fields.push(MessageField::new("Tags", listing.tags.join(", ")));
    }
    fields.push(MessageField::new(
        "Servers",
        listing.server_count.to_string(),
    ));
    match event {
        NotificationEvent::Reject { reason, .. } => {
            fields.push(MessageField::new("Reason", reason.clone()));
        }
        NotificationEvent::Vote { vote_count, .. } => {
            fields.push(MessageField::new("Total Votes", vote_count.to_string()));
        }
        NotificationEvent::Submit { .. } | NotificationEvent::Approve { .. } => {}
    }

    let mut links = vec![LinkButton {
        label: "View Listing".to_string(),
        url: format!(
            "{}/bots/{}",
            storefront_base_url.trim_end_matches('/'),
            listing.id
        ),
    }];
    if let Some(invite_url) = &listing.invite_url {
        links.push(LinkButton {
            label: "Invite".to_string(),
            url: invite_url.clone(),
        });
    }

    let thumbnail_url = listing_identity
        .and_then(|user| user.avatar_url.clone())
        .or_else(|| listing.avatar_url.clone());

    RichMessage {
        title: style.title.to_string(),
        description: listing.description.clone(),
        color: style.color,
        fields,
        links,
        thumbnail_url,
    }
}

/// Flatten a structured message for the plain-text delivery tier: the
/// title followed by one `**name:** value` line per field.
pub fn flatten_message(message: &RichMessage) -> String {
    let mut lines = Vec::with_capacity(message.fields.len() + 1);
    lines.push(message.title.clone());
    for field in &message.fields {
        lines.push(format!("**{}:** {}", field.name, field.value));
    }
    lines.join("\n")
}
