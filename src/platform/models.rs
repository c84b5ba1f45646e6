use serde::Deserialize;

/// Display identity of a platform user, as rendered in notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformUser {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// A structured channel message: title, body, accent color, labelled
/// fields, optional link buttons and thumbnail. The delivery tiers strip
/// it down progressively when the platform rejects the richer forms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RichMessage {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<MessageField>,
    pub links: Vec<LinkButton>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageField {
    pub name: String,
    pub value: String,
}

impl MessageField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApplicationResponse {
    pub approximate_guild_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserResponse {
    pub id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
}

impl UserResponse {
    pub(super) fn into_platform_user(self, cdn_base_url: &str) -> PlatformUser {
        let avatar_url = self
            .avatar
            .as_ref()
            .map(|hash| format!("{}/avatars/{}/{}.png", cdn_base_url, self.id, hash));
        let display_name = self.global_name.unwrap_or(self.username);
        PlatformUser {
            id: self.id,
            display_name,
            avatar_url,
        }
    }
}
