//! Moderation notifications module

mod delivery;
mod events;
mod renderer;

pub use delivery::ChannelNotifier;
pub use events::{EventKind, NotificationEvent};
pub use renderer::{flatten_message, render_event};
