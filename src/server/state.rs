use axum::extract::FromRef;

use crate::commands::CommandDispatcher;
use crate::listing_store::ListingStore;
use crate::notifications::ChannelNotifier;
use crate::platform::PlatformClient;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedListingStore = Arc<dyn ListingStore>;
pub type GuardedPlatformClient = Arc<dyn PlatformClient>;
pub type GuardedNotifier = Arc<ChannelNotifier>;
pub type GuardedDispatcher = Arc<CommandDispatcher>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub listing_store: GuardedListingStore,
    pub platform: GuardedPlatformClient,
    pub notifier: GuardedNotifier,
    pub dispatcher: GuardedDispatcher,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedListingStore {
    fn from_ref(input: &ServerState) -> Self {
        input.listing_store.clone()
    }
}

impl FromRef<ServerState> for GuardedPlatformClient {
    fn from_ref(input: &ServerState) -> Self {
        input.platform.clone()
    }
}

impl FromRef<ServerState> for GuardedNotifier {
    fn from_ref(input: &ServerState) -> Self {
        input.notifier.clone()
    }
}

impl FromRef<ServerState> for GuardedDispatcher {
    fn from_ref(input: &ServerState) -> Self {
        input.dispatcher.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
