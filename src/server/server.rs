use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, warn};

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use crate::commands::{CommandInvocation, CommandReply, ReplySink};
use crate::listing_store::DirectoryStats;
use crate::notifications::NotificationEvent;

use super::{log_requests, metrics, state::*};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub directory: DirectoryStats,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> Response {
    let directory = match state.listing_store.stats() {
        Ok(stats) => stats,
        Err(e) => {
            error!("Stats query failed: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        directory,
    };
    Json(stats).into_response()
}

#[derive(Serialize)]
struct NotifyResponse {
    success: bool,
}

/// Ingestion endpoint for the storefront. Vote events also persist the
/// vote before the notification goes out, so the stored total and the
/// rendered total stay in step. A vote for a listing that no longer
/// exists is dropped like any other stale event, not failed.
async fn post_notify(
    State(state): State<ServerState>,
    Json(event): Json<NotificationEvent>,
) -> Response {
    let event = match event {
        NotificationEvent::Vote {
            listing_id,
            actor_id,
            ..
        } => {
            match state.listing_store.get(&listing_id) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    warn!("Dropping vote event for unknown listing {listing_id}");
                    return Json(NotifyResponse { success: true }).into_response();
                }
                Err(e) => {
                    error!("Listing lookup for {listing_id} failed: {e}");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            }
            match state.listing_store.record_vote(&listing_id, &actor_id) {
                Ok(vote_count) => NotificationEvent::Vote {
                    listing_id,
                    actor_id,
                    vote_count,
                },
                Err(e) => {
                    error!("Recording vote for listing {listing_id} failed: {e}");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            }
        }
        other => other,
    };

    match state.notifier.notify(&event).await {
        Ok(()) => Json(NotifyResponse { success: true }).into_response(),
        Err(e) => {
            error!("Notification for listing {} failed: {e}", event.listing_id());
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Deserialize, Debug)]
struct CommandBody {
    pub text: String,
    pub invoker_id: String,
    pub is_admin: bool,
    pub channel_id: String,
}

#[derive(Serialize)]
struct CommandResponse {
    pub outcome: &'static str,
    pub reply: String,
}

/// Reply sink backed by the invoking channel: the intermediate
/// acknowledgement is posted there, the final reply is captured and
/// returned as the HTTP response body.
struct HttpReplySink {
    platform: GuardedPlatformClient,
    channel_id: String,
    final_reply: AsyncMutex<Option<CommandReply>>,
}

#[async_trait]
impl ReplySink for HttpReplySink {
    async fn acknowledge(&self) {
        if let Err(e) = self
            .platform
            .send_plain_message(&self.channel_id, "Processing...")
            .await
        {
            warn!("Acknowledgement to channel {} failed: {e}", self.channel_id);
        }
    }

    async fn reply(&self, reply: &CommandReply) {
        *self.final_reply.lock().await = Some(reply.clone());
    }
}

async fn post_command(
    State(state): State<ServerState>,
    Json(body): Json<CommandBody>,
) -> Response {
    let Some(invocation) = CommandInvocation::parse(
        &body.text,
        &body.invoker_id,
        body.is_admin,
        &body.channel_id,
    ) else {
        let response = CommandResponse {
            outcome: "rejected",
            reply: "Could not parse command".to_string(),
        };
        return (StatusCode::BAD_REQUEST, Json(response)).into_response();
    };

    let sink = HttpReplySink {
        platform: state.platform.clone(),
        channel_id: body.channel_id.clone(),
        final_reply: AsyncMutex::new(None),
    };
    state.dispatcher.dispatch_deferred(invocation, &sink).await;

    let reply = sink.final_reply.lock().await.take();
    match reply {
        Some(reply) => {
            let response = CommandResponse {
                outcome: reply.outcome(),
                reply: reply.text().to_string(),
            };
            Json(response).into_response()
        }
        // dispatch_deferred always replies exactly once.
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub fn make_app(state: ServerState) -> Router {
    let api_routes: Router = Router::new()
        .route("/notify", post(post_notify))
        .route("/command", post(post_command))
        .with_state(state.clone());

    Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/v1", api_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

pub async fn run_server(state: ServerState, shutdown_token: CancellationToken) -> Result<()> {
    let config = state.config.clone();
    let app = make_app(state);

    let metrics_listener =
        tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.metrics_port)).await?;
    let metrics_token = shutdown_token.clone();
    tokio::spawn(async move {
        let result = axum::serve(metrics_listener, make_metrics_app())
            .with_graceful_shutdown(async move { metrics_token.cancelled().await })
            .await;
        if let Err(e) = result {
            error!("Metrics server failed: {e}");
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.port)).await?;

    Ok(axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0d 00:00:00");
        assert_eq!(format_uptime(Duration::from_secs(61)), "0d 00:01:01");
        assert_eq!(
            format_uptime(Duration::from_secs(2 * 86_400 + 3 * 3600 + 4 * 60 + 5)),
            "2d 03:04:05"
        );
    }

    #[test]
    fn command_body_deserializes() {
        let body: CommandBody = serde_json::from_str(
            r#"{"text":"approve 42","invoker_id":"9","is_admin":true,"channel_id":"555"}"#,
        )
        .unwrap();
        assert_eq!(body.text, "approve 42");
        assert!(body.is_admin);
    }
}
