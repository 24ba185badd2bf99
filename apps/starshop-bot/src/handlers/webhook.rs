use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::StatusCode,
};
use tracing::{debug, warn};

use crate::bot::event::classify_payload;
use crate::state::AppState;

/// Updates larger than this are dropped unread.
pub const MAX_UPDATE_BYTES: usize = 1024 * 1024;

/// Always 200: anything else makes the platform redeliver the update.
pub async fn telegram_webhook(State(state): State<AppState>, body: Body) -> StatusCode {
    let body = match to_bytes(body, MAX_UPDATE_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            warn!("Dropping webhook update that could not be read: {}", e);
            return StatusCode::OK;
        }
    };

    let event = classify_payload(&body);
    debug!("Webhook update classified as {}", event.kind());
    state.dispatcher.handle(event).await;
    StatusCode::OK
}

pub async fn health() -> &'static str {
    "✅ Stars shop backend is running!"
}
