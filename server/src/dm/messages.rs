//! REST endpoints for single messages.
//!
//! Sends and read receipts go through the hub, so a REST client and a
//! socket client see the same pushes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::chat::SendMessageRequest;
use crate::db::models::Message;
use crate::dm::rest_caller;
use crate::state::AppState;
use crate::store::MessageStore;

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// POST /api/message
/// Persist and deliver a message. The receiver gets `ReceiveMessage` if
/// connected; the caller's own socket, if any, gets `MessageSent`.
pub async fn send_message(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), (StatusCode, String)> {
    let caller = rest_caller(&state, &claims.sub);
    let message = state.hub.send_message(&caller, body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/message/{id}
/// Only the sender and the receiver may read a message.
pub async fn get_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(message_id): Path<String>,
) -> Result<Json<Message>, (StatusCode, String)> {
    let message = MessageStore::find_by_id(state.store.as_ref(), &message_id)
        .await?
        .ok_or((StatusCode::NOT_FOUND, "Message not found".to_string()))?;

    if message.sender_id != claims.sub && message.receiver_id != claims.sub {
        return Err((StatusCode::FORBIDDEN, "Not a participant".to_string()));
    }
    Ok(Json(message))
}

/// PUT /api/message/{id}/read
pub async fn mark_as_read(
    State(state): State<AppState>,
    claims: Claims,
    Path(message_id): Path<String>,
) -> Result<Json<Message>, (StatusCode, String)> {
    let caller = rest_caller(&state, &claims.sub);
    let message = state.hub.mark_message_as_read(&caller, &message_id).await?;
    Ok(Json(message))
}

/// DELETE /api/message/{id}
pub async fn delete_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(message_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let caller = rest_caller(&state, &claims.sub);
    state.hub.delete_message(&caller, &message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/message/unread
pub async fn get_unread(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<Message>>, (StatusCode, String)> {
    let messages = state.store.find_unread(&claims.sub).await?;
    Ok(Json(messages))
}

/// GET /api/message/unread/count
pub async fn get_unread_count(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<UnreadCountResponse>, (StatusCode, String)> {
    let count = state.store.count_unread(&claims.sub).await?;
    Ok(Json(UnreadCountResponse { count }))
}
