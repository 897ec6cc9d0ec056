//! REST endpoints for conversations.
//!
//! A conversation is not stored; it is the set of messages between two
//! users, summarised per peer by the aggregator.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::chat::ConversationSummary;
use crate::db::models::Message;
use crate::dm::rest_caller;
use crate::state::AppState;
use crate::store::MessageStore;

/// Default page size for conversation history.
const DEFAULT_TAKE: usize = 50;
/// Maximum page size for conversation history.
const MAX_TAKE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkedReadResponse {
    pub message_ids: Vec<String>,
}

/// GET /api/message/conversations
/// One row per peer, most recent conversation first.
pub async fn list_conversations(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<ConversationSummary>>, (StatusCode, String)> {
    let caller = rest_caller(&state, &claims.sub);
    let summaries = state.hub.conversations(&caller).await?;
    Ok(Json(summaries))
}

/// GET /api/message/conversation/{peer_id}?skip={n}&take={n}
/// Messages exchanged with one peer, newest first.
pub async fn get_conversation(
    State(state): State<AppState>,
    claims: Claims,
    Path(peer_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Message>>, (StatusCode, String)> {
    let skip = query.skip.unwrap_or(0);
    let take = query.take.unwrap_or(DEFAULT_TAKE).clamp(1, MAX_TAKE);

    let messages = state
        .store
        .find_by_participants(&claims.sub, &peer_id, skip, Some(take))
        .await?;
    Ok(Json(messages))
}

/// DELETE /api/message/conversation/{peer_id}
/// Soft-deletes the whole conversation for both participants.
pub async fn delete_conversation(
    State(state): State<AppState>,
    claims: Claims,
    Path(peer_id): Path<String>,
) -> Result<Json<DeletedResponse>, (StatusCode, String)> {
    let caller = rest_caller(&state, &claims.sub);
    let deleted = state.hub.delete_conversation(&caller, &peer_id).await?;
    Ok(Json(DeletedResponse { deleted }))
}

/// POST /api/message/read/all/{peer_id}
/// Mark everything the peer sent to the caller as read.
pub async fn mark_all_as_read(
    State(state): State<AppState>,
    claims: Claims,
    Path(peer_id): Path<String>,
) -> Result<Json<MarkedReadResponse>, (StatusCode, String)> {
    let caller = rest_caller(&state, &claims.sub);
    let message_ids = state.hub.mark_all_as_read(&caller, &peer_id).await?;
    Ok(Json(MarkedReadResponse { message_ids }))
}
