//! Contact list and block list maintenance.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::state::AppState;
use crate::store::UserStore;
use crate::users::UserResponse;

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactRequest {
    pub contact_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlockRequest {
    pub user_id: String,
}

/// Reject self-references and unknown or deleted targets.
async fn ensure_other_user(
    state: &AppState,
    caller_id: &str,
    target_id: &str,
) -> Result<(), (StatusCode, String)> {
    if caller_id == target_id {
        return Err((
            StatusCode::BAD_REQUEST,
            "Cannot target your own account".to_string(),
        ));
    }
    if !state.store.exists(target_id).await? {
        return Err((StatusCode::NOT_FOUND, "User not found".to_string()));
    }
    Ok(())
}

/// GET /api/user/contacts
pub async fn list_contacts(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<UserResponse>>, (StatusCode, String)> {
    let contacts = state.store.list_contacts(&claims.sub).await?;
    Ok(Json(contacts.into_iter().map(UserResponse::from).collect()))
}

/// POST /api/user/contacts
/// Appends to the ordered contact list; adding an existing contact is a no-op.
pub async fn add_contact(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<ContactRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    ensure_other_user(&state, &claims.sub, &req.contact_id).await?;
    let added = state.store.add_contact(&claims.sub, &req.contact_id).await?;
    tracing::debug!(user_id = %claims.sub, contact_id = %req.contact_id, added, "Contact added");
    Ok(if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    })
}

/// DELETE /api/user/contacts/{contact_id}
pub async fn remove_contact(
    State(state): State<AppState>,
    claims: Claims,
    Path(contact_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    if !state.store.remove_contact(&claims.sub, &contact_id).await? {
        return Err((StatusCode::NOT_FOUND, "Contact not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/user/block
/// Messages from a blocked user are refused at send time.
pub async fn block_user(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<BlockRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    ensure_other_user(&state, &claims.sub, &req.user_id).await?;
    state.store.block_user(&claims.sub, &req.user_id).await?;
    tracing::info!(user_id = %claims.sub, blocked_id = %req.user_id, "User blocked");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/user/unblock
pub async fn unblock_user(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<BlockRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.store.unblock_user(&claims.sub, &req.user_id).await?;
    tracing::info!(user_id = %claims.sub, blocked_id = %req.user_id, "User unblocked");
    Ok(StatusCode::NO_CONTENT)
}
