use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::jwt;
use crate::auth::middleware::Claims;
use crate::auth::password;
use crate::db::models::NewUser;
use crate::state::AppState;
use crate::store::UserStore;
use crate::users::UserResponse;

/// Minimum accepted password length (chars).
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

fn bad_request(message: &str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message.to_string())
}

/// POST /api/user/register
/// Create an account. Username and email must be unique among all accounts,
/// including soft-deleted ones.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), (StatusCode, String)> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if username.is_empty() {
        return Err(bad_request("Username cannot be empty"));
    }
    if !email.contains('@') {
        return Err(bad_request("Email is invalid"));
    }
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(bad_request("First and last name are required"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(bad_request("Password is too short"));
    }

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Task join error: {}", e),
            )
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password hashing failed".to_string(),
            )
        })?;

    let user = state
        .store
        .create_user(NewUser {
            username,
            email,
            password_hash,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            profile_picture: req.profile_picture,
        })
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /api/user/login
/// Exchange username + password for an access token.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let unauthorized = || {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid username or password".to_string(),
        )
    };

    let user = state
        .store
        .find_by_username(req.username.trim())
        .await?
        .ok_or_else(unauthorized)?;

    let password = req.password;
    let stored_hash = user.password_hash.clone();
    let valid =
        tokio::task::spawn_blocking(move || password::verify_password(&password, &stored_hash))
            .await
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Task join error: {}", e),
                )
            })?;
    if !valid {
        tracing::debug!(username = %user.username, "Login rejected");
        return Err(unauthorized());
    }

    let token = jwt::issue_access_token(
        &state.jwt_secret,
        &user.id,
        &user.username,
        state.jwt_expiry_minutes,
    )
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        user: user.into(),
        token,
    }))
}

/// GET /api/user/profile
pub async fn get_profile(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<UserResponse>, StatusCode> {
    find_active(&state, &claims.sub).await.map(Json)
}

/// PUT /api/user/profile
pub async fn update_profile(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(bad_request("First and last name are required"));
    }

    let user = state
        .store
        .update_profile(
            &claims.sub,
            req.first_name.trim().to_string(),
            req.last_name.trim().to_string(),
            req.profile_picture,
        )
        .await?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// GET /api/user
/// Every other active user, for the "start a conversation" picker.
pub async fn list_users(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<UserResponse>>, (StatusCode, String)> {
    let users = state.store.list_users_except(&claims.sub).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /api/user/{id}
pub async fn get_user(
    State(state): State<AppState>,
    _claims: Claims,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, StatusCode> {
    find_active(&state, &user_id).await.map(Json)
}

/// GET /api/user/username/{username}
pub async fn get_user_by_username(
    State(state): State<AppState>,
    _claims: Claims,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, StatusCode> {
    let user = state
        .store
        .find_by_username(&username)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "User lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(user.into()))
}

/// DELETE /api/user
/// Soft-delete the caller's account. Messages are kept; the account no
/// longer appears in lookups or conversation lists.
pub async fn delete_account(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<StatusCode, (StatusCode, String)> {
    if !state.store.soft_delete_user(&claims.sub).await? {
        return Err((StatusCode::NOT_FOUND, "User not found".to_string()));
    }
    tracing::info!(user_id = %claims.sub, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_active(state: &AppState, user_id: &str) -> Result<UserResponse, StatusCode> {
    UserStore::find_by_id(state.store.as_ref(), user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "User lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .filter(|user| !user.is_deleted)
        .map(UserResponse::from)
        .ok_or(StatusCode::NOT_FOUND)
}
