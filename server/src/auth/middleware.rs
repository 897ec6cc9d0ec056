use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::validate_access_token;

/// JWT claims extracted from Authorization: Bearer header.
/// Implements axum's FromRequestParts for use as an extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID (UUIDv7)
    pub sub: String,
    pub username: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        // Set by the middleware layer in routes.rs
        let jwt_secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

        validate_access_token(&jwt_secret.0, token).map_err(|_| StatusCode::UNAUTHORIZED)
    }
}

/// JWT secret stored in request extensions for the Claims extractor
#[derive(Clone)]
pub struct JwtSecret(pub Vec<u8>);
