//! Accounts, profiles, contacts and avatars.

pub mod accounts;
pub mod avatar;
pub mod contacts;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::User;

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_picture: user.profile_picture,
            is_online: user.is_online,
            last_seen: user.last_seen,
            created_at: user.created_at,
        }
    }
}
