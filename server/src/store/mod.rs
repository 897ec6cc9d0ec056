//! Persistence seams used by the hub and the conversation aggregator.
//!
//! The hub only depends on these traits; `SqliteStore` is the implementation
//! the server runs with.

pub mod sqlite;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};

use crate::db::models::{Message, NewMessage, User};

pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("database lock poisoned")]
    LockPoisoned,
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("{0} already taken")]
    Conflict(&'static str),
}

impl From<StoreError> for (StatusCode, String) {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
            other => {
                tracing::error!(error = %other, "Store operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by id, including soft-deleted accounts.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// True if a non-deleted user with this id exists.
    async fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Persist the online flag and stamp `last_seen`.
    async fn set_online(
        &self,
        id: &str,
        online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message; returns the canonical record with its
    /// generated id and timestamp.
    async fn insert(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// Non-deleted message by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Message>, StoreError>;

    /// Set the read flag. The first read timestamp is kept on repeated calls.
    /// Returns the updated message, or None if it does not exist.
    async fn mark_read(&self, id: &str, at: DateTime<Utc>)
        -> Result<Option<Message>, StoreError>;

    /// Mark every unread message from `sender_id` to `receiver_id` as read.
    /// Returns the ids that changed.
    async fn mark_all_read(
        &self,
        sender_id: &str,
        receiver_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError>;

    /// Non-deleted messages exchanged between two users, newest first.
    async fn find_by_participants(
        &self,
        user_a: &str,
        user_b: &str,
        skip: usize,
        take: Option<usize>,
    ) -> Result<Vec<Message>, StoreError>;

    /// Unread, non-deleted messages from `sender_id` to `receiver_id`.
    async fn count_unread_from(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<u64, StoreError>;

    /// Unread, non-deleted messages addressed to `receiver_id`.
    async fn count_unread(&self, receiver_id: &str) -> Result<u64, StoreError>;

    async fn find_unread(&self, receiver_id: &str) -> Result<Vec<Message>, StoreError>;

    /// Non-deleted messages sent or received by the user, newest first.
    /// `limit = None` returns the whole history.
    async fn find_recent_for_user(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Message>, StoreError>;

    /// Flag a message deleted. Returns false if it was missing or already deleted.
    async fn soft_delete(&self, id: &str) -> Result<bool, StoreError>;
}
