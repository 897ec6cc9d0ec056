//! Database row types.
//! These correspond to the SQLite schema defined in migrations.rs.
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Kind of message payload. Closed set, stored as lowercase text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
    Voice,
    Video,
}

impl MessageType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "file" => Some(Self::File),
            "voice" => Some(Self::Voice),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
            Self::Voice => "voice",
            Self::Video => "video",
        }
    }
}

impl ToSql for MessageType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MessageType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        MessageType::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown message type '{s}'").into()))
    }
}

/// User record, with contacts and block list loaded from their side tables.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    /// Contact ids in insertion order
    pub contacts: Vec<String>,
    pub blocked_users: Vec<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_blocked(&self, user_id: &str) -> bool {
        self.blocked_users.iter().any(|id| id == user_id)
    }
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
}

/// Direct message. This is also the canonical wire shape pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub message_type: MessageType,
    pub attachment_url: Option<String>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub is_deleted: bool,
}

/// Fields supplied by the sender; id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub message_type: MessageType,
    pub attachment_url: Option<String>,
}
