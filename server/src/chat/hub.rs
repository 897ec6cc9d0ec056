//! Presence and fan-out hub.
//!
//! The hub binds connection lifecycle and message events to the connection
//! registry. Every operation persists first and pushes second; pushes are
//! fire-and-forget and never fail the operation that triggered them.

use axum::http::StatusCode;
use serde::Deserialize;
use std::sync::Arc;

use crate::db;
use crate::db::models::{Message, MessageType};
use crate::store::{MessageStore, StoreError, UserStore};
use crate::ws::broadcast::send_to_user;
use crate::ws::protocol::ServerEvent;
use crate::ws::{ConnectionHandle, ConnectionRegistry};

/// Maximum message content length (chars).
pub const MAX_CONTENT_LENGTH: usize = 4000;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("receiver not found")]
    PeerNotFound,
    #[error("message not found")]
    NotFound,
    #[error("not allowed")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HubError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::PeerNotFound | Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show the caller; store failures are not described.
    pub fn client_message(&self) -> String {
        match self {
            Self::Store(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<HubError> for (StatusCode, String) {
    fn from(err: HubError) -> Self {
        match err {
            HubError::Store(store) => store.into(),
            other => (other.status_code(), other.to_string()),
        }
    }
}

/// Body of a send, over the socket or REST.
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub attachment_url: Option<String>,
}

/// Identity and connection of whoever invoked a hub operation.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    user_id: Option<String>,
    connection: Option<ConnectionHandle>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, connection: Option<ConnectionHandle>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            connection,
        }
    }

    /// A caller whose identity could not be verified.
    pub fn anonymous(connection: Option<ConnectionHandle>) -> Self {
        Self {
            user_id: None,
            connection,
        }
    }

    pub fn user_id(&self) -> Result<&str, HubError> {
        self.user_id.as_deref().ok_or(HubError::Unauthenticated)
    }

    /// Push an event to the caller's own connection, if it has one.
    pub fn reply(&self, event: ServerEvent) -> bool {
        match &self.connection {
            Some(handle) => handle.push(event),
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct Hub {
    pub(super) registry: ConnectionRegistry,
    pub(super) messages: Arc<dyn MessageStore>,
    pub(super) users: Arc<dyn UserStore>,
    pub(super) conversation_window: Option<usize>,
}

impl Hub {
    pub fn new(
        registry: ConnectionRegistry,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            registry,
            messages,
            users,
            conversation_window: None,
        }
    }

    /// Limit conversation discovery to the most recent `window` messages.
    pub fn with_conversation_window(mut self, window: Option<usize>) -> Self {
        self.conversation_window = window;
        self
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub(super) fn push_to_user(&self, user_id: &str, event: ServerEvent) -> bool {
        let delivered = send_to_user(&self.registry, user_id, event);
        if !delivered {
            tracing::debug!(user_id = %user_id, "Delivery miss, user not connected");
        }
        delivered
    }

    /// Mark a message read on behalf of its receiver and notify the sender.
    pub async fn mark_message_as_read(
        &self,
        caller: &Caller,
        message_id: &str,
    ) -> Result<Message, HubError> {
        let user_id = caller.user_id()?;

        let message = self
            .messages
            .find_by_id(message_id)
            .await?
            .ok_or(HubError::NotFound)?;

        if message.receiver_id != user_id {
            return Err(HubError::Forbidden);
        }

        let updated = self
            .messages
            .mark_read(message_id, db::now())
            .await?
            .ok_or(HubError::NotFound)?;

        self.push_to_user(
            &updated.sender_id,
            ServerEvent::MessageRead {
                message_id: updated.id.clone(),
            },
        );

        Ok(updated)
    }

    /// Mark everything `peer_id` sent to the caller as read. Returns the ids
    /// that changed; the peer gets one `MessageRead` per id.
    pub async fn mark_all_as_read(
        &self,
        caller: &Caller,
        peer_id: &str,
    ) -> Result<Vec<String>, HubError> {
        let user_id = caller.user_id()?;

        let ids = self
            .messages
            .mark_all_read(peer_id, user_id, db::now())
            .await?;

        if let Some(handle) = self.registry.lookup(peer_id) {
            for id in &ids {
                handle.push(ServerEvent::MessageRead {
                    message_id: id.clone(),
                });
            }
        }

        Ok(ids)
    }

    pub async fn typing(&self, caller: &Caller, receiver_id: &str) -> Result<(), HubError> {
        let user_id = caller.user_id()?;
        self.push_to_user(
            receiver_id,
            ServerEvent::UserTyping {
                user_id: user_id.to_string(),
            },
        );
        Ok(())
    }

    pub async fn stop_typing(&self, caller: &Caller, receiver_id: &str) -> Result<(), HubError> {
        let user_id = caller.user_id()?;
        self.push_to_user(
            receiver_id,
            ServerEvent::UserStoppedTyping {
                user_id: user_id.to_string(),
            },
        );
        Ok(())
    }
}
