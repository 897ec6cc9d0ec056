//! Message delivery: persist, then push to the receiver and echo to the sender.

use crate::db::models::{Message, NewMessage};
use crate::ws::protocol::ServerEvent;

use super::hub::{Caller, Hub, HubError, SendMessageRequest, MAX_CONTENT_LENGTH};

impl Hub {
    /// Persist a message from the caller and fan it out.
    ///
    /// The receiver gets `ReceiveMessage` if online; the caller's own
    /// connection always gets `MessageSent` with the canonical record.
    pub async fn send_message(
        &self,
        caller: &Caller,
        request: SendMessageRequest,
    ) -> Result<Message, HubError> {
        let sender_id = caller.user_id()?;
        if !self.users.exists(sender_id).await? {
            return Err(HubError::Unauthenticated);
        }

        validate(sender_id, &request)?;

        let receiver = self
            .users
            .find_by_id(&request.receiver_id)
            .await?
            .filter(|user| !user.is_deleted)
            .ok_or(HubError::PeerNotFound)?;

        if receiver.has_blocked(sender_id) {
            return Err(HubError::Forbidden);
        }

        let message = self
            .messages
            .insert(NewMessage {
                sender_id: sender_id.to_string(),
                receiver_id: receiver.id,
                content: request.content,
                message_type: request.message_type,
                attachment_url: request.attachment_url,
            })
            .await?;

        tracing::debug!(
            message_id = %message.id,
            sender_id = %message.sender_id,
            receiver_id = %message.receiver_id,
            "Message persisted"
        );

        self.push_to_user(
            &message.receiver_id,
            ServerEvent::ReceiveMessage {
                message: message.clone(),
            },
        );
        caller.reply(ServerEvent::MessageSent {
            message: message.clone(),
        });

        Ok(message)
    }

    /// Soft-delete one message. Either participant may delete it.
    pub async fn delete_message(&self, caller: &Caller, message_id: &str) -> Result<(), HubError> {
        let user_id = caller.user_id()?;

        let message = self
            .messages
            .find_by_id(message_id)
            .await?
            .ok_or(HubError::NotFound)?;

        if message.sender_id != user_id && message.receiver_id != user_id {
            return Err(HubError::Forbidden);
        }

        if !self.messages.soft_delete(message_id).await? {
            return Err(HubError::NotFound);
        }
        Ok(())
    }

    /// Soft-delete every message between the caller and `peer_id`, for both
    /// sides. Returns the number of messages removed.
    pub async fn delete_conversation(
        &self,
        caller: &Caller,
        peer_id: &str,
    ) -> Result<usize, HubError> {
        let user_id = caller.user_id()?;

        let messages = self
            .messages
            .find_by_participants(user_id, peer_id, 0, None)
            .await?;

        let mut deleted = 0;
        for message in &messages {
            if self.messages.soft_delete(&message.id).await? {
                deleted += 1;
            }
        }

        tracing::info!(
            user_id = %user_id,
            peer_id = %peer_id,
            deleted,
            "Conversation deleted"
        );
        Ok(deleted)
    }
}

fn validate(sender_id: &str, request: &SendMessageRequest) -> Result<(), HubError> {
    if request.receiver_id.is_empty() {
        return Err(HubError::Validation("receiver_id is required".to_string()));
    }
    if request.receiver_id == sender_id {
        return Err(HubError::Validation(
            "cannot send a message to yourself".to_string(),
        ));
    }

    let has_attachment = request
        .attachment_url
        .as_deref()
        .is_some_and(|url| !url.trim().is_empty());
    if request.content.trim().is_empty() && !has_attachment {
        return Err(HubError::Validation("content is required".to_string()));
    }
    if request.content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(HubError::Validation(format!(
            "content exceeds {MAX_CONTENT_LENGTH} characters"
        )));
    }
    Ok(())
}
