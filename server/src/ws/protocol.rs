//! JSON wire protocol for the `/ws` connection.
//!
//! Client -> Server:
//! ```json
//! {"type": "SendMessage", "request_id": "1", "receiver_id": "...", "content": "hi"}
//! {"type": "MarkMessageAsRead", "message_id": "..."}
//! {"type": "Typing", "receiver_id": "..."}
//! {"type": "StopTyping", "receiver_id": "..."}
//! ```
//!
//! Server -> Client:
//! ```json
//! {"type": "ReceiveMessage", "message": {...}}
//! {"type": "MessageSent", "message": {...}}
//! {"type": "MessageRead", "message_id": "..."}
//! {"type": "UserTyping", "user_id": "..."}
//! {"type": "UserStoppedTyping", "user_id": "..."}
//! {"type": "UserStatusChanged", "user_id": "...", "is_online": true}
//! {"type": "Error", "request_id": "1", "code": 404, "message": "..."}
//! ```

use serde::{Deserialize, Serialize};

use crate::chat::hub::{Caller, Hub, SendMessageRequest};
use crate::db::models::Message;

/// Events pushed from the server to a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// New message, pushed to the receiver only.
    ReceiveMessage { message: Message },
    /// Canonical persisted copy, echoed to the sender's own connection.
    MessageSent { message: Message },
    /// Read receipt, pushed to the original sender.
    MessageRead { message_id: String },
    UserTyping { user_id: String },
    UserStoppedTyping { user_id: String },
    /// Presence change, broadcast to every connection.
    UserStatusChanged { user_id: String, is_online: bool },
    /// Operation failure, returned to the invoking connection only.
    Error {
        request_id: Option<String>,
        code: u16,
        message: String,
    },
}

/// One inbound frame: an optional correlation id plus the command.
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub command: ClientCommand,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    SendMessage(SendMessageRequest),
    MarkMessageAsRead { message_id: String },
    Typing { receiver_id: String },
    StopTyping { receiver_id: String },
}

/// Handle an incoming text frame: decode, dispatch to the hub, and report
/// any failure back to the caller's own connection.
pub async fn handle_text_message(text: &str, caller: &Caller, hub: &Hub) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode client frame");
            send_error(caller, None, 400, "Invalid message");
            return;
        }
    };

    let result = match frame.command {
        ClientCommand::SendMessage(request) => hub.send_message(caller, request).await.map(|_| ()),
        ClientCommand::MarkMessageAsRead { message_id } => hub
            .mark_message_as_read(caller, &message_id)
            .await
            .map(|_| ()),
        ClientCommand::Typing { receiver_id } => hub.typing(caller, &receiver_id).await,
        ClientCommand::StopTyping { receiver_id } => hub.stop_typing(caller, &receiver_id).await,
    };

    if let Err(err) = result {
        tracing::debug!(
            request_id = ?frame.request_id,
            error = %err,
            "Hub operation failed"
        );
        send_error(
            caller,
            frame.request_id,
            err.status_code().as_u16(),
            &err.client_message(),
        );
    }
}

fn send_error(caller: &Caller, request_id: Option<String>, code: u16, message: &str) {
    caller.reply(ServerEvent::Error {
        request_id,
        code,
        message: message.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::MessageType;

    #[test]
    fn decodes_send_message_with_request_id() {
        let frame: ClientFrame = serde_json::from_str(
            r#"{"type":"SendMessage","request_id":"7","receiver_id":"b","content":"hi","message_type":"image","attachment_url":"/x.png"}"#,
        )
        .unwrap();
        assert_eq!(frame.request_id.as_deref(), Some("7"));
        match frame.command {
            ClientCommand::SendMessage(req) => {
                assert_eq!(req.receiver_id, "b");
                assert_eq!(req.content, "hi");
                assert_eq!(req.message_type, MessageType::Image);
                assert_eq!(req.attachment_url.as_deref(), Some("/x.png"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn message_type_defaults_to_text() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"SendMessage","receiver_id":"b","content":"hi"}"#)
                .unwrap();
        match frame.command {
            ClientCommand::SendMessage(req) => assert_eq!(req.message_type, MessageType::Text),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn decodes_typing_commands() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"StopTyping","receiver_id":"b"}"#).unwrap();
        assert!(frame.request_id.is_none());
        assert!(matches!(
            frame.command,
            ClientCommand::StopTyping { ref receiver_id } if receiver_id == "b"
        ));
    }

    #[test]
    fn rejects_unknown_command() {
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"Shout"}"#).is_err());
    }

    #[test]
    fn status_event_wire_shape() {
        let json = serde_json::to_value(ServerEvent::UserStatusChanged {
            user_id: "u1".to_string(),
            is_online: true,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "UserStatusChanged", "user_id": "u1", "is_online": true})
        );
    }
}
