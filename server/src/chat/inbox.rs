//! Conversation aggregation: one summary row per peer, derived from the
//! flat message log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::store::{MessageStore, StoreError, UserStore};

use super::hub::{Caller, Hub, HubError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSummary {
    pub user_id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    /// Unread messages from this peer to the requester.
    pub unread_count: u64,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Build the requester's inbox, most recent conversation first.
///
/// `window` limits how many recent messages are scanned for peers; `None`
/// scans the full history.
pub async fn aggregate_conversations(
    messages: &dyn MessageStore,
    users: &dyn UserStore,
    user_id: &str,
    window: Option<usize>,
) -> Result<Vec<ConversationSummary>, StoreError> {
    let recent = messages.find_recent_for_user(user_id, window).await?;

    let mut seen = HashSet::new();
    let mut summaries = Vec::new();

    for message in recent {
        let peer_id = if message.sender_id == user_id {
            message.receiver_id.clone()
        } else {
            message.sender_id.clone()
        };
        if !seen.insert(peer_id.clone()) {
            continue;
        }

        let peer = match users.find_by_id(&peer_id).await? {
            Some(peer) if !peer.is_deleted => peer,
            _ => continue,
        };

        let unread_count = messages.count_unread_from(&peer_id, user_id).await?;

        summaries.push(ConversationSummary {
            user_id: peer.id,
            username: peer.username,
            first_name: peer.first_name,
            last_name: peer.last_name,
            profile_picture: peer.profile_picture,
            last_message: message.content,
            last_message_time: message.created_at,
            unread_count,
            is_online: peer.is_online,
            last_seen: peer.last_seen,
        });
    }

    summaries.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
    Ok(summaries)
}

impl Hub {
    pub async fn conversations(
        &self,
        caller: &Caller,
    ) -> Result<Vec<ConversationSummary>, HubError> {
        let user_id = caller.user_id()?;
        let summaries = aggregate_conversations(
            self.messages.as_ref(),
            self.users.as_ref(),
            user_id,
            self.conversation_window,
        )
        .await?;
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::hub::tests::{connect, create_user, drain, fixture, text_to};
    use crate::ws::protocol::ServerEvent;

    #[tokio::test]
    async fn one_row_per_peer_with_per_peer_unread() {
        let fx = fixture();
        let u = create_user(&fx.store, "user").await;
        let x = create_user(&fx.store, "xavier").await;
        let y = create_user(&fx.store, "yolanda").await;
        let (user, _u_rx) = connect(&fx.hub, &u);
        let (xavier, _x_rx) = connect(&fx.hub, &x);
        let (yolanda, _y_rx) = connect(&fx.hub, &y);

        fx.hub.send_message(&xavier, text_to(&u, "x1")).await.unwrap();
        fx.hub.send_message(&user, text_to(&y, "u1")).await.unwrap();
        fx.hub.send_message(&xavier, text_to(&u, "x2")).await.unwrap();
        fx.hub.send_message(&yolanda, text_to(&u, "y1")).await.unwrap();

        let rows = fx.hub.conversations(&user).await.unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].user_id, y);
        assert_eq!(rows[0].last_message, "y1");
        assert_eq!(rows[0].unread_count, 1);
        assert!(rows[0].is_online);

        assert_eq!(rows[1].user_id, x);
        assert_eq!(rows[1].last_message, "x2");
        assert_eq!(rows[1].unread_count, 2);
        assert!(rows[0].last_message_time >= rows[1].last_message_time);
    }

    #[tokio::test]
    async fn deleted_conversation_disappears_for_both_sides() {
        let fx = fixture();
        let a = create_user(&fx.store, "alice").await;
        let b = create_user(&fx.store, "bob").await;
        let (alice, _a_rx) = connect(&fx.hub, &a);
        let (bob, _b_rx) = connect(&fx.hub, &b);

        fx.hub.send_message(&alice, text_to(&b, "hi")).await.unwrap();
        fx.hub.send_message(&bob, text_to(&a, "hey")).await.unwrap();
        fx.hub.delete_conversation(&alice, &b).await.unwrap();

        assert!(fx.hub.conversations(&alice).await.unwrap().is_empty());
        assert!(fx.hub.conversations(&bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleted_peer_is_skipped() {
        let fx = fixture();
        let a = create_user(&fx.store, "alice").await;
        let b = create_user(&fx.store, "bob").await;
        let c = create_user(&fx.store, "carol").await;
        let (alice, _a_rx) = connect(&fx.hub, &a);

        fx.hub.send_message(&alice, text_to(&b, "1")).await.unwrap();
        fx.hub.send_message(&alice, text_to(&c, "2")).await.unwrap();
        fx.store.soft_delete_user(&c).await.unwrap();

        let rows = fx.hub.conversations(&alice).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, b);
    }

    #[tokio::test]
    async fn window_limits_discovered_peers() {
        let fx = fixture();
        let a = create_user(&fx.store, "alice").await;
        let b = create_user(&fx.store, "bob").await;
        let c = create_user(&fx.store, "carol").await;
        let (alice, _a_rx) = connect(&fx.hub, &a);

        fx.hub.send_message(&alice, text_to(&b, "old")).await.unwrap();
        for i in 0..3 {
            fx.hub
                .send_message(&alice, text_to(&c, &format!("new {i}")))
                .await
                .unwrap();
        }

        let full = fx.hub.conversations(&alice).await.unwrap();
        assert_eq!(full.len(), 2);

        let windowed = fx.hub.clone().with_conversation_window(Some(2));
        let rows = windowed.conversations(&alice).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, c);
    }

    #[tokio::test]
    async fn hi_from_a_to_b_end_to_end() {
        let fx = fixture();
        let a = create_user(&fx.store, "alice").await;
        let b = create_user(&fx.store, "bob").await;
        let (alice, mut alice_rx) = connect(&fx.hub, &a);
        let (bob, mut bob_rx) = connect(&fx.hub, &b);

        let message = fx.hub.send_message(&alice, text_to(&b, "hi")).await.unwrap();

        let received = drain(&mut bob_rx);
        let sent = drain(&mut alice_rx);
        assert_eq!(received.len(), 1);
        assert_eq!(sent.len(), 1);
        match (&received[0], &sent[0]) {
            (
                ServerEvent::ReceiveMessage { message: r },
                ServerEvent::MessageSent { message: s },
            ) => {
                assert_eq!(r.id, s.id);
                assert_eq!(r.id, message.id);
            }
            other => panic!("unexpected events {other:?}"),
        }

        let bob_rows = fx.hub.conversations(&bob).await.unwrap();
        assert_eq!(bob_rows.len(), 1);
        assert_eq!(bob_rows[0].user_id, a);
        assert_eq!(bob_rows[0].last_message, "hi");
        assert_eq!(bob_rows[0].unread_count, 1);

        fx.hub.mark_message_as_read(&bob, &message.id).await.unwrap();
        assert_eq!(
            drain(&mut alice_rx),
            vec![ServerEvent::MessageRead {
                message_id: message.id.clone()
            }]
        );
        let bob_rows = fx.hub.conversations(&bob).await.unwrap();
        assert_eq!(bob_rows[0].unread_count, 0);

        let alice_rows = fx.hub.conversations(&alice).await.unwrap();
        assert_eq!(alice_rows[0].user_id, b);
        assert_eq!(alice_rows[0].unread_count, 0);
    }
}
