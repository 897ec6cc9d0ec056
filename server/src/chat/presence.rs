//! Connection lifecycle and online status.
//!
//! Connect and disconnect persist the user's online flag and broadcast a
//! `UserStatusChanged` event to every live connection.

use uuid::Uuid;

use crate::db;
use crate::ws::broadcast::broadcast_to_all;
use crate::ws::protocol::ServerEvent;
use crate::ws::ConnectionHandle;

use super::hub::Hub;

impl Hub {
    /// Register the connection for an authenticated user and announce it.
    /// A previous connection of the same user is replaced but not closed.
    pub async fn connect(&self, user_id: &str, handle: ConnectionHandle) {
        let connection_id = handle.id();
        if let Some(previous) = self.registry.register(user_id, handle) {
            tracing::info!(
                user_id = %user_id,
                previous = %previous.id(),
                connection_id = %connection_id,
                "Connection superseded"
            );
        }

        self.set_status(user_id, true).await;
    }

    /// Tear down a connection. Returns false if a newer connection had
    /// already taken over the user's entry; in that case nothing is
    /// persisted or broadcast.
    pub async fn disconnect(&self, user_id: &str, connection_id: Uuid) -> bool {
        if !self.registry.unregister_if(user_id, connection_id) {
            tracing::debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Stale disconnect ignored"
            );
            return false;
        }

        self.mark_offline(user_id).await;
        true
    }

    async fn set_status(&self, user_id: &str, is_online: bool) {
        self.persist_status(user_id, is_online).await;
        self.broadcast_status(user_id, is_online);
    }

    /// Persist and announce offline, unless a new connection registered
    /// while the write was in flight. The newer connect may have persisted
    /// `true` before this write landed, so the flag is restored.
    async fn mark_offline(&self, user_id: &str) {
        self.persist_status(user_id, false).await;

        if self.registry.is_online(user_id) {
            tracing::debug!(user_id = %user_id, "Reconnected during teardown, staying online");
            self.persist_status(user_id, true).await;
            return;
        }

        self.broadcast_status(user_id, false);
    }

    async fn persist_status(&self, user_id: &str, is_online: bool) {
        if let Err(e) = self.users.set_online(user_id, is_online, db::now()).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to persist online status");
        }
    }

    fn broadcast_status(&self, user_id: &str, is_online: bool) {
        let recipients = broadcast_to_all(
            &self.registry,
            &ServerEvent::UserStatusChanged {
                user_id: user_id.to_string(),
                is_online,
            },
        );
        tracing::info!(user_id = %user_id, is_online, recipients, "Presence changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::hub::tests::{create_user, drain, fixture};
    use crate::store::UserStore;

    #[tokio::test]
    async fn connect_marks_online_and_broadcasts() {
        let fx = fixture();
        let a = create_user(&fx.store, "alice").await;
        let b = create_user(&fx.store, "bob").await;

        let (bob_handle, mut bob_rx) = ConnectionHandle::channel();
        fx.hub.connect(&b, bob_handle).await;
        drain(&mut bob_rx);

        let (alice_handle, mut alice_rx) = ConnectionHandle::channel();
        fx.hub.connect(&a, alice_handle.clone()).await;

        let online = ServerEvent::UserStatusChanged {
            user_id: a.clone(),
            is_online: true,
        };
        assert_eq!(drain(&mut bob_rx), vec![online.clone()]);
        assert_eq!(drain(&mut alice_rx), vec![online]);
        assert_eq!(fx.hub.registry().lookup(&a), Some(alice_handle));

        let user = UserStore::find_by_id(&*fx.store, &a).await.unwrap().unwrap();
        assert!(user.is_online);
        assert!(user.last_seen.is_some());
    }

    #[tokio::test]
    async fn disconnect_marks_offline_and_broadcasts() {
        let fx = fixture();
        let a = create_user(&fx.store, "alice").await;
        let b = create_user(&fx.store, "bob").await;

        let (alice_handle, _alice_rx) = ConnectionHandle::channel();
        let (bob_handle, mut bob_rx) = ConnectionHandle::channel();
        fx.hub.connect(&a, alice_handle.clone()).await;
        fx.hub.connect(&b, bob_handle).await;
        drain(&mut bob_rx);

        assert!(fx.hub.disconnect(&a, alice_handle.id()).await);
        assert_eq!(
            drain(&mut bob_rx),
            vec![ServerEvent::UserStatusChanged {
                user_id: a.clone(),
                is_online: false,
            }]
        );
        assert!(!fx.hub.registry().is_online(&a));

        let user = UserStore::find_by_id(&*fx.store, &a).await.unwrap().unwrap();
        assert!(!user.is_online);
    }

    #[tokio::test]
    async fn stale_disconnect_leaves_newer_connection_online() {
        let fx = fixture();
        let a = create_user(&fx.store, "alice").await;

        let (first, _rx1) = ConnectionHandle::channel();
        let (second, mut rx2) = ConnectionHandle::channel();
        fx.hub.connect(&a, first.clone()).await;
        fx.hub.connect(&a, second.clone()).await;
        drain(&mut rx2);

        assert!(!fx.hub.disconnect(&a, first.id()).await);
        assert_eq!(fx.hub.registry().lookup(&a), Some(second));
        assert!(drain(&mut rx2).is_empty());

        let user = UserStore::find_by_id(&*fx.store, &a).await.unwrap().unwrap();
        assert!(user.is_online);
    }

    #[tokio::test]
    async fn reconnect_during_teardown_keeps_user_online() {
        let fx = fixture();
        let a = create_user(&fx.store, "alice").await;
        let b = create_user(&fx.store, "bob").await;

        let (bob_handle, mut bob_rx) = ConnectionHandle::channel();
        let (first, _rx1) = ConnectionHandle::channel();
        fx.hub.connect(&b, bob_handle).await;
        fx.hub.connect(&a, first.clone()).await;

        // The old socket leaves the registry, then a new one connects
        // before the offline write runs.
        assert!(fx.hub.registry().unregister_if(&a, first.id()));
        let (second, _rx2) = ConnectionHandle::channel();
        fx.hub.connect(&a, second).await;
        drain(&mut bob_rx);

        fx.hub.mark_offline(&a).await;

        assert!(drain(&mut bob_rx).is_empty());
        let user = UserStore::find_by_id(&*fx.store, &a).await.unwrap().unwrap();
        assert!(user.is_online);
    }
}
