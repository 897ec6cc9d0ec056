pub mod actor;
pub mod broadcast;
pub mod handler;
pub mod protocol;

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::ws::protocol::ServerEvent;

/// Sender half of a connection's event channel.
pub type ConnectionSender = mpsc::UnboundedSender<ServerEvent>;

/// Handle to one live WebSocket connection.
/// Cloning is cheap; pushing never blocks. Two handles are equal when they
/// refer to the same connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    sender: ConnectionSender,
}

impl ConnectionHandle {
    pub fn new(sender: ConnectionSender) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
        }
    }

    /// Create a handle together with the receiver its events arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Enqueue an event for this connection. Returns false if the connection
    /// is already gone; callers treat that as a delivery miss.
    pub fn push(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

/// Connection registry: the live connection of every connected user.
/// At most one handle per user; a new registration replaces the previous
/// one without closing it. Process-local.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<DashMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the handle for a user. Returns the replaced handle.
    pub fn register(&self, user_id: &str, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let previous = self.inner.insert(user_id.to_string(), handle);
        tracing::debug!(
            user_id = %user_id,
            replaced = previous.is_some(),
            "Connection registered"
        );
        previous
    }

    /// Remove the user's entry if present.
    pub fn unregister(&self, user_id: &str) -> Option<ConnectionHandle> {
        let removed = self.inner.remove(user_id).map(|(_, handle)| handle);
        tracing::debug!(user_id = %user_id, removed = removed.is_some(), "Connection unregistered");
        removed
    }

    /// Remove the user's entry only if it still belongs to `connection_id`.
    /// Returns false when a newer connection has taken over (or none exists).
    pub fn unregister_if(&self, user_id: &str, connection_id: Uuid) -> bool {
        self.inner
            .remove_if(user_id, |_, handle| handle.id == connection_id)
            .is_some()
    }

    pub fn lookup(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.inner.get(user_id).map(|entry| entry.value().clone())
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.inner.contains_key(user_id)
    }

    /// Snapshot of all handles. Broadcasting iterates the snapshot so no
    /// shard lock is held while pushing.
    pub fn handles(&self) -> Vec<ConnectionHandle> {
        self.inner.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn online_user_ids(&self) -> Vec<String> {
        self.inner.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_follows_register_and_unregister() {
        let registry = ConnectionRegistry::new();
        let (handle, _rx) = ConnectionHandle::channel();

        assert!(registry.lookup("u1").is_none());
        registry.register("u1", handle.clone());
        assert_eq!(registry.lookup("u1"), Some(handle.clone()));

        registry.unregister("u1");
        assert!(registry.lookup("u1").is_none());

        registry.register("u1", handle.clone());
        assert_eq!(registry.lookup("u1"), Some(handle));
    }

    #[test]
    fn unregister_absent_user_is_noop() {
        let registry = ConnectionRegistry::new();
        assert!(registry.unregister("nobody").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn last_registration_wins() {
        let registry = ConnectionRegistry::new();
        let (h1, _rx1) = ConnectionHandle::channel();
        let (h2, _rx2) = ConnectionHandle::channel();

        assert!(registry.register("u1", h1.clone()).is_none());
        let replaced = registry.register("u1", h2.clone());

        assert_eq!(replaced, Some(h1.clone()));
        assert_eq!(registry.lookup("u1"), Some(h2));
        assert_eq!(registry.len(), 1);
        // The replaced handle is not closed.
        assert!(!h1.is_closed());
    }

    #[test]
    fn stale_unregister_keeps_newer_connection() {
        let registry = ConnectionRegistry::new();
        let (h1, _rx1) = ConnectionHandle::channel();
        let (h2, _rx2) = ConnectionHandle::channel();

        registry.register("u1", h1.clone());
        registry.register("u1", h2.clone());

        assert!(!registry.unregister_if("u1", h1.id()));
        assert_eq!(registry.lookup("u1"), Some(h2.clone()));

        assert!(registry.unregister_if("u1", h2.id()));
        assert!(registry.lookup("u1").is_none());
    }

    #[test]
    fn push_to_dropped_receiver_reports_miss() {
        let (handle, rx) = ConnectionHandle::channel();
        drop(rx);
        assert!(!handle.push(ServerEvent::UserTyping {
            user_id: "u2".to_string()
        }));
    }

    #[tokio::test]
    async fn concurrent_registrations_leave_one_entry_per_user() {
        let registry = ConnectionRegistry::new();
        let mut tasks = Vec::new();
        for i in 0..32 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let (handle, rx) = ConnectionHandle::channel();
                let user = format!("user-{}", i % 4);
                registry.register(&user, handle.clone());
                if i % 2 == 0 {
                    registry.unregister_if(&user, handle.id());
                }
                drop(rx);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert!(registry.len() <= 4);
        let mut ids = registry.online_user_ids();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), registry.len());
    }
}
