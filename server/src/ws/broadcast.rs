use crate::ws::protocol::ServerEvent;
use super::ConnectionRegistry;

/// Broadcast an event to every connected user.
/// Returns the number of connections that accepted it.
pub fn broadcast_to_all(registry: &ConnectionRegistry, event: &ServerEvent) -> usize {
    registry
        .handles()
        .iter()
        .filter(|handle| handle.push(event.clone()))
        .count()
}

/// Send an event to a specific user's live connection.
/// Returns false if the user is not connected or the connection is gone.
pub fn send_to_user(registry: &ConnectionRegistry, user_id: &str, event: ServerEvent) -> bool {
    match registry.lookup(user_id) {
        Some(handle) => handle.push(event),
        None => false,
    }
}
