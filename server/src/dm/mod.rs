//! REST surface for direct messages and conversations.

pub mod conversations;
pub mod messages;

use crate::chat::Caller;
use crate::state::AppState;

/// Caller for a REST request: the token's user plus their live socket, so
/// hub echoes reach an open client.
pub(crate) fn rest_caller(state: &AppState, user_id: &str) -> Caller {
    Caller::new(user_id, state.connections.lookup(user_id))
}
