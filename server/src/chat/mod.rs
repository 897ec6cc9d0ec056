pub mod delivery;
pub mod hub;
pub mod inbox;
pub mod presence;

pub use hub::{Caller, Hub, HubError, SendMessageRequest};
pub use inbox::ConversationSummary;
