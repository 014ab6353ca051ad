//! Per-conversation session state and its observer channel.

pub mod conversation;
pub mod events;

pub use conversation::ConversationSession;
pub use events::SessionEvent;
