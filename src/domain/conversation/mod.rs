//! Conversation module - tutoring conversation lifecycle, messages and
//! engagement counters.

mod message;
mod record;
mod state;

pub use message::{estimate_tokens, MessageDraft, MessageRole, StoredMessage};
pub use record::{ConversationRecord, EngagementCounters, EngagementDelta};
pub use state::ConversationStatus;
