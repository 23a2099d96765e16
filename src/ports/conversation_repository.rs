//! Conversation repository port.
//!
//! The exchange coordinator is the only writer of conversation state, and it
//! holds the per-conversation lock while writing, so implementations only need
//! single-record atomicity.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::conversation::{
    ConversationRecord, ConversationStatus, EngagementCounters, EngagementDelta, MessageDraft,
    StoredMessage,
};
use crate::domain::foundation::{ConversationId, LearnerId, ModuleId};

/// Repository port for tutoring conversations and their messages.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Returns the open conversation for the pair, creating one in `New` if
    /// none is open.
    ///
    /// Implementations must not create two open conversations for the same
    /// learner and module, even when called concurrently.
    async fn get_or_create_conversation(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
    ) -> Result<ConversationRecord, StoreError>;

    /// Returns the open (`New` or `Active`) conversation for the pair, if any.
    async fn find_open_conversation(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
    ) -> Result<Option<ConversationRecord>, StoreError>;

    /// Find a conversation by its ID.
    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<ConversationRecord>, StoreError>;

    /// Appends a message. Messages are never edited or reordered.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the conversation doesn't exist
    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        draft: &MessageDraft,
    ) -> Result<StoredMessage, StoreError>;

    /// The last `limit` messages, oldest first.
    async fn get_recent_messages(
        &self,
        conversation_id: &ConversationId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError>;

    /// Adds `delta` to the running counters and returns the new totals.
    async fn bump_engagement_counters(
        &self,
        conversation_id: &ConversationId,
        delta: &EngagementDelta,
    ) -> Result<EngagementCounters, StoreError>;

    /// Persists a status change already validated by the caller.
    async fn update_status(
        &self,
        conversation_id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<(), StoreError>;
}
