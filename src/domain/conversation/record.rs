//! Conversation record and engagement counters.

use serde::{Deserialize, Serialize};

use super::ConversationStatus;
use crate::domain::foundation::{
    ConversationId, LearnerId, ModuleId, StateMachine, Timestamp, ValidationError,
};

/// Running engagement counters for a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngagementCounters {
    pub questions_asked: u32,
    pub insights_gained: u32,
    pub learner_messages: u32,
}

impl EngagementCounters {
    /// Adds a delta, saturating instead of overflowing.
    pub fn apply(&mut self, delta: &EngagementDelta) {
        self.questions_asked = self.questions_asked.saturating_add(delta.questions_asked);
        self.insights_gained = self.insights_gained.saturating_add(delta.insights_gained);
        self.learner_messages = self.learner_messages.saturating_add(delta.learner_messages);
    }
}

/// Increment produced by one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngagementDelta {
    pub questions_asked: u32,
    pub insights_gained: u32,
    pub learner_messages: u32,
}

impl EngagementDelta {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One conversation between a learner and the tutor within a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: ConversationId,
    pub learner_id: LearnerId,
    pub module_id: ModuleId,
    pub status: ConversationStatus,
    pub counters: EngagementCounters,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ConversationRecord {
    /// Starts a fresh conversation in `New`.
    pub fn start(learner_id: LearnerId, module_id: ModuleId) -> Self {
        let now = Timestamp::now();
        Self {
            id: ConversationId::new(),
            learner_id,
            module_id,
            status: ConversationStatus::New,
            counters: EngagementCounters::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.accepts_messages()
    }

    /// Moves to `target`, rejecting illegal transitions.
    pub fn transition(&mut self, target: ConversationStatus) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(target)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}
