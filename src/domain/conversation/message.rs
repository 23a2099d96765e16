//! Conversation messages.
//!
//! Messages are append-only: once stored they are never edited or reordered.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::compliance::ComplianceAnalysis;
use crate::domain::foundation::{ConversationId, MessageId, Timestamp, ValidationError};

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    Learner,
    Tutor,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::Learner => "learner",
            MessageRole::Tutor => "tutor",
        }
    }

    /// Label used when rendering the message into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            MessageRole::Learner => "Learner",
            MessageRole::Tutor => "Tutor",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "learner" => Ok(MessageRole::Learner),
            "tutor" => Ok(MessageRole::Tutor),
            other => Err(ValidationError::invalid_format(
                "role",
                format!("unknown role '{}'", other),
            )),
        }
    }
}

/// Rough token estimate (about four characters per token).
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count() as u32;
    chars.div_ceil(4)
}

/// A message about to be appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub role: MessageRole,
    pub text: String,
    pub token_count: u32,
    /// Set on tutor replies only.
    pub analysis: Option<ComplianceAnalysis>,
}

impl MessageDraft {
    pub fn learner(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            role: MessageRole::Learner,
            token_count: estimate_tokens(&text),
            text,
            analysis: None,
        }
    }

    /// Tutor reply; `token_count` is the provider-reported completion size
    /// when known.
    pub fn tutor(text: impl Into<String>, token_count: Option<u32>, analysis: ComplianceAnalysis) -> Self {
        let text = text.into();
        Self {
            role: MessageRole::Tutor,
            token_count: token_count.unwrap_or_else(|| estimate_tokens(&text)),
            text,
            analysis: Some(analysis),
        }
    }

    /// Stamps the draft into a stored message.
    pub fn into_stored(self, conversation_id: ConversationId, now: Timestamp) -> StoredMessage {
        StoredMessage {
            id: MessageId::new(),
            conversation_id,
            role: self.role,
            text: self.text,
            token_count: self.token_count,
            analysis: self.analysis,
            created_at: now,
        }
    }
}

/// A persisted conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: MessageRole,
    pub text: String,
    pub token_count: u32,
    pub analysis: Option<ComplianceAnalysis>,
    pub created_at: Timestamp,
}

impl StoredMessage {
    /// `Role: text` line for the conversation layer.
    pub fn render_line(&self) -> String {
        format!("{}: {}", self.role.label(), self.text)
    }
}
