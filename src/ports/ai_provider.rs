//! AI Provider Port - the language model that writes tutor replies.
//!
//! One exchange is one non-streaming completion. The assembled context is
//! the system prompt, recent stored turns are chat history, and the
//! learner's current message is the final user turn.
//!
//! # Example
//!
//! ```ignore
//! struct CannedProvider;
//!
//! #[async_trait]
//! impl AIProvider for CannedProvider {
//!     async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
//!         Ok(CompletionResponse {
//!             content: "What do you think?".to_string(),
//!             usage: TokenUsage::default(),
//!             model: "canned".to_string(),
//!             finish_reason: FinishReason::Stop,
//!         })
//!     }
//!
//!     fn provider_info(&self) -> ProviderInfo {
//!         ProviderInfo::new("canned", "canned", 4096)
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::conversation::{MessageRole, StoredMessage};
use crate::domain::foundation::{ConversationId, ExchangeId, LearnerId};

/// Bound applied when the caller does not set one.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Produces one reply.
    ///
    /// Implementations should honor `request.timeout`; the exchange
    /// coordinator also bounds the whole call and treats any error as a
    /// reason to fall back.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError>;

    fn provider_info(&self) -> ProviderInfo;
}

/// Everything the provider sees for one exchange.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Prior turns, then the current learner message.
    pub turns: Vec<ChatTurn>,
    /// Assembled context.
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    /// 0.0 to 2.0.
    pub temperature: Option<f32>,
    pub timeout: Duration,
    pub metadata: RequestMetadata,
}

impl CompletionRequest {
    pub fn new(metadata: RequestMetadata) -> Self {
        Self {
            turns: Vec::new(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            metadata,
        }
    }

    pub fn with_turn(mut self, role: ChatRole, content: impl Into<String>) -> Self {
        self.turns.push(ChatTurn {
            role,
            content: content.into(),
        });
        self
    }

    /// Appends stored conversation messages as history, oldest first.
    pub fn with_history<'a>(mut self, messages: impl IntoIterator<Item = &'a StoredMessage>) -> Self {
        self.turns.extend(messages.into_iter().map(|m| ChatTurn {
            role: m.role.into(),
            content: m.text.clone(),
        }));
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The learner message this request answers.
    pub fn last_user_message(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == ChatRole::User)
            .map(|t| t.content.as_str())
    }
}

/// One turn in the provider's chat format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl From<MessageRole> for ChatRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::Learner => ChatRole::User,
            MessageRole::Tutor => ChatRole::Assistant,
        }
    }
}

/// Correlation ids carried into provider logs.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    pub learner_id: LearnerId,
    pub conversation_id: ConversationId,
    pub exchange_id: ExchangeId,
}

impl RequestMetadata {
    pub fn new(
        learner_id: LearnerId,
        conversation_id: ConversationId,
        exchange_id: ExchangeId,
    ) -> Self {
        Self {
            learner_id,
            conversation_id,
            exchange_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: TokenUsage,
    /// Model that actually answered.
    pub model: String,
    pub finish_reason: FinishReason,
}

/// Token accounting for one reply. All zero for fallback replies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    /// Cut at `max_tokens`; the partial reply is still used.
    Length,
    ContentFilter,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
    pub max_context_tokens: u32,
}

impl ProviderInfo {
    pub fn new(name: impl Into<String>, model: impl Into<String>, max_context_tokens: u32) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            max_context_tokens,
        }
    }
}

/// Why a completion failed. Every variant leads to a fallback reply.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    #[error("content filtered: {reason}")]
    ContentFiltered { reason: String },

    #[error("provider unavailable: {message}")]
    Unavailable { message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl AIError {
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    pub fn content_filtered(reason: impl Into<String>) -> Self {
        Self::ContentFiltered {
            reason: reason.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Worth another attempt inside the adapter's retry loop.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AIError::RateLimited { .. }
                | AIError::Unavailable { .. }
                | AIError::Network(_)
                | AIError::Timeout { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AIError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::MessageDraft;
    use crate::domain::foundation::Timestamp;

    fn metadata() -> RequestMetadata {
        RequestMetadata::new(
            LearnerId::new("test-learner").unwrap(),
            ConversationId::new(),
            ExchangeId::new(),
        )
    }

    mod completion_request {
        use super::*;

        #[test]
        fn builder_sets_fields() {
            let request = CompletionRequest::new(metadata())
                .with_system_prompt("context")
                .with_turn(ChatRole::User, "Hi")
                .with_turn(ChatRole::Assistant, "What brings you here?")
                .with_turn(ChatRole::User, "Feedback")
                .with_max_tokens(500)
                .with_temperature(0.7)
                .with_timeout(Duration::from_millis(50));

            assert_eq!(request.system_prompt.as_deref(), Some("context"));
            assert_eq!(request.turns.len(), 3);
            assert_eq!(request.max_tokens, Some(500));
            assert_eq!(request.temperature, Some(0.7));
            assert_eq!(request.timeout, Duration::from_millis(50));
            assert_eq!(request.last_user_message(), Some("Feedback"));
        }

        #[test]
        fn history_maps_learner_and_tutor_roles() {
            let conversation_id = ConversationId::new();
            let stored = vec![
                MessageDraft::learner("Is tone part of the message?")
                    .into_stored(conversation_id, Timestamp::now()),
                MessageDraft {
                    role: MessageRole::Tutor,
                    text: "What makes you think it might be?".to_string(),
                    token_count: 8,
                    analysis: None,
                }
                .into_stored(conversation_id, Timestamp::now()),
            ];

            let request = CompletionRequest::new(metadata())
                .with_history(&stored)
                .with_turn(ChatRole::User, "How it sounds");

            let roles: Vec<ChatRole> = request.turns.iter().map(|t| t.role).collect();
            assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant, ChatRole::User]);
            assert_eq!(request.last_user_message(), Some("How it sounds"));
        }

        #[test]
        fn default_timeout_is_thirty_seconds() {
            let request = CompletionRequest::new(metadata());
            assert_eq!(request.timeout, Duration::from_secs(30));
            assert!(request.last_user_message().is_none());
        }
    }

    mod ai_error {
        use super::*;

        #[test]
        fn transient_errors_are_retryable() {
            assert!(AIError::rate_limited(30).is_retryable());
            assert!(AIError::unavailable("down").is_retryable());
            assert!(AIError::network("reset").is_retryable());
            assert!(AIError::timeout(Duration::from_secs(1)).is_retryable());
        }

        #[test]
        fn permanent_errors_are_not_retryable() {
            assert!(!AIError::AuthenticationFailed.is_retryable());
            assert!(!AIError::parse("bad json").is_retryable());
            assert!(!AIError::content_filtered("policy").is_retryable());
            assert!(!AIError::InvalidRequest("bad".into()).is_retryable());
        }

        #[test]
        fn timeout_displays_millis() {
            let err = AIError::timeout(Duration::from_millis(1500));
            assert!(err.is_timeout());
            assert_eq!(err.to_string(), "request timed out after 1500ms");
        }
    }

    #[test]
    fn token_usage_totals() {
        assert_eq!(TokenUsage::new(100, 50).total_tokens, 150);
        assert_eq!(TokenUsage::zero(), TokenUsage::default());
    }

    #[test]
    fn ai_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn AIProvider) {}
    }
}
