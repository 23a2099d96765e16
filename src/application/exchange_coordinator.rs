//! Exchange Coordinator: one learner-message → tutor-reply round trip.
//!
//! Holds the per-conversation lock for the whole exchange. Provider failures
//! fall back to the local question generator; persistence failures are
//! retried once and then logged. Only a missing module aborts an exchange.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::{AssemblyError, ContextAssembler, ConversationLocks};
use crate::domain::compliance::{analyze, shows_insight, ComplianceAnalysis};
use crate::domain::context::{ContextConfig, ContextMetrics, LayerKind, LayerSources};
use crate::domain::conversation::{
    ConversationRecord, ConversationStatus, EngagementDelta, MessageDraft, MessageRole,
    StoredMessage,
};
use crate::domain::fallback::FallbackGenerator;
use crate::domain::foundation::{ConversationId, ExchangeId, ModuleId, ValidationError};
use crate::domain::learning::{
    blend_confidence, KnowledgeSummaryUpdate, INITIAL_CONFIDENCE, REFRESHED_RETENTION,
};
use crate::ports::{
    AIError, AIProvider, ChatRole, CompletionRequest, ConversationRepository,
    KnowledgeRepository, ProfileReader, RequestMetadata, StoreError, TokenUsage,
};

/// Longest learner-message excerpt stored in a knowledge summary.
const SUMMARY_SNIPPET_CHARS: usize = 120;

/// Tunables for exchanges, injected at construction.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub provider_timeout: Duration,
    pub persistence_retry_backoff: Duration,
    pub max_message_chars: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Stored turns sent to the provider as chat history.
    pub history_messages: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(30),
            persistence_retry_backoff: Duration::from_millis(250),
            max_message_chars: 2000,
            temperature: 0.7,
            max_tokens: 500,
            history_messages: 6,
        }
    }
}

/// Errors surfaced by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] ValidationError),

    #[error("Module not found: {0}")]
    ModuleNotFound(ModuleId),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    #[error("Conversation is finalized: {0}")]
    ConversationFinalized(ConversationId),

    #[error("Conversation store error: {0}")]
    Store(StoreError),

    #[error("Exchange cancelled")]
    Cancelled,
}

/// What the learner gets back from one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeOutcome {
    pub exchange_id: ExchangeId,
    pub conversation_id: ConversationId,
    pub reply: String,
    pub analysis: ComplianceAnalysis,
    pub usage: TokenUsage,
    pub context_size_bytes: usize,
    pub layers_active: u8,
    /// Absent when assembly failed and the reply fell back.
    pub context_metrics: Option<ContextMetrics>,
    /// Reply came from the local fallback generator.
    pub degraded: bool,
    /// False when the tutor message could not be stored after retrying.
    pub reply_persisted: bool,
}

/// Why the provider reply was not used.
enum ProviderFailure {
    Cancelled,
    Failed(AIError),
}

/// Orchestrates exchanges and owns the per-conversation locks.
pub struct ExchangeCoordinator {
    assembler: ContextAssembler,
    conversations: Arc<dyn ConversationRepository>,
    knowledge: Arc<dyn KnowledgeRepository>,
    provider: Arc<dyn AIProvider>,
    fallback: FallbackGenerator,
    locks: ConversationLocks,
    config: ExchangeConfig,
}

impl ExchangeCoordinator {
    pub fn new(
        profiles: Arc<dyn ProfileReader>,
        conversations: Arc<dyn ConversationRepository>,
        knowledge: Arc<dyn KnowledgeRepository>,
        provider: Arc<dyn AIProvider>,
        context_config: ContextConfig,
        config: ExchangeConfig,
    ) -> Self {
        let assembler = ContextAssembler::new(
            profiles,
            Arc::clone(&conversations),
            Arc::clone(&knowledge),
            context_config,
        );
        Self {
            assembler,
            conversations,
            knowledge,
            provider,
            fallback: FallbackGenerator::default(),
            locks: ConversationLocks::new(),
            config,
        }
    }

    /// Replaces the built-in fallback templates.
    pub fn with_fallback(mut self, fallback: FallbackGenerator) -> Self {
        self.fallback = fallback;
        self
    }

    /// Conversations with an exchange running or queued.
    pub fn active_locks(&self) -> usize {
        self.locks.active_count()
    }

    /// Runs one exchange on `conversation`.
    ///
    /// Cancelling `cancel` aborts an in-flight provider call; the lock is
    /// released and nothing further is written.
    pub async fn run_exchange(
        &self,
        conversation: &ConversationRecord,
        learner_message: &str,
        cancel: &CancellationToken,
    ) -> Result<ExchangeOutcome, ExchangeError> {
        let exchange_id = ExchangeId::new();
        let span = tracing::info_span!(
            "exchange",
            exchange_id = %exchange_id,
            conversation_id = %conversation.id,
            learner_id = %conversation.learner_id,
            module_id = %conversation.module_id,
        );
        self.run_exchange_inner(exchange_id, conversation, learner_message, cancel)
            .instrument(span)
            .await
    }

    async fn run_exchange_inner(
        &self,
        exchange_id: ExchangeId,
        conversation: &ConversationRecord,
        learner_message: &str,
        cancel: &CancellationToken,
    ) -> Result<ExchangeOutcome, ExchangeError> {
        // 1. Serialize against other exchanges on this conversation
        let _guard = self.locks.acquire(conversation.id).await;

        let message = self.validate_message(learner_message)?;
        let status = self.current_status(conversation).await?;
        if !status.accepts_messages() {
            return Err(ExchangeError::ConversationFinalized(conversation.id));
        }

        // 2. Persist the learner message (append-only)
        let learner_draft = MessageDraft::learner(message);
        self.persist("append_learner_message", || {
            self.conversations.append_message(&conversation.id, &learner_draft)
        })
        .await;

        if status == ConversationStatus::New {
            self.persist("activate_conversation", || {
                self.conversations
                    .update_status(&conversation.id, ConversationStatus::Active)
            })
            .await;
        }

        // 3. Assemble context
        let sources = match self.assembler.gather_for(conversation, message).await {
            Ok(sources) => Some(sources),
            Err(AssemblyError::ModuleNotFound(module_id)) => {
                tracing::warn!("Module not found, aborting exchange");
                return Err(ExchangeError::ModuleNotFound(module_id));
            }
            Err(AssemblyError::Store(err)) => {
                tracing::warn!(error = %err, "Context assembly failed, using fallback reply");
                None
            }
        };
        let context = sources.as_ref().map(|s| self.assembler.compose(s));

        // 4. Ask the provider, bounded by timeout and disconnect
        let generated = match (&sources, &context) {
            (Some(sources), Some(context)) => {
                let request = self.build_request(exchange_id, conversation, sources, &context.prompt, message);
                match self.call_provider(request, cancel).await {
                    Ok(response) => Some(response),
                    Err(ProviderFailure::Cancelled) => {
                        tracing::info!("Connection dropped, exchange cancelled");
                        return Err(ExchangeError::Cancelled);
                    }
                    Err(ProviderFailure::Failed(err)) => {
                        tracing::warn!(error = %err, timeout = err.is_timeout(), "Provider failed, using fallback reply");
                        None
                    }
                }
            }
            _ => None,
        };

        // 5./6. Analyze the reply, or fall back to a local question
        let (reply, analysis, usage, degraded) = match generated {
            Some((content, usage)) => {
                let analysis = analyze(&content, message);
                (content, analysis, usage, false)
            }
            None => {
                let reply = self.fallback.generate(message);
                let analysis = analyze(&reply, message).into_degraded();
                (reply, analysis, TokenUsage::zero(), true)
            }
        };

        if analysis.direct_answer {
            tracing::info!("Reply appears to state a direct answer");
        }

        // 7. Persist the tutor message, counters and knowledge
        let completion_tokens = (!degraded).then_some(usage.completion_tokens);
        let tutor_draft = MessageDraft::tutor(reply.clone(), completion_tokens, analysis.clone());
        let reply_persisted = self
            .persist("append_tutor_message", || {
                self.conversations.append_message(&conversation.id, &tutor_draft)
            })
            .await
            .is_some();

        let delta = EngagementDelta {
            questions_asked: analysis.question_count,
            insights_gained: u32::from(shows_insight(message)),
            learner_messages: 1,
        };
        self.persist("bump_engagement_counters", || {
            self.conversations.bump_engagement_counters(&conversation.id, &delta)
        })
        .await;

        if let (Some(sources), Some(context)) = (&sources, &context) {
            let kept = context
                .layer(LayerKind::Knowledge)
                .map_or(0, |layer| layer.entries_kept);
            self.record_knowledge(sources, kept, message, &analysis).await;
        }

        tracing::info!(
            tier = %analysis.tier,
            question_count = analysis.question_count,
            degraded,
            reply_persisted,
            "Exchange completed"
        );

        Ok(ExchangeOutcome {
            exchange_id,
            conversation_id: conversation.id,
            reply,
            analysis,
            usage,
            context_size_bytes: context.as_ref().map_or(0, |c| c.size_bytes),
            layers_active: context.as_ref().map_or(0, |c| c.layers_active),
            context_metrics: context.as_ref().map(|c| c.metrics()),
            degraded,
            reply_persisted,
        })
    }

    /// Finalizes a conversation on an explicit close signal.
    pub async fn close_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ConversationRecord, ExchangeError> {
        let _guard = self.locks.acquire(*conversation_id).await;

        let mut record = self
            .conversations
            .get_conversation(conversation_id)
            .await
            .map_err(ExchangeError::Store)?
            .ok_or(ExchangeError::ConversationNotFound(*conversation_id))?;

        record
            .transition(ConversationStatus::Finalized)
            .map_err(|_| ExchangeError::ConversationFinalized(*conversation_id))?;

        self.conversations
            .update_status(conversation_id, ConversationStatus::Finalized)
            .await
            .map_err(ExchangeError::Store)?;

        tracing::info!(conversation_id = %conversation_id, "Conversation finalized");
        Ok(record)
    }

    fn validate_message<'a>(&self, message: &'a str) -> Result<&'a str, ValidationError> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("content"));
        }
        let chars = trimmed.chars().count();
        if chars > self.config.max_message_chars {
            return Err(ValidationError::too_long(
                "content",
                self.config.max_message_chars,
                chars,
            ));
        }
        Ok(trimmed)
    }

    /// Status as stored now; falls back to the caller's copy if the store is
    /// unreachable or never saved the record.
    async fn current_status(
        &self,
        conversation: &ConversationRecord,
    ) -> Result<ConversationStatus, ExchangeError> {
        match self.conversations.get_conversation(&conversation.id).await {
            Ok(Some(stored)) => Ok(stored.status),
            Ok(None) => {
                tracing::warn!("Conversation is not stored, continuing unsaved");
                Ok(conversation.status)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Conversation status unavailable, using last known status");
                Ok(conversation.status)
            }
        }
    }

    fn build_request(
        &self,
        exchange_id: ExchangeId,
        conversation: &ConversationRecord,
        sources: &LayerSources,
        prompt: &str,
        message: &str,
    ) -> CompletionRequest {
        let history = history(sources.messages.as_deref(), message, self.config.history_messages);
        CompletionRequest::new(RequestMetadata::new(
            conversation.learner_id.clone(),
            conversation.id,
            exchange_id,
        ))
        .with_system_prompt(prompt)
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens)
        .with_timeout(self.config.provider_timeout)
        .with_history(history)
        .with_turn(ChatRole::User, message)
    }

    async fn call_provider(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<(String, TokenUsage), ProviderFailure> {
        let timeout = self.config.provider_timeout;
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderFailure::Cancelled),
            result = tokio::time::timeout(timeout, self.provider.complete(request)) => result,
        };

        match response {
            Err(_elapsed) => Err(ProviderFailure::Failed(AIError::timeout(timeout))),
            Ok(Err(err)) => Err(ProviderFailure::Failed(err)),
            Ok(Ok(response)) if response.content.trim().is_empty() => Err(
                ProviderFailure::Failed(AIError::parse("provider returned an empty reply")),
            ),
            Ok(Ok(response)) => Ok((response.content, response.usage)),
        }
    }

    async fn record_knowledge(
        &self,
        sources: &LayerSources,
        knowledge_kept: usize,
        message: &str,
        analysis: &ComplianceAnalysis,
    ) {
        let learner_id = &sources.learner_id;
        let module = &sources.module;

        let previous = match self
            .knowledge
            .get_knowledge_summary(learner_id, &module.id)
            .await
        {
            Ok(previous) => previous.map(|k| k.confidence),
            Err(err) => {
                tracing::warn!(error = %err, "Previous knowledge summary unavailable");
                None
            }
        };

        let confidence = if analysis.degraded {
            previous.unwrap_or(INITIAL_CONFIDENCE)
        } else {
            blend_confidence(previous, analysis.effectiveness)
        };

        let links = sources
            .knowledge
            .as_deref()
            .unwrap_or_default()
            .iter()
            .take(knowledge_kept)
            .map(|k| k.module_title.clone())
            .collect();

        let update = KnowledgeSummaryUpdate {
            learner_id: learner_id.clone(),
            module_id: module.id.clone(),
            module_title: module.title.clone(),
            summary: format!("Explored {}: {}", module.title, snippet(message)),
            confidence,
            retention_strength: REFRESHED_RETENTION,
            links,
        };

        self.persist("upsert_knowledge_summary", || {
            self.knowledge.upsert_knowledge_summary(update.clone())
        })
        .await;
    }

    /// Runs a store write, retrying once after the configured backoff.
    ///
    /// Returns `None` if both attempts failed; the failure is logged and the
    /// exchange carries on.
    async fn persist<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        match attempt().await {
            Ok(value) => return Some(value),
            Err(err) => {
                tracing::warn!(operation, error = %err, "Persistence failed, retrying once");
            }
        }

        tokio::time::sleep(self.config.persistence_retry_backoff).await;

        match attempt().await {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!(operation, error = %err, "Persistence failed after retry, continuing");
                None
            }
        }
    }
}

/// Last `limit` stored turns before the current learner message.
fn history<'a>(
    messages: Option<&'a [StoredMessage]>,
    current: &str,
    limit: usize,
) -> &'a [StoredMessage] {
    let Some(mut messages) = messages else {
        return &[];
    };
    if let Some(last) = messages.last() {
        if last.role == MessageRole::Learner && last.text == current {
            messages = &messages[..messages.len() - 1];
        }
    }
    &messages[messages.len().saturating_sub(limit)..]
}

fn snippet(message: &str) -> String {
    let mut chars = message.chars();
    let head: String = chars.by_ref().take(SUMMARY_SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    fn stored(role: MessageRole, text: &str) -> StoredMessage {
        let draft = match role {
            MessageRole::Learner => MessageDraft::learner(text),
            MessageRole::Tutor => MessageDraft {
                role,
                text: text.to_string(),
                token_count: 1,
                analysis: None,
            },
        };
        draft.into_stored(ConversationId::new(), Timestamp::now())
    }

    #[test]
    fn history_excludes_current_message() {
        let messages = vec![
            stored(MessageRole::Learner, "first"),
            stored(MessageRole::Tutor, "why?"),
            stored(MessageRole::Learner, "second"),
        ];
        let turns = history(Some(&messages), "second", 6);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, "why?");
    }

    #[test]
    fn history_keeps_last_turns_only() {
        let messages: Vec<_> = (0..10)
            .map(|i| stored(MessageRole::Tutor, &format!("t{}", i)))
            .collect();
        let turns = history(Some(&messages), "new", 6);
        assert_eq!(turns.len(), 6);
        assert_eq!(turns[0].text, "t4");
    }

    #[test]
    fn history_is_empty_without_messages() {
        assert!(history(None, "x", 6).is_empty());
    }

    #[test]
    fn snippet_truncates_long_messages() {
        let long = "a".repeat(200);
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), SUMMARY_SNIPPET_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(snippet("short"), "short");
    }

    #[test]
    fn default_config_matches_service_defaults() {
        let config = ExchangeConfig::default();
        assert_eq!(config.provider_timeout, Duration::from_secs(30));
        assert_eq!(config.max_message_chars, 2000);
        assert_eq!(config.history_messages, 6);
        assert_eq!(config.max_tokens, 500);
    }
}
