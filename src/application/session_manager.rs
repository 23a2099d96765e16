//! Session Manager: drives one learner connection.
//!
//! Inbound messages run through the exchange coordinator against the
//! learner's open conversation for the module (created on demand). A dropped
//! connection cancels the in-flight exchange.

use std::sync::Arc;
use thiserror::Error;

use super::{ExchangeCoordinator, ExchangeError, ExchangeOutcome};
use crate::domain::conversation::ConversationRecord;
use crate::domain::foundation::{ErrorCode, LearnerId, ModuleId, Timestamp};
use crate::ports::{
    ConversationRepository, InboundEvent, OutboundEvent, ProfileReader, SessionTransport,
    StoreError, TransportError, TutorReply,
};

/// Learner-facing text for a module that cannot be loaded.
pub const MODULE_UNAVAILABLE_MESSAGE: &str = "This module is currently unavailable.";

/// Errors that end a session early.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Module not found: {0}")]
    ModuleNotFound(ModuleId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub exchanges: u32,
    pub degraded_replies: u32,
    pub cancelled: bool,
}

/// Owns the per-connection loop.
#[derive(Clone)]
pub struct SessionManager {
    coordinator: Arc<ExchangeCoordinator>,
    profiles: Arc<dyn ProfileReader>,
    conversations: Arc<dyn ConversationRepository>,
}

impl SessionManager {
    pub fn new(
        coordinator: Arc<ExchangeCoordinator>,
        profiles: Arc<dyn ProfileReader>,
        conversations: Arc<dyn ConversationRepository>,
    ) -> Self {
        Self {
            coordinator,
            profiles,
            conversations,
        }
    }

    /// Serves `transport` until the learner disconnects.
    pub async fn handle_session<T>(
        &self,
        learner_id: LearnerId,
        module_id: ModuleId,
        transport: &mut T,
    ) -> Result<SessionSummary, SessionError>
    where
        T: SessionTransport + ?Sized,
    {
        match self.profiles.get_module(&module_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(learner_id = %learner_id, module_id = %module_id, "Session rejected, module not found");
                transport
                    .emit(OutboundEvent::error(ErrorCode::ModuleNotFound, MODULE_UNAVAILABLE_MESSAGE))
                    .await?;
                return Err(SessionError::ModuleNotFound(module_id));
            }
            Err(err) => {
                tracing::error!(learner_id = %learner_id, module_id = %module_id, error = %err, "Module lookup failed at connect");
                transport
                    .emit(OutboundEvent::error(ErrorCode::InternalError, MODULE_UNAVAILABLE_MESSAGE))
                    .await?;
                return Err(SessionError::Store(err));
            }
        }

        transport
            .emit(OutboundEvent::Connected {
                learner_id: learner_id.clone(),
                module_id: module_id.clone(),
                timestamp: Timestamp::now(),
            })
            .await?;
        tracing::info!(learner_id = %learner_id, module_id = %module_id, "Tutor session connected");

        let disconnect = transport.disconnect_signal();
        let mut summary = SessionSummary::default();

        loop {
            let event = tokio::select! {
                biased;
                _ = disconnect.cancelled() => break,
                event = transport.next_event() => event,
            };

            let event = match event {
                None | Some(Err(TransportError::Closed)) => break,
                Some(Err(TransportError::Malformed(reason))) => {
                    transport
                        .emit(OutboundEvent::error(ErrorCode::ValidationFailed, reason))
                        .await?;
                    continue;
                }
                Some(Err(err)) => {
                    tracing::warn!(learner_id = %learner_id, error = %err, "Transport failed, ending session");
                    break;
                }
                Some(Ok(event)) => event,
            };

            match event {
                InboundEvent::Ping => {
                    transport
                        .emit(OutboundEvent::Pong {
                            timestamp: Timestamp::now(),
                        })
                        .await?;
                }
                InboundEvent::SendMessage { content } => {
                    let conversation = self.open_conversation(&learner_id, &module_id).await;
                    match self
                        .coordinator
                        .run_exchange(&conversation, &content, &disconnect)
                        .await
                    {
                        Ok(outcome) => {
                            summary.exchanges += 1;
                            if outcome.degraded {
                                summary.degraded_replies += 1;
                            }
                            transport.emit(OutboundEvent::TutorReply(reply_event(outcome))).await?;
                        }
                        Err(ExchangeError::Cancelled) => {
                            summary.cancelled = true;
                            break;
                        }
                        Err(err) => {
                            let (code, message) = describe(&err);
                            transport.emit(OutboundEvent::error(code, message)).await?;
                        }
                    }
                }
                InboundEvent::CloseConversation => {
                    self.close(&learner_id, &module_id, transport).await?;
                }
            }
        }

        Ok(summary)
    }

    /// Open conversation for the pair. If the store is down the exchange
    /// still runs against a fresh, unsaved record so the learner gets a reply.
    async fn open_conversation(&self, learner_id: &LearnerId, module_id: &ModuleId) -> ConversationRecord {
        match self
            .conversations
            .get_or_create_conversation(learner_id, module_id)
            .await
        {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(learner_id = %learner_id, module_id = %module_id, error = %err, "Conversation store unavailable, continuing unsaved");
                ConversationRecord::start(learner_id.clone(), module_id.clone())
            }
        }
    }

    async fn close<T>(
        &self,
        learner_id: &LearnerId,
        module_id: &ModuleId,
        transport: &mut T,
    ) -> Result<(), SessionError>
    where
        T: SessionTransport + ?Sized,
    {
        let open = match self.conversations.find_open_conversation(learner_id, module_id).await {
            Ok(open) => open,
            Err(err) => {
                tracing::warn!(learner_id = %learner_id, error = %err, "Close failed, store unavailable");
                transport
                    .emit(OutboundEvent::error(ErrorCode::PersistenceFailed, "Could not close the conversation."))
                    .await?;
                return Ok(());
            }
        };

        let Some(conversation) = open else {
            transport
                .emit(OutboundEvent::error(ErrorCode::ConversationNotFound, "No open conversation to close."))
                .await?;
            return Ok(());
        };

        match self.coordinator.close_conversation(&conversation.id).await {
            Ok(record) => {
                transport
                    .emit(OutboundEvent::ConversationClosed {
                        conversation_id: record.id,
                    })
                    .await?;
            }
            Err(err) => {
                let (code, message) = describe(&err);
                transport.emit(OutboundEvent::error(code, message)).await?;
            }
        }
        Ok(())
    }
}

fn reply_event(outcome: ExchangeOutcome) -> TutorReply {
    TutorReply {
        exchange_id: outcome.exchange_id,
        conversation_id: outcome.conversation_id,
        reply: outcome.reply,
        compliance: outcome.analysis,
        token_usage: outcome.usage,
        context_size_bytes: outcome.context_size_bytes,
        layers_active: outcome.layers_active,
        degraded: outcome.degraded,
        timestamp: Timestamp::now(),
    }
}

/// Error code and learner-facing text for an exchange failure.
fn describe(err: &ExchangeError) -> (ErrorCode, String) {
    match err {
        ExchangeError::ModuleNotFound(_) => {
            (ErrorCode::ModuleNotFound, MODULE_UNAVAILABLE_MESSAGE.to_string())
        }
        ExchangeError::InvalidMessage(reason) => (ErrorCode::ValidationFailed, reason.to_string()),
        ExchangeError::ConversationNotFound(_) => (
            ErrorCode::ConversationNotFound,
            "Conversation not found.".to_string(),
        ),
        ExchangeError::ConversationFinalized(_) => (
            ErrorCode::ConversationFinalized,
            "This conversation has been closed.".to_string(),
        ),
        ExchangeError::Store(_) => (
            ErrorCode::PersistenceFailed,
            "The conversation could not be updated.".to_string(),
        ),
        ExchangeError::Cancelled => (ErrorCode::InternalError, "Exchange cancelled.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ValidationError;

    #[test]
    fn module_errors_use_generic_text() {
        let (code, message) = describe(&ExchangeError::ModuleNotFound(ModuleId::new("9").unwrap()));
        assert_eq!(code, ErrorCode::ModuleNotFound);
        assert_eq!(message, MODULE_UNAVAILABLE_MESSAGE);
    }

    #[test]
    fn validation_errors_keep_reason() {
        let err = ExchangeError::InvalidMessage(ValidationError::empty_field("content"));
        let (code, message) = describe(&err);
        assert_eq!(code, ErrorCode::ValidationFailed);
        assert!(message.contains("content"));
    }
}
