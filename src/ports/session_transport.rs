//! Session transport port: one bidirectional learner connection.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::compliance::ComplianceAnalysis;
use crate::domain::foundation::{
    ConversationId, ErrorCode, ExchangeId, LearnerId, ModuleId, Timestamp,
};
use crate::ports::TokenUsage;

/// Events arriving from the learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    SendMessage { content: String },
    CloseConversation,
    Ping,
}

/// Events sent to the learner.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    Connected {
        learner_id: LearnerId,
        module_id: ModuleId,
        timestamp: Timestamp,
    },
    TutorReply(TutorReply),
    ConversationClosed {
        conversation_id: ConversationId,
    },
    Error {
        code: ErrorCode,
        message: String,
        timestamp: Timestamp,
    },
    Pong {
        timestamp: Timestamp,
    },
}

impl OutboundEvent {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        OutboundEvent::Error {
            code,
            message: message.into(),
            timestamp: Timestamp::now(),
        }
    }
}

/// Reply plus the metadata the client shows alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct TutorReply {
    pub exchange_id: ExchangeId,
    pub conversation_id: ConversationId,
    pub reply: String,
    pub compliance: ComplianceAnalysis,
    pub token_usage: TokenUsage,
    pub context_size_bytes: usize,
    pub layers_active: u8,
    pub degraded: bool,
    pub timestamp: Timestamp,
}

/// Transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection closed")]
    Closed,

    #[error("Malformed inbound message: {0}")]
    Malformed(String),

    #[error("Failed to send: {0}")]
    Send(String),
}

/// One learner connection as seen by the session manager.
///
/// `disconnect_signal` is cancelled by the transport when the connection
/// drops; in-flight exchanges listen on it.
#[async_trait]
pub trait SessionTransport: Send {
    /// Next inbound event; `None` once the connection has closed.
    async fn next_event(&mut self) -> Option<Result<InboundEvent, TransportError>>;

    /// Sends an event to the learner.
    async fn emit(&mut self, event: OutboundEvent) -> Result<(), TransportError>;

    /// Token cancelled on disconnect.
    fn disconnect_signal(&self) -> CancellationToken;
}
