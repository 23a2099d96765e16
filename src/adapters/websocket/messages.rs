//! WebSocket message types for the tutor protocol.
//!
//! - Server → Client: connection status, tutor replies, closure notices, errors, pongs
//! - Client → Server: learner messages, close requests, pings

use serde::{Deserialize, Serialize};

use crate::domain::compliance::ComplianceAnalysis;
use crate::ports::{InboundEvent, OutboundEvent, TokenUsage};

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected(ConnectedMessage),
    TutorReply(TutorReplyMessage),
    ConversationClosed(ConversationClosedMessage),
    Error(ErrorMessage),
    Pong(PongMessage),
}

/// Sent once the module has been verified and the session is live.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectedMessage {
    pub learner_id: String,
    pub module_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TutorReplyMessage {
    pub exchange_id: String,
    pub conversation_id: String,
    pub reply: String,
    pub compliance: ComplianceAnalysis,
    pub token_usage: TokenUsage,
    pub context: ContextSummary,
    pub degraded: bool,
    pub timestamp: String,
}

/// Size of the prompt that produced a reply.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ContextSummary {
    pub size_bytes: usize,
    pub layers_active: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationClosedMessage {
    pub conversation_id: String,
}

/// Error message sent to client.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

/// Heartbeat response.
#[derive(Debug, Clone, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

impl From<OutboundEvent> for ServerMessage {
    fn from(event: OutboundEvent) -> Self {
        match event {
            OutboundEvent::Connected {
                learner_id,
                module_id,
                timestamp,
            } => ServerMessage::Connected(ConnectedMessage {
                learner_id: learner_id.to_string(),
                module_id: module_id.to_string(),
                timestamp: timestamp.to_rfc3339(),
            }),
            OutboundEvent::TutorReply(reply) => ServerMessage::TutorReply(TutorReplyMessage {
                exchange_id: reply.exchange_id.to_string(),
                conversation_id: reply.conversation_id.to_string(),
                reply: reply.reply,
                compliance: reply.compliance,
                token_usage: reply.token_usage,
                context: ContextSummary {
                    size_bytes: reply.context_size_bytes,
                    layers_active: reply.layers_active,
                },
                degraded: reply.degraded,
                timestamp: reply.timestamp.to_rfc3339(),
            }),
            OutboundEvent::ConversationClosed { conversation_id } => {
                ServerMessage::ConversationClosed(ConversationClosedMessage {
                    conversation_id: conversation_id.to_string(),
                })
            }
            OutboundEvent::Error {
                code,
                message,
                timestamp,
            } => ServerMessage::Error(ErrorMessage {
                code: code.as_str().to_string(),
                message,
                timestamp: timestamp.to_rfc3339(),
            }),
            OutboundEvent::Pong { timestamp } => ServerMessage::Pong(PongMessage {
                timestamp: timestamp.to_rfc3339(),
            }),
        }
    }
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    SendMessage { content: String },
    CloseConversation,
    Ping,
}

impl From<ClientMessage> for InboundEvent {
    fn from(message: ClientMessage) -> Self {
        match message {
            ClientMessage::SendMessage { content } => InboundEvent::SendMessage { content },
            ClientMessage::CloseConversation => InboundEvent::CloseConversation,
            ClientMessage::Ping => InboundEvent::Ping,
        }
    }
}
