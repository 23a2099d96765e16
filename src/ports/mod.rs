//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the tutoring core and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `ProfileReader` - Learner profiles and module configuration (read-only)
//! - `ConversationRepository` - Conversations, messages, engagement counters
//! - `KnowledgeRepository` - Cross-module knowledge summaries
//!
//! ## External Service Ports
//!
//! - `AIProvider` - Language-model completions
//! - `SessionTransport` - One bidirectional learner connection

mod ai_provider;
mod conversation_repository;
mod knowledge_repository;
mod profile_reader;
mod session_transport;
mod store_error;

pub use ai_provider::{
    AIError, AIProvider, ChatRole, ChatTurn, CompletionRequest, CompletionResponse,
    FinishReason, ProviderInfo, RequestMetadata, TokenUsage,
};
pub use conversation_repository::ConversationRepository;
pub use knowledge_repository::KnowledgeRepository;
pub use profile_reader::ProfileReader;
pub use session_transport::{
    InboundEvent, OutboundEvent, SessionTransport, TransportError, TutorReply,
};
pub use store_error::StoreError;
