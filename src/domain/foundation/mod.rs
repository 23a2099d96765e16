//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, error types and the state machine trait used
//! across the tutoring domain.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{ErrorCode, ValidationError};
pub use ids::{ConversationId, ExchangeId, LearnerId, MessageId, ModuleId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
