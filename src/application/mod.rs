//! Application layer - orchestration between the tutoring domain and ports.
//!
//! - `ContextAssembler` gathers layer sources and runs the assembly engine
//! - `ConversationLocks` serializes exchanges per conversation
//! - `ExchangeCoordinator` runs one learner-message → tutor-reply round trip
//! - `SessionManager` drives one learner connection

mod context_assembler;
mod conversation_locks;
mod exchange_coordinator;
mod session_manager;

pub use context_assembler::{AssemblyError, ContextAssembler};
pub use conversation_locks::{ConversationGuard, ConversationLocks};
pub use exchange_coordinator::{ExchangeConfig, ExchangeCoordinator, ExchangeError, ExchangeOutcome};
pub use session_manager::{SessionError, SessionManager, SessionSummary, MODULE_UNAVAILABLE_MESSAGE};
