//! WebSocket adapter for tutoring sessions.
//!
//! ```text
//! client ──ws──► tutor_ws_handler ──► WebSocketTransport ──► SessionManager
//!                                          ▲   reader task        │
//!                                          └──── ServerMessage ◄──┘
//! ```
//!
//! - [`messages`] - wire protocol types
//! - [`transport`] - `SessionTransport` over an axum WebSocket
//! - [`handler`] - upgrade handler and router

pub mod handler;
pub mod messages;
pub mod transport;

pub use handler::{tutor_router, tutor_ws_handler, TutorQuery, TutorState, DEFAULT_MAX_MESSAGE_BYTES};
pub use messages::{
    ClientMessage, ConnectedMessage, ContextSummary, ConversationClosedMessage, ErrorMessage,
    PongMessage, ServerMessage, TutorReplyMessage,
};
pub use transport::{decode_frame, WebSocketTransport};
