//! Adapters - Implementations of port interfaces.
//!
//! - `ai` - OpenAI provider and a configurable mock
//! - `memory` - In-memory persistence (default store, tests)
//! - `postgres` - PostgreSQL persistence via sqlx
//! - `websocket` - axum WebSocket route and transport
//! - `session` - Channel-backed transport for in-process sessions

pub mod ai;
pub mod memory;
pub mod postgres;
pub mod session;
pub mod websocket;
