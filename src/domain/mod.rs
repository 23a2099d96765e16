//! Domain layer containing tutoring types and pure logic.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (ids, timestamps, errors, state machine)
//! - `learning` - Learner profiles, module configuration, cross-module knowledge
//! - `conversation` - Conversation lifecycle, messages, engagement counters
//! - `context` - Context Assembly Engine
//! - `compliance` - Socratic compliance analysis of tutor replies
//! - `fallback` - Local question generator for provider outages

pub mod compliance;
pub mod context;
pub mod conversation;
pub mod fallback;
pub mod foundation;
pub mod learning;
