//! Socratic Tutor - tutoring core for an AI Socratic learning service
//!
//! Assembles a layered, size-bounded prompt for every learner message,
//! scores tutor replies for Socratic compliance, and runs exchanges so that
//! concurrent messages on one conversation are handled strictly in order.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
