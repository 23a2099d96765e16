//! Context module - the Context Assembly Engine.
//!
//! Builds one bounded prompt from the learner profile, the module, the live
//! conversation and knowledge carried over from other modules.

mod assembler;
mod layers;
mod strategy;

pub use assembler::{compose, LayerSources};
pub use layers::{
    AssembledContext, ContextConfig, ContextMetrics, LayerKind, LayerMetadata, LAYER_SEPARATOR,
};
pub use strategy::{dialogue_context, response_strategy, socratic_strategy};
