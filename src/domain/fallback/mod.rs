//! Fallback module - keyword-driven question generator used when the
//! language-model provider times out or fails.

mod generator;
mod templates;

pub use generator::FallbackGenerator;
pub use templates::{FallbackTemplates, TemplateError, TemplateRule};
