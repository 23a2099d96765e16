//! Assembled context value types and the injected assembly configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator placed between layer blocks.
pub const LAYER_SEPARATOR: &str = "\n\n";

/// Size at which a prompt is considered well-filled.
const OPTIMAL_PROMPT_BYTES: f64 = 2000.0;

/// Limits injected into the assembly engine at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextConfig {
    /// Soft cap on prompt size in bytes. Layers 1–2 may exceed it.
    pub max_context_chars: usize,
    /// Most recent messages read for the conversation layer.
    pub recent_message_limit: usize,
    /// Most recent other-module summaries read for the knowledge layer.
    pub knowledge_limit: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 4000,
            recent_message_limit: 10,
            knowledge_limit: 3,
        }
    }
}

/// The four layers, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Profile,
    Module,
    Conversation,
    Knowledge,
}

impl LayerKind {
    /// Block header name.
    pub fn title(&self) -> &'static str {
        match self {
            LayerKind::Profile => "LEARNER PROFILE",
            LayerKind::Module => "MODULE",
            LayerKind::Conversation => "CONVERSATION",
            LayerKind::Knowledge => "PRIOR KNOWLEDGE",
        }
    }

    /// `=== NAME ===` or `=== NAME (default) ===`.
    pub fn header(&self, is_default: bool) -> String {
        if is_default {
            format!("=== {} (default) ===", self.title())
        } else {
            format!("=== {} ===", self.title())
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LayerKind::Profile => "profile",
            LayerKind::Module => "module",
            LayerKind::Conversation => "conversation",
            LayerKind::Knowledge => "knowledge",
        };
        f.write_str(s)
    }
}

/// What happened to one layer during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMetadata {
    pub kind: LayerKind,
    pub included: bool,
    /// Content is the labeled default rather than real data.
    pub is_default: bool,
    /// Bytes of the block as rendered (0 when omitted).
    pub bytes: usize,
    /// Messages or summaries available to the layer.
    pub entries_total: usize,
    /// Messages or summaries that made it into the prompt.
    pub entries_kept: usize,
}

impl LayerMetadata {
    pub fn is_truncated(&self) -> bool {
        !self.included || self.entries_kept < self.entries_total
    }

    /// Included and backed by real data.
    pub fn is_active(&self) -> bool {
        self.included && !self.is_default
    }
}

/// Prompt produced for one exchange. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub prompt: String,
    pub size_bytes: usize,
    /// Layers that contributed real content (0–4).
    pub layers_active: u8,
    /// Bytes of `layer1 + separator + layer2`, which are never truncated.
    pub core_bytes: usize,
    /// Per-layer metadata in priority order.
    pub layers: Vec<LayerMetadata>,
}

impl AssembledContext {
    pub fn layer(&self, kind: LayerKind) -> Option<&LayerMetadata> {
        self.layers.iter().find(|l| l.kind == kind)
    }

    /// True if any optional layer lost content to the size cap.
    pub fn was_truncated(&self) -> bool {
        self.layers
            .iter()
            .filter(|l| matches!(l.kind, LayerKind::Conversation | LayerKind::Knowledge))
            .any(|l| l.is_truncated())
    }

    pub fn metrics(&self) -> ContextMetrics {
        ContextMetrics {
            size_bytes: self.size_bytes,
            word_count: self.prompt.split_whitespace().count(),
            layers_active: self.layers_active,
            optimization_score: (self.size_bytes as f64 / OPTIMAL_PROMPT_BYTES).min(1.0),
        }
    }
}

/// Observability figures for an assembled prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMetrics {
    pub size_bytes: usize,
    pub word_count: usize,
    pub layers_active: u8,
    /// `min(size / 2000, 1.0)`.
    pub optimization_score: f64,
}
