//! Learning module - learner profiles, module configuration and
//! cross-module knowledge.

mod knowledge;
mod module_config;
mod profile;

pub use knowledge::{
    blend_confidence, clamp_unit, CrossModuleKnowledge, KnowledgeSummaryUpdate,
    INITIAL_CONFIDENCE, REFRESHED_RETENTION,
};
pub use module_config::{ModuleConfig, SocraticIntensity};
pub use profile::{
    InteractionPreference, LearningProfile, LearningStyle, MasteryTier, ModuleMastery, Pace,
    DEFAULT_GOAL,
};
