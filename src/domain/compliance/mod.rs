//! Compliance module - scores tutor replies for adherence to discovery-based
//! (Socratic) teaching.

mod analyzer;
mod direct_answer;
mod engagement;
pub(crate) mod text;

pub use analyzer::{
    analyze, ComplianceAnalysis, ComplianceTier, EngagementTier, TeachingApproach,
    HIGH_EFFECTIVENESS, LOW_EFFECTIVENESS, MEDIUM_EFFECTIVENESS,
};
pub use direct_answer::{detects_direct_answer, question_subject};
pub use engagement::{discovery_cue_count, shows_insight, DISCOVERY_CUES, INSIGHT_CUES};
