//! Compliance Analyzer: scores a tutor reply for discovery-based teaching.
//!
//! Pure and side-effect free. It never rejects a reply.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::direct_answer::detects_direct_answer;
use super::engagement::discovery_cue_count;
use super::text::sentences;

/// Effectiveness attached to each compliance tier.
pub const HIGH_EFFECTIVENESS: f64 = 0.90;
pub const MEDIUM_EFFECTIVENESS: f64 = 0.70;
pub const LOW_EFFECTIVENESS: f64 = 0.40;

/// Question-ratio thresholds in percent.
const HIGH_RATIO_PERCENT: u64 = 70;
const MEDIUM_RATIO_PERCENT: u64 = 40;

const HIGH_ENGAGEMENT_QUESTIONS: u32 = 3;
const HIGH_ENGAGEMENT_CUES: usize = 2;

/// How question-driven a reply is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceTier {
    High,
    Medium,
    Low,
}

impl ComplianceTier {
    pub fn effectiveness(&self) -> f64 {
        match self {
            ComplianceTier::High => HIGH_EFFECTIVENESS,
            ComplianceTier::Medium => MEDIUM_EFFECTIVENESS,
            ComplianceTier::Low => LOW_EFFECTIVENESS,
        }
    }

    /// Classifies `questions / sentences` with exact integer comparisons.
    pub fn classify(question_count: u32, sentence_count: u32) -> Self {
        let q = u64::from(question_count) * 100;
        let s = u64::from(sentence_count.max(1));
        if q >= HIGH_RATIO_PERCENT * s {
            ComplianceTier::High
        } else if q >= MEDIUM_RATIO_PERCENT * s {
            ComplianceTier::Medium
        } else {
            ComplianceTier::Low
        }
    }
}

impl fmt::Display for ComplianceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComplianceTier::High => "HIGH",
            ComplianceTier::Medium => "MEDIUM",
            ComplianceTier::Low => "LOW",
        };
        f.write_str(s)
    }
}

/// How strongly the reply invites the learner to engage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementTier {
    High,
    Medium,
}

/// Overall shape of the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeachingApproach {
    Questioning,
    Mixed,
    Explanatory,
}

impl TeachingApproach {
    fn from_question_count(question_count: u32) -> Self {
        match question_count {
            0 => TeachingApproach::Explanatory,
            1 => TeachingApproach::Mixed,
            _ => TeachingApproach::Questioning,
        }
    }
}

/// Score of one tutor reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceAnalysis {
    pub question_count: u32,
    pub sentence_count: u32,
    pub question_ratio: f64,
    pub tier: ComplianceTier,
    pub engagement: EngagementTier,
    pub effectiveness: f64,
    pub direct_answer: bool,
    pub teaching_approach: TeachingApproach,
    /// Set when the reply came from the local fallback generator.
    pub degraded: bool,
}

impl ComplianceAnalysis {
    /// Marks the analysis as describing a fallback reply.
    pub fn into_degraded(mut self) -> Self {
        self.degraded = true;
        self
    }
}

/// Analyzes `reply` in the light of the learner message it answers.
pub fn analyze(reply: &str, learner_message: &str) -> ComplianceAnalysis {
    let question_count = reply.matches('?').count() as u32;
    let sentence_count = (sentences(reply).len() as u32).max(1);
    let tier = ComplianceTier::classify(question_count, sentence_count);

    let engagement = if question_count >= HIGH_ENGAGEMENT_QUESTIONS
        || discovery_cue_count(reply) >= HIGH_ENGAGEMENT_CUES
    {
        EngagementTier::High
    } else {
        EngagementTier::Medium
    };

    ComplianceAnalysis {
        question_count,
        sentence_count,
        question_ratio: f64::from(question_count) / f64::from(sentence_count),
        tier,
        engagement,
        effectiveness: tier.effectiveness(),
        direct_answer: detects_direct_answer(reply, learner_message),
        teaching_approach: TeachingApproach::from_question_count(question_count),
        degraded: false,
    }
}
