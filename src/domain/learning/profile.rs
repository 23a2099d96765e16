//! Learner profile: style, pace, goals and per-module mastery.
//!
//! Profiles are owned by the profile store and are read-only to the tutoring
//! core. A learner without a stored profile is tutored with
//! [`LearningProfile::default_for`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{LearnerId, ModuleId, ValidationError};

/// Goal used when the learner has no stored profile.
pub const DEFAULT_GOAL: &str = "build understanding through guided discovery";

/// Preferred way of taking in new material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    #[default]
    Reading,
}

impl LearningStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningStyle::Visual => "visual",
            LearningStyle::Auditory => "auditory",
            LearningStyle::Kinesthetic => "kinesthetic",
            LearningStyle::Reading => "reading",
        }
    }
}

impl fmt::Display for LearningStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LearningStyle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visual" => Ok(LearningStyle::Visual),
            "auditory" => Ok(LearningStyle::Auditory),
            "kinesthetic" => Ok(LearningStyle::Kinesthetic),
            "reading" => Ok(LearningStyle::Reading),
            other => Err(ValidationError::invalid_format(
                "learning_style",
                format!("unknown learning style '{}'", other),
            )),
        }
    }
}

/// How quickly the learner wants to move through material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl Pace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pace::Slow => "slow",
            Pace::Medium => "medium",
            Pace::Fast => "fast",
        }
    }
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pace {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(Pace::Slow),
            "medium" => Ok(Pace::Medium),
            "fast" => Ok(Pace::Fast),
            other => Err(ValidationError::invalid_format(
                "pace",
                format!("unknown pace '{}'", other),
            )),
        }
    }
}

/// Kind of tutor interaction the learner responds to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InteractionPreference {
    #[default]
    Questions,
    Examples,
    Discussion,
}

impl InteractionPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionPreference::Questions => "questions",
            InteractionPreference::Examples => "examples",
            InteractionPreference::Discussion => "discussion",
        }
    }
}

impl fmt::Display for InteractionPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionPreference {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "questions" => Ok(InteractionPreference::Questions),
            "examples" => Ok(InteractionPreference::Examples),
            "discussion" => Ok(InteractionPreference::Discussion),
            other => Err(ValidationError::invalid_format(
                "interaction_preference",
                format!("unknown interaction preference '{}'", other),
            )),
        }
    }
}

/// Coarse mastery level reached in a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MasteryTier {
    #[default]
    Novice,
    Developing,
    Proficient,
    Mastered,
}

impl fmt::Display for MasteryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MasteryTier::Novice => "novice",
            MasteryTier::Developing => "developing",
            MasteryTier::Proficient => "proficient",
            MasteryTier::Mastered => "mastered",
        };
        f.write_str(s)
    }
}

/// Progress recorded for a single module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleMastery {
    /// Completion percentage in [0, 100].
    pub completion_percent: f64,
    pub tier: MasteryTier,
}

impl ModuleMastery {
    /// Creates a mastery entry, clamping completion into [0, 100].
    pub fn new(completion_percent: f64, tier: MasteryTier) -> Self {
        let completion_percent = if completion_percent.is_finite() {
            completion_percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            completion_percent,
            tier,
        }
    }
}

/// Everything the tutor knows about how a learner likes to learn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningProfile {
    pub learner_id: LearnerId,
    pub learning_style: LearningStyle,
    pub pace: Pace,
    pub interaction_preference: InteractionPreference,
    pub goals: Vec<String>,
    /// Mastery per module, keyed by module id for stable ordering.
    pub mastery: BTreeMap<ModuleId, ModuleMastery>,
}

impl LearningProfile {
    /// Profile substituted when the store has no record for the learner.
    pub fn default_for(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            learning_style: LearningStyle::default(),
            pace: Pace::default(),
            interaction_preference: InteractionPreference::default(),
            goals: vec![DEFAULT_GOAL.to_string()],
            mastery: BTreeMap::new(),
        }
    }

    /// One-line digest of mastery in modules other than `current`.
    ///
    /// Returns `None` when there is nothing to report.
    pub fn mastery_digest(&self, current: &ModuleId) -> Option<String> {
        let entries: Vec<String> = self
            .mastery
            .iter()
            .filter(|(module_id, _)| *module_id != current)
            .map(|(module_id, m)| {
                format!(
                    "module {} {:.0}% ({})",
                    module_id, m.completion_percent, m.tier
                )
            })
            .collect();

        if entries.is_empty() {
            None
        } else {
            Some(entries.join("; "))
        }
    }
}
