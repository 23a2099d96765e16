//! Module configuration: what a module teaches and how hard the tutor pushes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{ModuleId, ValidationError};

/// How strictly the tutor sticks to questioning in a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SocraticIntensity {
    Low,
    #[default]
    Moderate,
    High,
}

impl SocraticIntensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocraticIntensity::Low => "low",
            SocraticIntensity::Moderate => "moderate",
            SocraticIntensity::High => "high",
        }
    }

    /// Instruction line rendered into the module block.
    pub fn guidance(&self) -> &'static str {
        match self {
            SocraticIntensity::Low => {
                "Mix short explanations with questions; offer hints when the learner is stuck."
            }
            SocraticIntensity::Moderate => {
                "Lead with questions; explain only after the learner has attempted an answer."
            }
            SocraticIntensity::High => {
                "Respond almost entirely with questions; never state conclusions for the learner."
            }
        }
    }
}

impl fmt::Display for SocraticIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocraticIntensity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(SocraticIntensity::Low),
            "moderate" | "medium" => Ok(SocraticIntensity::Moderate),
            "high" => Ok(SocraticIntensity::High),
            other => Err(ValidationError::invalid_format(
                "socratic_intensity",
                format!("unknown intensity '{}'", other),
            )),
        }
    }
}

/// Authoring-time configuration for a learning module.
///
/// Immutable for the duration of a session. A missing module aborts the
/// exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub id: ModuleId,
    pub title: String,
    pub description: String,
    /// Free-text instructions from the module author.
    pub teaching_directive: String,
    pub objectives: Vec<String>,
    pub socratic_intensity: SocraticIntensity,
}

impl ModuleConfig {
    /// Creates a module config, requiring a non-empty title.
    pub fn new(id: ModuleId, title: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        Ok(Self {
            id,
            title,
            description: String::new(),
            teaching_directive: String::new(),
            objectives: Vec::new(),
            socratic_intensity: SocraticIntensity::default(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.teaching_directive = directive.into();
        self
    }

    pub fn with_objectives(mut self, objectives: Vec<String>) -> Self {
        self.objectives = objectives;
        self
    }

    pub fn with_intensity(mut self, intensity: SocraticIntensity) -> Self {
        self.socratic_intensity = intensity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_blank_title() {
        let id = ModuleId::new("1").unwrap();
        assert!(ModuleConfig::new(id, "  ").is_err());
    }

    #[test]
    fn builder_sets_all_fields() {
        let module = ModuleConfig::new(ModuleId::new("1").unwrap(), "Intro to Communication")
            .unwrap()
            .with_description("Foundations")
            .with_directive("Ask about everyday conversations")
            .with_objectives(vec!["Define encoding".into()])
            .with_intensity(SocraticIntensity::High);

        assert_eq!(module.description, "Foundations");
        assert_eq!(module.objectives.len(), 1);
        assert_eq!(module.socratic_intensity, SocraticIntensity::High);
    }

    #[test]
    fn intensity_accepts_medium_alias() {
        assert_eq!("medium".parse::<SocraticIntensity>().unwrap(), SocraticIntensity::Moderate);
    }

    #[test]
    fn every_intensity_has_guidance() {
        for intensity in [SocraticIntensity::Low, SocraticIntensity::Moderate, SocraticIntensity::High] {
            assert!(!intensity.guidance().is_empty());
        }
    }
}
