//! Cross-module knowledge: what a learner took away from each module.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{LearnerId, ModuleId, Timestamp};

/// Confidence assumed before any exchange has been scored.
pub const INITIAL_CONFIDENCE: f64 = 0.5;

/// Retention strength written after every fresh exchange.
pub const REFRESHED_RETENTION: f64 = 0.9;

/// Weight of the previous confidence when blending in a new score.
const CONFIDENCE_MOMENTUM: f64 = 0.7;

/// Stored summary for one (learner, module) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossModuleKnowledge {
    pub learner_id: LearnerId,
    pub module_id: ModuleId,
    pub module_title: String,
    pub summary: String,
    /// In [0, 1].
    pub confidence: f64,
    /// In [0, 1].
    pub retention_strength: f64,
    pub links: Vec<String>,
    pub updated_at: Timestamp,
}

impl CrossModuleKnowledge {
    /// Single line rendered into the knowledge layer.
    pub fn render_line(&self) -> String {
        let mut line = format!(
            "- {}: {} (confidence {:.2}, retention {:.2})",
            self.module_title, self.summary, self.confidence, self.retention_strength
        );
        if !self.links.is_empty() {
            line.push_str(&format!(" [links: {}]", self.links.join(", ")));
        }
        line
    }
}

/// Write model for upserting a knowledge summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSummaryUpdate {
    pub learner_id: LearnerId,
    pub module_id: ModuleId,
    pub module_title: String,
    pub summary: String,
    pub confidence: f64,
    pub retention_strength: f64,
    pub links: Vec<String>,
}

impl KnowledgeSummaryUpdate {
    /// Materializes the update into a stored record at `now`.
    pub fn into_record(self, now: Timestamp) -> CrossModuleKnowledge {
        CrossModuleKnowledge {
            learner_id: self.learner_id,
            module_id: self.module_id,
            module_title: self.module_title,
            summary: self.summary,
            confidence: clamp_unit(self.confidence),
            retention_strength: clamp_unit(self.retention_strength),
            links: self.links,
            updated_at: now,
        }
    }
}

/// Clamps a score into [0, 1]; non-finite input becomes 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Blends a new effectiveness score into the running confidence.
pub fn blend_confidence(previous: Option<f64>, effectiveness: f64) -> f64 {
    let previous = previous.unwrap_or(INITIAL_CONFIDENCE);
    clamp_unit(CONFIDENCE_MOMENTUM * previous + (1.0 - CONFIDENCE_MOMENTUM) * effectiveness)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(confidence: f64) -> KnowledgeSummaryUpdate {
        KnowledgeSummaryUpdate {
            learner_id: LearnerId::new("l").unwrap(),
            module_id: ModuleId::new("1").unwrap(),
            module_title: "Intro".into(),
            summary: "Explored Intro: feedback loops".into(),
            confidence,
            retention_strength: 2.0,
            links: vec![],
        }
    }

    #[test]
    fn blend_starts_from_initial_confidence() {
        let blended = blend_confidence(None, 0.9);
        assert!((blended - (0.7 * 0.5 + 0.3 * 0.9)).abs() < 1e-9);
    }

    #[test]
    fn blend_uses_previous_value() {
        let blended = blend_confidence(Some(1.0), 0.4);
        assert!((blended - 0.82).abs() < 1e-9);
    }

    #[test]
    fn into_record_clamps_scores() {
        let record = update(-1.0).into_record(Timestamp::now());
        assert_eq!(record.confidence, 0.0);
        assert_eq!(record.retention_strength, 1.0);
    }

    #[test]
    fn render_line_includes_links_when_present() {
        let mut record = update(0.5).into_record(Timestamp::now());
        assert!(!record.render_line().contains("links"));
        record.links = vec!["Media Literacy".into()];
        assert!(record.render_line().ends_with("[links: Media Literacy]"));
    }
}
