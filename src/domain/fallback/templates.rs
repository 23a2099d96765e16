//! Fallback reply templates.
//!
//! The built-in set covers the common question shapes. Deployments can load
//! their own set from YAML:
//!
//! ```yaml
//! rules:
//!   - keywords: ["communication"]
//!     reply: "Can you think of a recent conversation you had?"
//! default_reply: "What experiences have you had that relate to this topic?"
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a template set.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read template file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse template file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid template set: {0}")]
    Invalid(String),
}

/// Keyword-triggered reply. Keywords match whole lowercase words or phrases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRule {
    pub keywords: Vec<String>,
    pub reply: String,
}

/// Ordered rules plus a catch-all reply. The first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackTemplates {
    pub rules: Vec<TemplateRule>,
    pub default_reply: String,
}

impl FallbackTemplates {
    /// Parses and validates a YAML template set.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, TemplateError> {
        let templates: FallbackTemplates = serde_yaml::from_str(yaml)?;
        templates.validate()?;
        Ok(templates)
    }

    /// Reads, parses and validates a YAML template file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Every reply must ask something; every rule needs a trigger.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if !self.default_reply.contains('?') {
            return Err(TemplateError::Invalid(
                "default_reply must contain a question mark".to_string(),
            ));
        }
        for (idx, rule) in self.rules.iter().enumerate() {
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(TemplateError::Invalid(format!("rule {} has no keywords", idx)));
            }
            if !rule.reply.contains('?') {
                return Err(TemplateError::Invalid(format!(
                    "rule {} reply must contain a question mark",
                    idx
                )));
            }
        }
        Ok(())
    }
}

static BUILT_IN: Lazy<FallbackTemplates> = Lazy::new(FallbackTemplates::built_in);

impl Default for FallbackTemplates {
    fn default() -> Self {
        BUILT_IN.clone()
    }
}

impl FallbackTemplates {
    fn built_in() -> Self {
        let rule = |keywords: &[&str], reply: &str| TemplateRule {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            reply: reply.to_string(),
        };

        Self {
            rules: vec![
                rule(
                    &["communication"],
                    "That's a thought-provoking question about communication! Can you think of a recent conversation you had? What made it effective or challenging?",
                ),
                rule(
                    &["what is", "what are", "what's"],
                    "That's an excellent question! Instead of me telling you what it is, what do you think when you hear that term? What comes to mind from your own experience?",
                ),
                rule(
                    &["how"],
                    "Great question about process! If you had to explain this to a friend, what steps do you think might be involved? What's your intuition telling you?",
                ),
                rule(
                    &["why"],
                    "You're asking about deeper meaning! What do you think might be the underlying reasons? Based on what you already know, what connections can you draw?",
                ),
                rule(
                    &["what"],
                    "I see you're asking an important question! Before I share thoughts, what's your initial thinking on this? What comes to mind first?",
                ),
            ],
            default_reply:
                "That's an interesting perspective! What experiences have you had that relate to this topic?"
                    .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_templates_are_valid() {
        assert!(FallbackTemplates::default().validate().is_ok());
    }

    #[test]
    fn parses_yaml_template_set() {
        let yaml = r#"
rules:
  - keywords: ["media"]
    reply: "Who benefits from this message?"
default_reply: "What do you notice?"
"#;
        let templates = FallbackTemplates::from_yaml_str(yaml).unwrap();
        assert_eq!(templates.rules.len(), 1);
        assert_eq!(templates.rules[0].keywords, vec!["media".to_string()]);
    }

    #[test]
    fn rejects_reply_without_question() {
        let yaml = r#"
rules:
  - keywords: ["media"]
    reply: "Media is powerful."
default_reply: "What do you notice?"
"#;
        match FallbackTemplates::from_yaml_str(yaml) {
            Err(TemplateError::Invalid(msg)) => assert!(msg.contains("rule 0")),
            other => panic!("Expected Invalid error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_rule_without_keywords() {
        let templates = FallbackTemplates {
            rules: vec![TemplateRule {
                keywords: vec!["  ".into()],
                reply: "Why?".into(),
            }],
            default_reply: "What?".into(),
        };
        assert!(templates.validate().is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rules: []\ndefault_reply: \"What stands out to you?\"").unwrap();

        let templates = FallbackTemplates::load_from_path(file.path()).unwrap();
        assert!(templates.rules.is_empty());
        assert_eq!(templates.default_reply, "What stands out to you?");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FallbackTemplates::load_from_path(dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(TemplateError::Io(_))));
    }
}
