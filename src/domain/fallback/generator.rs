//! Local question generator used when the language-model provider is
//! unavailable. Deterministic: the same message always yields the same reply.

use super::templates::FallbackTemplates;
use crate::domain::compliance::text::{has_cue, padded_words};

#[derive(Debug, Clone, Default)]
pub struct FallbackGenerator {
    templates: FallbackTemplates,
}

impl FallbackGenerator {
    pub fn new(templates: FallbackTemplates) -> Self {
        Self { templates }
    }

    /// Picks the reply of the first rule whose keyword appears in the
    /// learner message. The result always contains a question mark.
    pub fn generate(&self, learner_message: &str) -> String {
        let padded = padded_words(learner_message);
        let reply = self
            .templates
            .rules
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .any(|k| has_cue(&padded, &k))
            })
            .map(|rule| rule.reply.as_str())
            .unwrap_or(self.templates.default_reply.as_str());

        if reply.contains('?') {
            reply.to_string()
        } else {
            // Unvalidated template sets still must not produce a statement.
            format!("{} What do you think?", reply)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fallback::TemplateRule;

    #[test]
    fn communication_keyword_wins_first() {
        let reply = FallbackGenerator::default().generate("How does communication break down?");
        assert!(reply.contains("recent conversation"));
    }

    #[test]
    fn definition_question_gets_definition_prompt() {
        let reply = FallbackGenerator::default().generate("What is encoding?");
        assert!(reply.starts_with("That's an excellent question!"));
    }

    #[test]
    fn unmatched_message_gets_default_reply() {
        let reply = FallbackGenerator::default().generate("I like cats");
        assert!(reply.contains("What experiences have you had"));
    }

    #[test]
    fn keyword_matching_is_whole_word() {
        let reply = FallbackGenerator::default().generate("Somehow I am lost");
        assert!(reply.contains("What experiences have you had"));
    }

    #[test]
    fn is_deterministic() {
        let generator = FallbackGenerator::default();
        assert_eq!(generator.generate("why?"), generator.generate("why?"));
    }

    #[test]
    fn always_contains_question_mark() {
        let generator = FallbackGenerator::new(FallbackTemplates {
            rules: vec![TemplateRule {
                keywords: vec!["media".into()],
                reply: "Media shapes views.".into(),
            }],
            default_reply: "Tell me more.".into(),
        });
        for message in ["media", "anything", ""] {
            assert!(generator.generate(message).contains('?'));
        }
    }
}
