//! Engagement cues in tutor replies and learner messages.

use super::text::{has_cue, padded_words};

/// Phrases that signal a discovery-oriented reply.
pub const DISCOVERY_CUES: &[&str] = &[
    "what",
    "how",
    "why",
    "can you think",
    "have you noticed",
    "consider",
    "imagine",
];

/// Phrases that signal the learner is reflecting rather than asking.
pub const INSIGHT_CUES: &[&str] = &[
    "i think",
    "i realize",
    "i see",
    "i understand",
    "i learned",
    "because",
    "that means",
];

/// Number of distinct discovery cues present in a reply.
pub fn discovery_cue_count(reply: &str) -> usize {
    let padded = padded_words(reply);
    DISCOVERY_CUES.iter().filter(|cue| has_cue(&padded, cue)).count()
}

/// True when a learner message shows a moment of insight.
pub fn shows_insight(learner_message: &str) -> bool {
    let padded = padded_words(learner_message);
    INSIGHT_CUES.iter().any(|cue| has_cue(&padded, cue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_cue_once() {
        assert_eq!(discovery_cue_count("What? What? What?"), 1);
        assert_eq!(
            discovery_cue_count("What do you think causes this? How might it apply to your life?"),
            2
        );
    }

    #[test]
    fn no_cues_in_plain_statement() {
        assert_eq!(discovery_cue_count("Communication happens everywhere."), 0);
    }

    #[test]
    fn insight_detected_from_reflection() {
        assert!(shows_insight("Oh, I realize now that tone matters"));
        assert!(shows_insight("It failed because nobody listened"));
    }

    #[test]
    fn insight_not_detected_in_plain_question() {
        assert!(!shows_insight("What is encoding?"));
        assert!(!shows_insight("I seem lost"));
    }
}
