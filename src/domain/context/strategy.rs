//! Teaching-strategy lines derived from module titles and learner messages.

use crate::domain::compliance::text::{has_cue, padded_words, words};
use crate::domain::conversation::StoredMessage;

/// Messages inspected when summarizing what the dialogue is about.
const DIALOGUE_WINDOW: usize = 5;

/// Topics recognized in recent dialogue, in reporting order.
const TOPICS: &[&str] = &["communication", "media", "society"];

const BRIEF_MESSAGE_WORDS: usize = 5;

/// Questioning strategy for a module, keyed on title keywords.
pub fn socratic_strategy(module_title: &str) -> &'static str {
    let title = module_title.to_lowercase();
    if title.contains("communication") {
        "Guide discovery of communication principles through real-world examples"
    } else if title.contains("media") {
        "Question assumptions about media influence and bias"
    } else if title.contains("society") {
        "Explore social connections through critical questioning"
    } else {
        "Use strategic questioning to reveal underlying concepts"
    }
}

/// How the tutor should respond to the current learner message.
pub fn response_strategy(message: &str) -> &'static str {
    let padded = padded_words(message);
    if message.contains('?') {
        "Learner is asking; guide with counter-questions"
    } else if ["what", "how", "why", "when", "where"]
        .iter()
        .any(|cue| has_cue(&padded, cue))
    {
        "Exploratory inquiry; use the Socratic method"
    } else if ["think", "believe", "feel"].iter().any(|cue| has_cue(&padded, cue)) {
        "Opinion or reflection; probe the reasoning behind it"
    } else if words(message).len() < BRIEF_MESSAGE_WORDS {
        "Brief response; encourage elaboration"
    } else {
        "Detailed input; identify key concepts to explore"
    }
}

/// One-line digest of what the last few messages are about.
pub fn dialogue_context(messages: &[StoredMessage]) -> String {
    if messages.is_empty() {
        return "Beginning new dialogue".to_string();
    }

    let start = messages.len().saturating_sub(DIALOGUE_WINDOW);
    let recent: Vec<String> = messages[start..]
        .iter()
        .map(|m| m.text.to_lowercase())
        .collect();

    let topics: Vec<&str> = TOPICS
        .iter()
        .copied()
        .filter(|topic| recent.iter().any(|text| text.contains(topic)))
        .collect();

    if topics.is_empty() {
        "Active dialogue in progress".to_string()
    } else {
        format!("Discussing: {}", topics.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::MessageDraft;
    use crate::domain::foundation::{ConversationId, Timestamp};

    fn messages(texts: &[&str]) -> Vec<StoredMessage> {
        let conversation_id = ConversationId::new();
        texts
            .iter()
            .map(|t| MessageDraft::learner(*t).into_stored(conversation_id, Timestamp::now()))
            .collect()
    }

    #[test]
    fn strategy_follows_title_keywords() {
        assert!(socratic_strategy("Intro to Communication").contains("communication principles"));
        assert!(socratic_strategy("Mass Media").contains("media influence"));
        assert!(socratic_strategy("Society and You").contains("social connections"));
        assert!(socratic_strategy("Statistics").contains("underlying concepts"));
    }

    #[test]
    fn response_strategy_classifies_messages() {
        assert!(response_strategy("Is it true?").contains("counter-questions"));
        assert!(response_strategy("I wonder why people argue").contains("Socratic"));
        assert!(response_strategy("I believe tone matters most").contains("reasoning"));
        assert!(response_strategy("ok sure").contains("elaboration"));
        assert!(response_strategy("Listening closely to others builds trust over time")
            .contains("key concepts"));
    }

    #[test]
    fn dialogue_context_for_empty_history() {
        assert_eq!(dialogue_context(&[]), "Beginning new dialogue");
    }

    #[test]
    fn dialogue_context_lists_topics_in_fixed_order() {
        let history = messages(&["Society shapes us", "and media too", "hello"]);
        assert_eq!(dialogue_context(&history), "Discussing: media, society");
    }

    #[test]
    fn dialogue_context_only_looks_at_recent_messages() {
        let history = messages(&["communication", "a", "b", "c", "d", "e"]);
        assert_eq!(dialogue_context(&history), "Active dialogue in progress");
    }
}
