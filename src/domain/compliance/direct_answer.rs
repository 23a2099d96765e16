//! Direct-answer leakage heuristic.
//!
//! Conservative by construction: a miss only costs a metric, a false alarm
//! would mislabel a good reply. English-only.

use super::text::{sentences, words};

/// Phrases that state an answer outright regardless of the question.
const ANSWER_PHRASES: &[&str] = &["the answer is", "it is defined as", "the definition of"];

/// Leading words stripped from a learner question to reach its subject.
const QUESTION_LEADS: &[&[&str]] = &[
    &["what", "is"],
    &["what", "are"],
    &["what's"],
    &["whats"],
    &["what", "does"],
    &["what", "do"],
    &["define"],
    &["explain"],
    &["describe"],
];

/// Trailing words dropped from the subject (`what does X mean`).
const SUBJECT_TAILS: &[&str] = &["mean", "means", "stand", "for"];

const ARTICLES: &[&str] = &["a", "an", "the"];

/// Longest subject, in words, treated as a noun phrase.
const MAX_SUBJECT_WORDS: usize = 5;

/// Extracts the core noun phrase a learner is asking about, if the message
/// has a recognizable definition-seeking shape.
pub fn question_subject(learner_message: &str) -> Option<Vec<String>> {
    let tokens = words(learner_message);
    let lead = QUESTION_LEADS
        .iter()
        .find(|lead| tokens.len() > lead.len() && tokens.iter().zip(lead.iter()).all(|(t, l)| t == l))?;

    let mut subject: Vec<String> = tokens[lead.len()..].to_vec();
    while subject.first().is_some_and(|w| ARTICLES.contains(&w.as_str())) {
        subject.remove(0);
    }
    while subject.last().is_some_and(|w| SUBJECT_TAILS.contains(&w.as_str())) {
        subject.pop();
    }

    if subject.is_empty() || subject.len() > MAX_SUBJECT_WORDS {
        None
    } else {
        Some(subject)
    }
}

/// True when the reply appears to hand the learner the answer.
pub fn detects_direct_answer(reply: &str, learner_message: &str) -> bool {
    let lowered = reply.to_lowercase();
    if ANSWER_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        return true;
    }

    let Some(subject) = question_subject(learner_message) else {
        return false;
    };

    sentences(reply)
        .into_iter()
        .filter(|s| !s.is_question)
        .any(|s| starts_with_definition(&words(s.text), &subject))
}

/// `[article] <subject> is|are ...`
fn starts_with_definition(sentence: &[String], subject: &[String]) -> bool {
    let rest = match sentence.first() {
        Some(first) if ARTICLES.contains(&first.as_str()) => &sentence[1..],
        _ => sentence,
    };
    if rest.len() <= subject.len() || rest[..subject.len()] != *subject {
        return false;
    }
    matches!(rest[subject.len()].as_str(), "is" | "are")
}

#[cfg(test)]
mod tests {
    use super::*;

    mod subject_extraction {
        use super::*;

        #[test]
        fn what_is_question_yields_subject() {
            assert_eq!(
                question_subject("What is nonverbal communication?"),
                Some(vec!["nonverbal".to_string(), "communication".to_string()])
            );
        }

        #[test]
        fn strips_articles_and_mean() {
            assert_eq!(
                question_subject("what does the term encoding mean"),
                Some(vec!["term".to_string(), "encoding".to_string()])
            );
        }

        #[test]
        fn non_definition_question_has_no_subject() {
            assert_eq!(question_subject("How do I get better at listening?"), None);
            assert_eq!(question_subject("What is"), None);
        }

        #[test]
        fn long_subject_is_ignored() {
            assert_eq!(
                question_subject("What is the thing that people always say about it when talking?"),
                None
            );
        }
    }

    mod detection {
        use super::*;

        #[test]
        fn definition_sentence_is_flagged() {
            assert!(detects_direct_answer(
                "Communication is the exchange of meaning. Does that help?",
                "What is communication?"
            ));
        }

        #[test]
        fn plural_subject_with_are_is_flagged() {
            assert!(detects_direct_answer(
                "The channels are the paths messages travel.",
                "What are channels?"
            ));
        }

        #[test]
        fn question_about_subject_is_not_flagged() {
            assert!(!detects_direct_answer(
                "Communication is everywhere, isn't it? What do you notice?",
                "How does communication work?"
            ));
            assert!(!detects_direct_answer(
                "Communication is what, in your view?",
                "What is communication?"
            ));
        }

        #[test]
        fn explicit_answer_phrase_is_flagged() {
            assert!(detects_direct_answer("Well, the answer is 42.", "Tell me"));
        }

        #[test]
        fn socratic_reply_is_not_flagged() {
            assert!(!detects_direct_answer(
                "What do you think communication involves? Can you think of an example?",
                "What is communication?"
            ));
        }
    }
}
