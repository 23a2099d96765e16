//! Small text helpers shared by the compliance heuristics.

/// A sentence and whether it ended with a question mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sentence<'a> {
    pub text: &'a str,
    pub is_question: bool,
}

/// Splits on `.`, `?` and `!`, keeping trimmed non-empty segments.
pub(crate) fn sentences(text: &str) -> Vec<Sentence<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '?' | '!') {
            push_sentence(&mut out, &text[start..idx], ch == '?');
            start = idx + ch.len_utf8();
        }
    }
    push_sentence(&mut out, &text[start..], false);
    out
}

fn push_sentence<'a>(out: &mut Vec<Sentence<'a>>, raw: &'a str, is_question: bool) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        out.push(Sentence {
            text: trimmed,
            is_question,
        });
    }
}

/// Lowercased words joined by single spaces and padded with a space on both
/// ends, so cue lookups can match whole words with `contains(" cue ")`.
pub(crate) fn padded_words(text: &str) -> String {
    let mut padded = String::with_capacity(text.len() + 2);
    padded.push(' ');
    for word in words(text) {
        padded.push_str(&word);
        padded.push(' ');
    }
    padded
}

/// Lowercased alphanumeric words; apostrophes stay inside words.
pub(crate) fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// True when `cue` occurs as whole words inside `padded`.
pub(crate) fn has_cue(padded: &str, cue: &str) -> bool {
    padded.contains(&format!(" {} ", cue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentences_split_on_terminal_punctuation() {
        let parts = sentences("One. Two? Three!");
        assert_eq!(parts.len(), 3);
        assert!(!parts[0].is_question);
        assert!(parts[1].is_question);
        assert_eq!(parts[2].text, "Three");
    }

    #[test]
    fn unterminated_text_is_one_sentence() {
        let parts = sentences("no punctuation here");
        assert_eq!(parts.len(), 1);
        assert!(!parts[0].is_question);
    }

    #[test]
    fn empty_segments_are_skipped() {
        assert_eq!(sentences("Really?!? ...").len(), 1);
        assert!(sentences("   ").is_empty());
    }

    #[test]
    fn cues_match_whole_words_only() {
        let padded = padded_words("However, it works.");
        assert!(!has_cue(&padded, "how"));
        let padded = padded_words("How would you CONSIDER it?");
        assert!(has_cue(&padded, "how"));
        assert!(has_cue(&padded, "consider"));
    }

    #[test]
    fn phrase_cues_match_across_punctuation() {
        let padded = padded_words("Can you think... of one?");
        assert!(has_cue(&padded, "can you think"));
    }
}
