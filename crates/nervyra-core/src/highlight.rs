//! Autocompletion annotation
//!
//! Marks which words of a matched clause's wording the user did not type, so
//! the presentation layer can show them as autocompleted. Comparison is
//! plural-aware (`floods` covers `Flood`) but otherwise exact; no markup is
//! produced here.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::library::ClauseEntry;
use crate::normalizer::folded_words;

/// One whitespace-delimited word of clause wording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSegment {
    /// The word exactly as it appears in the clause, punctuation included.
    pub text: String,
    /// True when the user's input did not contain this word.
    pub autocompleted: bool,
}

/// Annotate each word of `clause_text` against `user_text`.
pub fn annotate_completion(user_text: &str, clause_text: &str) -> Vec<CompletionSegment> {
    let typed: HashSet<String> = folded_words(user_text).into_iter().collect();

    clause_text
        .split_whitespace()
        .map(|word| {
            let folded = folded_words(word);
            // Pure punctuation (a dash between title and limit) is never completion.
            let autocompleted = !folded.is_empty() && folded.iter().any(|w| !typed.contains(w));
            CompletionSegment {
                text: word.to_string(),
                autocompleted,
            }
        })
        .collect()
}

/// Annotate the display text (`title – limit`) of a matched clause.
pub fn annotate_entry(user_text: &str, entry: &ClauseEntry) -> Vec<CompletionSegment> {
    annotate_completion(user_text, &entry.display_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(segments: &[CompletionSegment]) -> Vec<(&str, bool)> {
        segments
            .iter()
            .map(|s| (s.text.as_str(), s.autocompleted))
            .collect()
    }

    #[test]
    fn test_typed_words_are_not_autocompleted() {
        let segments = annotate_completion("war invasion", "War and Invasion Exclusion");
        assert_eq!(
            flags(&segments),
            vec![
                ("War", false),
                ("and", true),
                ("Invasion", false),
                ("Exclusion", true),
            ]
        );
    }

    #[test]
    fn test_plural_aware() {
        let segments = annotate_completion("floods and storms", "Flood, Storm Extension");
        assert_eq!(
            flags(&segments),
            vec![("Flood,", false), ("Storm", false), ("Extension", true)]
        );
    }

    #[test]
    fn test_punctuation_only_words_never_autocompleted() {
        let segments = annotate_completion("", "Flood – USD 5m");
        assert_eq!(
            flags(&segments),
            vec![("Flood", true), ("–", false), ("USD", true), ("5m", true)]
        );
    }

    #[test]
    fn test_annotate_entry_uses_display_text() {
        let entry = ClauseEntry::new("1", "Debris Removal", "debris removal").with_limit("10%");
        let segments = annotate_entry("removal of debris", &entry);
        assert_eq!(
            flags(&segments),
            vec![("Debris", false), ("Removal", false), ("–", false), ("10%", true)]
        );
    }

    #[test]
    fn test_empty_clause_text() {
        assert!(annotate_completion("anything", "").is_empty());
    }
}
