//! Fixed keyword lexicons for the deterministic classification layer.
//!
//! Scan order is declaration order and the first match wins, so reordering a
//! list changes which keyword a reason names. Crisis phrases match as
//! substrings ("fall" also catches "falling"); single-word lists match whole
//! words only, so "no" does not fire inside "know".

use std::sync::LazyLock;

use regex::Regex;

/// Phrases that indicate an acute crisis.
pub const CRISIS_KEYWORDS: &[&str] = &[
    "fall",
    "fell",
    "chest pain",
    "hurt myself",
    "suicide",
    "emergency",
    "blood",
    "help me",
];

/// Words that indicate emotional distress short of a crisis.
pub const DISTRESS_KEYWORDS: &[&str] = &[
    "sad",
    "lonely",
    "alone",
    "scared",
    "afraid",
    "confused",
    "worried",
    "anxious",
];

/// Replies that confirm an outstanding emergency question.
pub const AFFIRMATIVE_REPLIES: &[&str] = &["yes", "please", "help"];

/// Replies that decline an outstanding emergency question.
pub const NEGATIVE_REPLIES: &[&str] = &["no", "fine", "wait"];

static DISTRESS_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> =
    LazyLock::new(|| word_patterns(DISTRESS_KEYWORDS));
static AFFIRMATIVE_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> =
    LazyLock::new(|| word_patterns(AFFIRMATIVE_REPLIES));
static NEGATIVE_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> =
    LazyLock::new(|| word_patterns(NEGATIVE_REPLIES));

fn word_patterns(words: &[&'static str]) -> Vec<(&'static str, Regex)> {
    words
        .iter()
        .map(|word| {
            let pattern = format!(r"\b{}\b", regex::escape(word));
            (*word, Regex::new(&pattern).unwrap())
        })
        .collect()
}

/// First crisis keyword contained in the utterance, in declaration order.
pub fn crisis_match(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    CRISIS_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| lower.contains(keyword))
}

/// First distress keyword appearing as a whole word, in declaration order.
pub fn distress_match(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    DISTRESS_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(&lower))
        .map(|(word, _)| *word)
}

/// True if the utterance reads as confirming the outstanding question.
pub fn is_affirmative(text: &str) -> bool {
    let lower = text.to_lowercase();
    AFFIRMATIVE_PATTERNS
        .iter()
        .any(|(_, pattern)| pattern.is_match(&lower))
}

/// True if the utterance reads as declining the outstanding question.
pub fn is_negative(text: &str) -> bool {
    let lower = text.to_lowercase();
    NEGATIVE_PATTERNS
        .iter()
        .any(|(_, pattern)| pattern.is_match(&lower))
}
