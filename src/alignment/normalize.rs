use std::collections::HashSet;

/// Collapse runs of whitespace to a single space and case-fold.
///
/// Segment text and aligner candidates go through the same function so that
/// equality and containment checks in the reconciler compare like with like.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}

/// Words in order with surrounding punctuation stripped, empties dropped.
pub(crate) fn word_tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .collect()
}

pub(crate) fn word_set(normalized: &str) -> HashSet<&str> {
    word_tokens(normalized).into_iter().collect()
}

/// True when the words of `needle` appear as a contiguous run of whole words
/// in `haystack`. Punctuation around words is ignored; an empty needle never
/// matches.
pub(crate) fn contains_words(haystack: &str, needle: &str) -> bool {
    let needle = word_tokens(needle);
    if needle.is_empty() {
        return false;
    }
    word_tokens(haystack)
        .windows(needle.len())
        .any(|run| run == needle.as_slice())
}

/// Jaccard similarity of the word sets of two normalized strings.
pub(crate) fn word_jaccard(a: &str, b: &str) -> f64 {
    let left = word_set(a);
    let right = word_set(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    let union = left.union(&right).count();
    shared as f64 / union as f64
}

const TRAILING_CLOSERS: &[char] = &['"', '\'', ')', ']', '}', '\u{201d}', '\u{2019}', '\u{bb}'];
const TERMINAL_PUNCTUATION: &[char] = &['.', '!', '?', ';', ':', '\u{2026}'];

/// True when a word ends a clause, looking through closing quotes/brackets.
pub fn ends_with_terminal_punctuation(word: &str) -> bool {
    word.trim_end()
        .trim_end_matches(TRAILING_CLOSERS)
        .ends_with(TERMINAL_PUNCTUATION)
}
