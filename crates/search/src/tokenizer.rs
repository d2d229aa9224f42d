//! Text tokenization for full-text search
//!
//! Deliberately simple: lowercase, split on non-alphanumeric characters,
//! drop tokens shorter than 2 characters. No stemming or stopwords.

/// Tokenize text into searchable terms
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.len() >= 2)
        .map(String::from)
        .collect()
}

/// Tokenize and deduplicate, preserving first-seen order
///
/// Used for query terms, where repeating a term must not change results.
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
