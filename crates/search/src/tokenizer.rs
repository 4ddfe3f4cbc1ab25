//! Tokenizer shared by the lexical and sparse indexes
//!
//! Both indexes must tokenize identically, otherwise BM25 statistics and
//! the sparse vocabulary would disagree about what a term is.

use std::collections::HashMap;

/// Minimum token length (in chars) that survives tokenization, exclusive
const MIN_TOKEN_CHARS: usize = 2;

/// Tokenize text into searchable terms
///
/// - Lowercase
/// - Replace every character that is neither a word character
///   (alphanumeric or `_`) nor whitespace with a space
/// - Split on whitespace
/// - Drop tokens of 2 characters or fewer
///
/// # Example
///
/// ```
/// use fusionrank_search::tokenizer::tokenize;
///
/// let tokens = tokenize("Machine-Learning is AI!");
/// assert_eq!(tokens, vec!["machine", "learning"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if is_word_char(c) || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|s| s.chars().count() > MIN_TOKEN_CHARS)
        .map(String::from)
        .collect()
}

/// Tokenize and deduplicate, keeping first occurrences
///
/// # Example
///
/// ```
/// use fusionrank_search::tokenizer::tokenize_unique;
///
/// let tokens = tokenize_unique("test test TEST");
/// assert_eq!(tokens, vec!["test"]);
/// ```
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Count occurrences of each token
pub fn term_counts(tokens: &[String]) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u32> = HashMap::with_capacity(tokens.len());
    for token in tokens {
        *counts.entry(token.clone()).or_insert(0) += 1;
    }
    counts
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("Hello, World!");
        assert_eq!(tokens, vec!["hello", "world"]);
    }

    #[test]
    fn test_tokenize_filters_short() {
        let tokens = tokenize("I am a big test");
        // "I", "am", "a" filtered (<= 2 chars)
        assert_eq!(tokens, vec!["big", "test"]);
    }

    #[test]
    fn test_tokenize_hyphen_splits() {
        assert_eq!(tokenize("Machine-Learning"), vec!["machine", "learning"]);
    }

    #[test]
    fn test_tokenize_keeps_underscore() {
        assert_eq!(tokenize("snake_case name"), vec!["snake_case", "name"]);
    }

    #[test]
    fn test_tokenize_numbers() {
        let tokens = tokenize("test123 foo456bar 42");
        assert_eq!(tokens, vec!["test123", "foo456bar"]);
    }

    #[test]
    fn test_tokenize_counts_chars_not_bytes() {
        // "éé" is 4 bytes but 2 chars
        assert!(tokenize("éé").is_empty());
        assert_eq!(tokenize("café"), vec!["café"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_tokenize_only_punctuation() {
        assert!(tokenize("...---...").is_empty());
    }

    #[test]
    fn test_tokenize_preserves_duplicates() {
        assert_eq!(tokenize("data data"), vec!["data", "data"]);
    }

    #[test]
    fn test_tokenize_unique() {
        let tokens = tokenize_unique("test test TEST");
        assert_eq!(tokens, vec!["test"]);
    }

    #[test]
    fn test_tokenize_unique_preserves_order() {
        let tokens = tokenize_unique("apple banana apple cherry");
        assert_eq!(tokens, vec!["apple", "banana", "cherry"]);
    }

    #[test]
    fn test_term_counts() {
        let counts = term_counts(&tokenize("data science data"));
        assert_eq!(counts.get("data"), Some(&2));
        assert_eq!(counts.get("science"), Some(&1));
        assert_eq!(counts.len(), 2);
    }
}
