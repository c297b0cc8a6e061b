//! Text cleanup for search queries and displayed slide text.
//!
//! Applies Unicode NFC normalization, collapses runs of whitespace
//! (including line breaks) and truncates long snippets on a character
//! boundary.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse any whitespace run, line breaks included, into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Appended to snippets that were cut short.
const ELLIPSIS: char = '…';

/// Default snippet length in characters.
const DEFAULT_SNIPPET_CHARS: usize = 160;

/// Normalizer for single-line display text.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    /// Maximum characters kept in a snippet before truncation.
    max_snippet_chars: usize,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self {
            max_snippet_chars: DEFAULT_SNIPPET_CHARS,
        }
    }
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snippet length limit.
    pub fn with_max_snippet_chars(mut self, chars: usize) -> Self {
        self.max_snippet_chars = chars.max(1);
        self
    }

    /// NFC-normalize, collapse whitespace and trim.
    pub fn normalize_line(&self, text: &str) -> String {
        let composed: String = text.nfc().collect();
        WHITESPACE_COLLAPSE_REGEX
            .replace_all(&composed, " ")
            .trim()
            .to_string()
    }

    /// Normalize a search query. Returns `None` when nothing is left.
    pub fn normalize_query(&self, query: &str) -> Option<String> {
        let normalized = self.normalize_line(query);
        if normalized.is_empty() {
            None
        } else {
            Some(normalized)
        }
    }

    /// Single-line snippet, truncated with an ellipsis when too long.
    pub fn snippet(&self, text: &str) -> String {
        let line = self.normalize_line(text);
        if line.chars().count() <= self.max_snippet_chars {
            return line;
        }

        let mut cut: String = line.chars().take(self.max_snippet_chars).collect();
        let trimmed_len = cut.trim_end().len();
        cut.truncate(trimmed_len);
        cut.push(ELLIPSIS);
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace_and_newlines() {
        let normalizer = TextNormalizer::new();
        assert_eq!(
            normalizer.normalize_line("  cell \n\n membrane\t\tstructure "),
            "cell membrane structure"
        );
    }

    #[test]
    fn test_nfc_composition() {
        let normalizer = TextNormalizer::new();
        // "e" + combining acute accent becomes a single code point
        assert_eq!(normalizer.normalize_line("caf\u{0065}\u{0301}"), "caf\u{00e9}");
    }

    #[test]
    fn test_empty_query_is_none() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize_query("   \n\t "), None);
        assert_eq!(
            normalizer.normalize_query("  mitochondria  "),
            Some("mitochondria".to_string())
        );
    }

    #[test]
    fn test_short_snippet_untouched() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.snippet("short text"), "short text");
    }

    #[test]
    fn test_long_snippet_truncated_on_char_boundary() {
        let normalizer = TextNormalizer::new().with_max_snippet_chars(5);
        assert_eq!(normalizer.snippet("光合作用是植物"), "光合作用是…");
        assert_eq!(normalizer.snippet("abcd efgh"), "abcd…");
    }
}
