//! Tokenizer for `text` fields.
//!
//! Text is split on whitespace, ASCII punctuation and any configured extra
//! separators. Tokens outside the configured length bounds are skipped and
//! the rest are optionally lowercased.

use serde::{Deserialize, Serialize};

/// Configuration for the text tokenizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Minimum token length to index, in bytes.
    pub min_token_length: usize,
    /// Maximum token length to index, in bytes.
    pub max_token_length: usize,
    /// Whether tokens are lowercased.
    pub case_insensitive: bool,
    /// Additional characters to treat as separators.
    pub extra_separators: Vec<char>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            min_token_length: 1,
            max_token_length: 256,
            case_insensitive: true,
            extra_separators: vec![],
        }
    }
}

impl TokenizerConfig {
    /// Creates a new tokenizer configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets minimum token length.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_token_length = len;
        self
    }

    /// Sets maximum token length.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_token_length = len;
        self
    }

    /// Keeps token case.
    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.case_insensitive = false;
        self
    }

    /// Adds extra separator characters.
    #[must_use]
    pub fn with_separators(mut self, chars: &[char]) -> Self {
        self.extra_separators.extend_from_slice(chars);
        self
    }
}

/// Splits text into index tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    /// Creates a tokenizer.
    #[must_use]
    pub fn new(config: TokenizerConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Tokenizes `text`, keeping duplicates in order of appearance.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let config = &self.config;
        let is_separator = |c: char| {
            c.is_whitespace() || c.is_ascii_punctuation() || config.extra_separators.contains(&c)
        };

        text.split(is_separator)
            .filter(|token| {
                !token.is_empty()
                    && token.len() >= config.min_token_length
                    && token.len() <= config.max_token_length
            })
            .map(|token| self.normalize(token))
            .collect()
    }

    /// Applies case folding to a single query term.
    pub fn normalize(&self, token: &str) -> String {
        if self.config.case_insensitive {
            token.to_lowercase()
        } else {
            token.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace_and_punctuation() {
        let tokenizer = Tokenizer::default();
        assert_eq!(
            tokenizer.tokenize("Hello, World! It's  fine."),
            vec!["hello", "world", "it", "s", "fine"]
        );
    }

    #[test]
    fn length_bounds() {
        let tokenizer = Tokenizer::new(TokenizerConfig::new().min_length(3).max_length(5));
        assert_eq!(
            tokenizer.tokenize("a bb ccc dddd eeeeee"),
            vec!["ccc", "dddd"]
        );
    }

    #[test]
    fn case_sensitive() {
        let tokenizer = Tokenizer::new(TokenizerConfig::new().case_sensitive());
        assert_eq!(tokenizer.tokenize("Rust rust"), vec!["Rust", "rust"]);
        assert_eq!(tokenizer.normalize("Rust"), "Rust");
    }

    #[test]
    fn extra_separators() {
        let tokenizer = Tokenizer::new(TokenizerConfig::new().with_separators(&['|']));
        assert_eq!(tokenizer.tokenize("a|b c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn config_from_json_uses_defaults() {
        let config: TokenizerConfig = serde_json::from_str(r#"{"min_token_length": 2}"#).unwrap();
        assert_eq!(config.min_token_length, 2);
        assert_eq!(config.max_token_length, 256);
        assert!(config.case_insensitive);
    }
}
