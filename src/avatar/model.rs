//! Avatar records and bracket patterns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token that marks where the spoken text sits inside a bracket.
pub const PLACEHOLDER: &str = "text";

/// Icon used when a stored avatar has none.
pub const DEFAULT_ICON: &str = "https://st3.depositphotos.com/9998432/13335/v/450/depositphotos_133352156-stock-illustration-default-placeholder-profile-icon.jpg";

/// A persisted persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub id: u64,
    pub owner_id: u64,
    pub name: String,
    pub bracket: String,
    pub icon_url: String,
    pub species: String,
    pub level: u8,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert an avatar. The store assigns id, level and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAvatar {
    pub owner_id: u64,
    pub name: String,
    pub bracket: String,
    pub icon_url: String,
    pub species: String,
}

/// A bracket split around its placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bracket<'a> {
    pub prefix: &'a str,
    pub suffix: &'a str,
}

/// Why a bracket string cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketError {
    Empty,
    MissingPlaceholder,
    RepeatedPlaceholder,
    /// Placeholder alone: it would match every message.
    Degenerate,
}

impl BracketError {
    pub fn message(&self) -> &'static str {
        match self {
            BracketError::Empty => "Bracket cannot be empty",
            BracketError::MissingPlaceholder => "Bracket must contain the word 'text'",
            BracketError::RepeatedPlaceholder => {
                "Bracket must contain exactly one 'text' placeholder"
            }
            BracketError::Degenerate => {
                "Bracket needs something around 'text', e.g. '[text]' or 'k:text'"
            }
        }
    }
}

impl<'a> Bracket<'a> {
    pub fn parse(raw: &'a str) -> Result<Self, BracketError> {
        if raw.trim().is_empty() {
            return Err(BracketError::Empty);
        }
        let (prefix, suffix) = raw
            .split_once(PLACEHOLDER)
            .ok_or(BracketError::MissingPlaceholder)?;
        if suffix.contains(PLACEHOLDER) {
            return Err(BracketError::RepeatedPlaceholder);
        }
        if prefix.is_empty() && suffix.is_empty() {
            return Err(BracketError::Degenerate);
        }
        Ok(Self { prefix, suffix })
    }

    /// The text between prefix and suffix, trimmed, if `content` is wrapped by this bracket.
    pub fn extract<'c>(&self, content: &'c str) -> Option<&'c str> {
        if content.len() < self.prefix.len() + self.suffix.len() {
            return None;
        }
        let inner = content.strip_prefix(self.prefix)?;
        let inner = inner.strip_suffix(self.suffix)?;
        Some(inner.trim())
    }

    /// Wrap `text` in this bracket, e.g. for previews.
    pub fn wrap(&self, text: &str) -> String {
        format!("{}{}{}", self.prefix, text, self.suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_bracket_extract() {
        let bracket = Bracket::parse("[text]").unwrap();
        assert_eq!(bracket.extract("[Hello there!]"), Some("Hello there!"));
        assert_eq!(bracket.extract("Hello there!"), None);
        assert_eq!(bracket.extract("[Hello there!"), None);
    }

    #[test]
    fn test_prefix_only_and_suffix_only() {
        let prefix = Bracket::parse("k:text").unwrap();
        assert_eq!(prefix.extract("k: hi"), Some("hi"));
        assert_eq!(prefix.extract("hi k:"), None);

        let suffix = Bracket::parse("text -k").unwrap();
        assert_eq!(suffix.extract("hi -k"), Some("hi"));
        assert_eq!(suffix.extract("-k hi"), None);
    }

    #[test]
    fn test_placeholder_alone_is_rejected() {
        assert_eq!(Bracket::parse("text"), Err(BracketError::Degenerate));
    }

    #[test]
    fn test_malformed_brackets() {
        assert_eq!(Bracket::parse(""), Err(BracketError::Empty));
        assert_eq!(Bracket::parse("   "), Err(BracketError::Empty));
        assert_eq!(Bracket::parse("[]"), Err(BracketError::MissingPlaceholder));
        assert_eq!(
            Bracket::parse("[text|text]"),
            Err(BracketError::RepeatedPlaceholder)
        );
    }

    #[test]
    fn test_overlapping_prefix_and_suffix_do_not_match() {
        let bracket = Bracket::parse("*text*").unwrap();
        assert_eq!(bracket.extract("*"), None);
        assert_eq!(bracket.extract("**"), Some(""));
        assert_eq!(bracket.extract("*wave*"), Some("wave"));
    }

    #[test]
    fn test_round_trip() {
        let brackets = ["[text]", "(text)", "k:text", "text::", ">> text <<", "{{text}"];
        let texts = ["Hello", "  padded  ", "", "multi\nline", "[nested]", "text"];
        for raw in brackets {
            let bracket = Bracket::parse(raw).unwrap();
            for text in texts {
                let message = raw.replacen(PLACEHOLDER, text, 1);
                assert_eq!(
                    bracket.extract(&message),
                    Some(text.trim()),
                    "bracket {raw:?} text {text:?}"
                );
            }
        }
    }

    #[test]
    fn test_wrap() {
        let bracket = Bracket::parse("[text]").unwrap();
        assert_eq!(bracket.wrap("Hello there!"), "[Hello there!]");
    }
}
