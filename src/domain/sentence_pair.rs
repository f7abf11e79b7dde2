// ============================================================
// Layer 3 — SentencePair Domain Type
// ============================================================
// Represents one aligned example from a parallel corpus:
// a sentence in the source language and its reference
// translation in the target language.
//
// Alignment is line-based — line k of the source file and
// line k of the target file form one pair. By the time a
// SentencePair exists, both sides are raw text; cleaning and
// tokenisation happen downstream.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

/// One aligned sentence pair from the parallel corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentencePair {
    /// The source-language sentence, as read from disk
    pub source: String,

    /// The target-language reference translation
    pub target: String,
}

impl SentencePair {
    /// Create a new SentencePair.
    /// Uses impl Into<String> so callers can pass &str or String.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// A pair is degenerate when either side has no tokens at all.
    /// Degenerate pairs are filtered out before sample building.
    pub fn is_degenerate(&self) -> bool {
        self.source.split_whitespace().next().is_none()
            || self.target.split_whitespace().next().is_none()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_detection() {
        assert!(SentencePair::new("", "hallo welt").is_degenerate());
        assert!(SentencePair::new("hello world", "   ").is_degenerate());
        assert!(!SentencePair::new("hello world", "hallo welt").is_degenerate());
    }
}
