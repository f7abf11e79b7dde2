// ============================================================
// Layer 3 — Span Domain Type
// ============================================================
// A contiguous token range identified by inclusive (start, end)
// indices. The encoder assigns a learned vector to every span
// of the source sentence; the decoder walks candidate spans of
// the target sentence.
//
// The valid span set of a sentence with n tokens is the upper
// triangle {(i, j) : 0 ≤ i ≤ j < n}, of size n(n+1)/2.

use serde::{Deserialize, Serialize};

/// A contiguous token range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index of the first token in the span
    pub start: usize,

    /// Index of the last token in the span (inclusive)
    pub end: usize,
}

impl Span {
    /// Create a new Span.
    ///
    /// # Panics
    /// Panics if start > end — such a span has no tokens and
    /// must never be constructed.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "span start ({}) must not exceed end ({})",
            start,
            end
        );
        Self { start, end }
    }

    /// Number of tokens covered by the span.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// True when the span covers token position `pos`.
    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos <= self.end
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_is_inclusive() {
        assert_eq!(Span::new(2, 2).len(), 1);
        assert_eq!(Span::new(0, 4).len(), 5);
    }

    #[test]
    fn test_contains() {
        let s = Span::new(1, 3);
        assert!(!s.contains(0));
        assert!(s.contains(1));
        assert!(s.contains(3));
        assert!(!s.contains(4));
    }

    #[test]
    #[should_panic]
    fn test_inverted_span_panics() {
        let _ = Span::new(3, 1);
    }
}
