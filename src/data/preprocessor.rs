// ============================================================
// Layer 4 — Sentence Preprocessor
// ============================================================
// Normalises raw corpus sentences before vocabulary lookup.
//
// Cleaning steps (applied to both sides):
//   1. Replace tabs, non-breaking and zero-width spaces, and
//      control characters with plain spaces
//   2. Lowercase
//   3. Collapse runs of spaces and trim the edges
//
// The source side additionally gets its token order REVERSED
// when configured. Feeding the source sentence backwards puts
// the beginning of the sentence closest to where the decoder
// starts emitting, which shortens the recurrent dependency
// between a source word and its usual translation position.
//
// Reference: Sutskever et al. (2014) — sequence reversal trick
//            Rust Book §8 (Strings in Rust)

pub struct Preprocessor {
    /// Reverse the token order of source sentences
    reverse_source: bool,
}

impl Preprocessor {
    pub fn new(reverse_source: bool) -> Self {
        Self { reverse_source }
    }

    /// Clean a source-language sentence, reversing token order
    /// when the preprocessor is configured to do so.
    pub fn clean_source(&self, text: &str) -> String {
        let cleaned = normalise(text);
        if self.reverse_source {
            let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
            tokens.reverse();
            tokens.join(" ")
        } else {
            cleaned
        }
    }

    /// Clean a target-language sentence. Target order is never
    /// reversed — the decoder emits it left to right.
    pub fn clean_target(&self, text: &str) -> String {
        normalise(text)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Lowercase, map whitespace variants and control characters to
/// plain spaces, collapse runs of spaces, trim the edges.
fn normalise(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| match c {
            '\t' => ' ',
            // Non-breaking space from copy-pasted corpora
            '\u{00A0}' => ' ',
            // Zero-width space
            '\u{200B}' => ' ',
            // Byte order mark
            '\u{FEFF}' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .flat_map(|c| c.to_lowercase())
        .collect();

    // Collapse runs of spaces into one
    let mut out        = String::with_capacity(mapped.len());
    let mut last_space = false;

    for c in mapped.chars() {
        if c == ' ' {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }

    out.trim().to_string()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_collapses_spaces() {
        let p = Preprocessor::new(false);
        assert_eq!(p.clean_source("Hello   World"), "hello world");
    }

    #[test]
    fn test_trims_edges() {
        let p = Preprocessor::new(false);
        assert_eq!(p.clean_target("  good morning  "), "good morning");
    }

    #[test]
    fn test_removes_control_chars() {
        let p = Preprocessor::new(false);
        assert_eq!(p.clean_source("hello\x01world"), "hello world");
    }

    #[test]
    fn test_source_reversal() {
        let p = Preprocessor::new(true);
        assert_eq!(p.clean_source("the cat sat"), "sat cat the");
        // Target side is never reversed
        assert_eq!(p.clean_target("the cat sat"), "the cat sat");
    }

    #[test]
    fn test_clean_text_is_idempotent() {
        let p     = Preprocessor::new(false);
        let once  = p.clean_source("  Mixed   CASE \t text ");
        let twice = p.clean_source(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new(true);
        assert_eq!(p.clean_source(""), "");
    }
}
