// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// By programming against traits instead of concrete types,
// the application layer can swap corpus formats without
// changing the training workflow:
//   - ParallelCorpusLoader implements CorpusSource
//   - A future TsvLoader could also implement CorpusSource
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::sentence_pair::SentencePair;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can load an aligned parallel corpus.
///
/// Implementations:
///   - ParallelCorpusLoader → line-aligned text file pairs
pub trait CorpusSource {
    /// Load all aligned sentence pairs of the named split
    /// (e.g. "train" or "test").
    fn load_pairs(&self, split: &str) -> Result<Vec<SentencePair>>;
}
