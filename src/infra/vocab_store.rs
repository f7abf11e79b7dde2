// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Builds, saves, and loads one word-level vocabulary per
// language side.
//
// A translation model needs two vocabularies — the source and
// target languages share nothing — so the store keeps two
// files side by side:
//
//   checkpoints/
//     vocab.source.json   ← HuggingFace tokenizer JSON
//     vocab.target.json
//
// Both vocabularies reserve the same six marker slots at fixed
// ids, so one MarkerTokens value describes both sides:
//
//   0 <pad>   1 <unk>   2 <sos>   3 <eos>   4 <sop>   5 <eop>
//
// Words below the minimum corpus frequency are dropped and map
// to <unk> at encode time; the remaining words are ranked by
// frequency and capped at the configured vocabulary size.
//
// The vocabulary JSON is written directly in the HuggingFace
// WordLevel format and loaded back through Tokenizer::from_file,
// so training and evaluation are guaranteed to agree on ids.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tokenizers::Tokenizer;

use crate::domain::markers::MarkerTokens;

/// Number of reserved marker slots at the front of every vocabulary.
const RESERVED_SLOTS: usize = 6;

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    /// The reserved marker ids shared by both vocabularies.
    pub fn markers() -> MarkerTokens {
        MarkerTokens::new(0, 1, 2, 3, 4, 5)
    }

    /// Load the named side ("source" or "target") if a saved
    /// vocabulary exists, otherwise build one from `texts` and
    /// save it.
    pub fn load_or_build(
        &self,
        side:       &str,
        texts:      &[String],
        max_vocab:  usize,
        min_freq:   usize,
    ) -> Result<Tokenizer> {
        let path = self.side_path(side);
        if path.exists() {
            tracing::info!("Loading existing {side} vocabulary from disk");
            self.load(side)
        } else {
            tracing::info!("Building {side} vocabulary (max_vocab={max_vocab}, min_freq={min_freq})");
            self.build_and_save(side, texts, max_vocab, min_freq)
        }
    }

    /// Load a previously saved vocabulary.
    pub fn load(&self, side: &str) -> Result<Tokenizer> {
        let path = self.side_path(side);
        Tokenizer::from_file(&path).map_err(|e| {
            anyhow::anyhow!("Cannot load vocabulary from '{}': {}", path.display(), e)
        })
    }

    /// Encode a cleaned sentence into ids, bracketed as
    /// <sos> ids... <eos>.
    pub fn encode_bracketed(tokenizer: &Tokenizer, text: &str) -> Result<Vec<u32>> {
        let markers = Self::markers();
        let enc = tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

        let mut ids = Vec::with_capacity(enc.get_ids().len() + 2);
        ids.push(markers.sos as u32);
        ids.extend_from_slice(enc.get_ids());
        ids.push(markers.eos as u32);
        Ok(ids)
    }

    fn side_path(&self, side: &str) -> PathBuf {
        self.dir.join(format!("vocab.{side}.json"))
    }

    /// Count word frequencies, rank, cap, and write a valid
    /// WordLevel tokenizer JSON for the side.
    fn build_and_save(
        &self,
        side:      &str,
        texts:     &[String],
        max_vocab: usize,
        min_freq:  usize,
    ) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir).ok();

        // ── Step 1: Count every word in the corpus ────────────────────────────
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in text.split_whitespace() {
                *freq.entry(word.to_string()).or_insert(0) += 1;
            }
        }

        // ── Step 2: Rank by frequency, apply cutoff and cap ──────────────────
        let mut words: Vec<(String, usize)> = freq
            .into_iter()
            .filter(|(_, n)| *n >= min_freq)
            .collect();
        // Frequency descending; ties broken alphabetically so the
        // id assignment is stable across runs
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let max_words = max_vocab.saturating_sub(RESERVED_SLOTS);
        words.truncate(max_words);

        // ── Step 3: Assign ids — markers first, then ranked words ────────────
        let markers = Self::markers();
        let mut vocab = serde_json::json!({
            "<pad>": markers.pad,
            "<unk>": markers.unk,
            "<sos>": markers.sos,
            "<eos>": markers.eos,
            "<sop>": markers.sop,
            "<eop>": markers.eop,
        });

        let mut next_id = RESERVED_SLOTS;
        for (word, _) in &words {
            if vocab.get(word).is_none() {
                vocab[word] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        // ── Step 4: Write tokenizer JSON in HuggingFace format ───────────────
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": markers.pad, "content": "<pad>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": markers.unk, "content": "<unk>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": markers.sos, "content": "<sos>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": markers.eos, "content": "<eos>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": markers.sop, "content": "<sop>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": markers.eop, "content": "<eop>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": null,
            "pre_tokenizer": {
                "type": "Whitespace"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "<unk>"
            }
        });

        let path = self.side_path(side);
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write vocabulary JSON '{}'", path.display()))?;

        tracing::info!(
            "{side} vocabulary built with {} entries, saved to '{}'",
            next_id,
            path.display()
        );

        // Load back as a proper Tokenizer instance
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot reload vocabulary: {e}"))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> String {
        let dir = std::env::temp_dir().join(format!("phrase-mt-vocab-{name}"));
        // Start from a clean slate so load_or_build actually builds
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir.to_str().unwrap().to_string()
    }

    #[test]
    fn test_marker_ids_are_stable() {
        let m = VocabStore::markers();
        assert_eq!(
            (m.pad, m.unk, m.sos, m.eos, m.sop, m.eop),
            (0, 1, 2, 3, 4, 5)
        );
    }

    #[test]
    fn test_min_freq_cutoff_maps_rare_words_to_unk() {
        let store = VocabStore::new(scratch_dir("cutoff"));
        let texts = vec![
            "the cat sat".to_string(),
            "the cat ran".to_string(),
            "the dog barked once".to_string(),
        ];
        let tok = store.load_or_build("source", &texts, 100, 2).unwrap();

        // "the" (3x) and "cat" (2x) survive; "barked" (1x) maps to <unk>
        let ids = VocabStore::encode_bracketed(&tok, "the cat barked").unwrap();
        let m   = VocabStore::markers();
        assert_eq!(ids.first(), Some(&(m.sos as u32)));
        assert_eq!(ids.last(),  Some(&(m.eos as u32)));
        assert!(ids.contains(&(m.unk as u32)));
    }

    #[test]
    fn test_reload_preserves_ids() {
        let dir   = scratch_dir("reload");
        let texts = vec!["alpha beta alpha beta gamma gamma".to_string()];

        let store = VocabStore::new(dir.clone());
        let built = store.load_or_build("target", &texts, 100, 1).unwrap();
        let ids_a = VocabStore::encode_bracketed(&built, "alpha gamma").unwrap();

        // Second store instance loads the saved file instead of rebuilding
        let reloaded = VocabStore::new(dir).load("target").unwrap();
        let ids_b    = VocabStore::encode_bracketed(&reloaded, "alpha gamma").unwrap();

        assert_eq!(ids_a, ids_b);
    }
}
