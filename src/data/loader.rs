// ============================================================
// Layer 4 — Parallel Corpus Loader
// ============================================================
// Loads a line-aligned parallel corpus from a directory.
//
// The corpus layout follows the usual bitext convention: one
// file per language per split, aligned by line number:
//
//   data/
//     train.en    ← source sentences, one per line
//     train.hi    ← target sentences, line k translates line k
//     test.en
//     test.hi
//
// Alignment is positional, so the two files of a split MUST
// have the same number of lines — a mismatch means the corpus
// is corrupt and loading fails rather than silently pairing
// the wrong sentences.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O)

use anyhow::{ensure, Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::CorpusSource;

/// Loads aligned `<split>.<src_lang>` / `<split>.<trg_lang>`
/// file pairs from a directory.
pub struct ParallelCorpusLoader {
    /// Directory containing the corpus files
    dir: PathBuf,

    /// Source-language file extension, e.g. "en"
    src_lang: String,

    /// Target-language file extension, e.g. "hi"
    trg_lang: String,
}

impl ParallelCorpusLoader {
    pub fn new(
        dir: impl Into<String>,
        src_lang: impl Into<String>,
        trg_lang: impl Into<String>,
    ) -> Self {
        Self {
            dir:      PathBuf::from(dir.into()),
            src_lang: src_lang.into(),
            trg_lang: trg_lang.into(),
        }
    }

    /// Path of one side of a split, e.g. `data/train.en`.
    fn side_path(&self, split: &str, lang: &str) -> PathBuf {
        self.dir.join(format!("{split}.{lang}"))
    }
}

impl CorpusSource for ParallelCorpusLoader {
    fn load_pairs(&self, split: &str) -> Result<Vec<SentencePair>> {
        let src_path = self.side_path(split, &self.src_lang);
        let trg_path = self.side_path(split, &self.trg_lang);

        let src_text = fs::read_to_string(&src_path)
            .with_context(|| format!("Cannot read source corpus '{}'", src_path.display()))?;
        let trg_text = fs::read_to_string(&trg_path)
            .with_context(|| format!("Cannot read target corpus '{}'", trg_path.display()))?;

        let src_lines: Vec<&str> = src_text.lines().collect();
        let trg_lines: Vec<&str> = trg_text.lines().collect();

        // Line counts must match — alignment is positional
        ensure!(
            src_lines.len() == trg_lines.len(),
            "Split '{}' is misaligned: {} source lines vs {} target lines",
            split,
            src_lines.len(),
            trg_lines.len()
        );

        let mut pairs = Vec::with_capacity(src_lines.len());
        let mut skipped = 0usize;

        for (src, trg) in src_lines.into_iter().zip(trg_lines) {
            let pair = SentencePair::new(src, trg);

            // Blank lines on either side carry no training signal —
            // log and skip rather than failing the whole split
            if pair.is_degenerate() {
                skipped += 1;
                continue;
            }
            pairs.push(pair);
        }

        if skipped > 0 {
            tracing::warn!("Split '{}': skipped {} blank-sided pairs", split, skipped);
        }
        tracing::info!("Loaded {} sentence pairs from split '{}'", pairs.len(), split);

        Ok(pairs)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("phrase-mt-loader-{name}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_aligned_pairs_loaded_in_order() {
        let dir = scratch_dir("aligned");
        fs::write(dir.join("train.en"), "good morning\nthank you\n").unwrap();
        fs::write(dir.join("train.hi"), "suprabhat\ndhanyavad\n").unwrap();

        let loader = ParallelCorpusLoader::new(dir.to_str().unwrap(), "en", "hi");
        let pairs  = loader.load_pairs("train").unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].source, "good morning");
        assert_eq!(pairs[0].target, "suprabhat");
        assert_eq!(pairs[1].target, "dhanyavad");
    }

    #[test]
    fn test_misaligned_split_is_an_error() {
        let dir = scratch_dir("misaligned");
        fs::write(dir.join("train.en"), "one\ntwo\n").unwrap();
        fs::write(dir.join("train.hi"), "ek\n").unwrap();

        let loader = ParallelCorpusLoader::new(dir.to_str().unwrap(), "en", "hi");
        assert!(loader.load_pairs("train").is_err());
    }

    #[test]
    fn test_blank_pairs_are_skipped() {
        let dir = scratch_dir("blanks");
        fs::write(dir.join("train.en"), "hello\n\nworld\n").unwrap();
        fs::write(dir.join("train.hi"), "namaste\nx\nduniya\n").unwrap();

        let loader = ParallelCorpusLoader::new(dir.to_str().unwrap(), "en", "hi");
        let pairs  = loader.load_pairs("train").unwrap();
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir    = scratch_dir("missing");
        let loader = ParallelCorpusLoader::new(dir.to_str().unwrap(), "en", "hi");
        assert!(loader.load_pairs("nonexistent").is_err());
    }
}
