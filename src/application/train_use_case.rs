// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the parallel corpus      (Layer 4 - data)
//   Step 2: Clean both language sides     (Layer 4 - data)
//   Step 3: Build / load vocabularies     (Layer 6 - infra)
//   Step 4: Encode training samples       (Layer 4 - data)
//   Step 5: Split train/validation        (Layer 4 - data)
//   Step 6: Build datasets                (Layer 4 - data)
//   Step 7: Save config                   (Layer 6 - infra)
//   Step 8: Run training loop             (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{TranslationDataset, TranslationSample},
    loader::ParallelCorpusLoader,
    preprocessor::Preprocessor,
    splitter::split_train_val,
};
use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::CorpusSource;
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Serialisable so it
// can be saved to disk and reloaded for evaluation. Vocabulary
// sizes are NOT stored here — they are a property of the saved
// vocabularies and are re-derived wherever the model is rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:          String,
    pub checkpoint_dir:    String,
    pub src_lang:          String,
    pub trg_lang:          String,
    pub max_len:           usize,
    pub batch_size:        usize,
    pub epochs:            usize,
    pub lr:                f64,
    pub clip:              f64,
    pub embed_dim:         usize,
    pub hidden_dim:        usize,
    pub segment_dim:       usize,
    pub n_layers:          usize,
    pub dropout:           f64,
    pub segment_threshold: usize,
    pub max_vocab:         usize,
    pub min_freq:          usize,
    pub train_fraction:    f64,
    pub teacher_forcing:   f64,
    pub reverse_source:    bool,
    pub seed:              u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:          "data/corpus".to_string(),
            checkpoint_dir:    "checkpoints".to_string(),
            src_lang:          "en".to_string(),
            trg_lang:          "hi".to_string(),
            max_len:           50,
            batch_size:        8,
            epochs:            10,
            lr:                1e-3,
            clip:              1.0,
            embed_dim:         256,
            hidden_dim:        256,
            segment_dim:       256,
            n_layers:          6,
            dropout:           0.4,
            segment_threshold: 5,
            max_vocab:         10_000,
            min_freq:          2,
            train_fraction:    0.9,
            teacher_forcing:   0.5,
            reverse_source:    false,
            seed:              1234,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Load the parallel corpus ─────────────────────────────────
        tracing::info!(
            "Loading parallel corpus from '{}' ({} → {})",
            cfg.data_dir, cfg.src_lang, cfg.trg_lang
        );
        let loader = ParallelCorpusLoader::new(&cfg.data_dir, &cfg.src_lang, &cfg.trg_lang);
        let pairs  = loader.load_pairs("train")?;
        ensure!(!pairs.is_empty(), "Training corpus is empty — nothing to learn from");

        // ── Step 2: Clean both sides ──────────────────────────────────────────
        let preprocessor = Preprocessor::new(cfg.reverse_source);
        let (src_texts, trg_texts): (Vec<String>, Vec<String>) = pairs
            .iter()
            .map(|p| (preprocessor.clean_source(&p.source), preprocessor.clean_target(&p.target)))
            .unzip();

        // ── Step 3: Build / load one vocabulary per side ──────────────────────
        let vocab_store = VocabStore::new(&cfg.checkpoint_dir);
        let src_vocab = vocab_store.load_or_build("source", &src_texts, cfg.max_vocab, cfg.min_freq)?;
        let trg_vocab = vocab_store.load_or_build("target", &trg_texts, cfg.max_vocab, cfg.min_freq)?;
        let markers   = VocabStore::markers();

        // ── Step 4: Encode training samples ───────────────────────────────────
        let samples = build_samples(&src_texts, &trg_texts, &src_vocab, &trg_vocab, cfg.max_len)?;
        tracing::info!("Built {} training samples", samples.len());

        // ── Step 5: Seeded train/validation split ─────────────────────────────
        let (train_samples, val_samples) =
            split_train_val(samples, cfg.train_fraction, cfg.seed);
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );

        // ── Step 6: Build Burn datasets ───────────────────────────────────────
        let train_dataset = TranslationDataset::new(train_samples);
        let val_dataset   = TranslationDataset::new(val_samples);

        // ── Step 7: Save config for evaluation ────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;

        // ── Step 8: Run training loop (Layer 5) ───────────────────────────────
        run_training(
            cfg,
            src_vocab.get_vocab_size(true),
            trg_vocab.get_vocab_size(true),
            markers,
            train_dataset,
            val_dataset,
            ckpt_manager,
        )?;

        Ok(())
    }
}

/// Encode cleaned sentence pairs into bracketed id sequences,
/// truncating to max_len. Shared with the evaluation pipeline.
pub fn build_samples(
    src_texts: &[String],
    trg_texts: &[String],
    src_vocab: &tokenizers::Tokenizer,
    trg_vocab: &tokenizers::Tokenizer,
    max_len:   usize,
) -> Result<Vec<TranslationSample>> {
    let markers = VocabStore::markers();
    let mut samples = Vec::with_capacity(src_texts.len());

    for (src, trg) in src_texts.iter().zip(trg_texts) {
        let mut source_ids = VocabStore::encode_bracketed(src_vocab, src)?;
        let mut target_ids = VocabStore::encode_bracketed(trg_vocab, trg)?;

        // Truncation must keep the closing <eos> bracket
        if source_ids.len() > max_len {
            source_ids.truncate(max_len - 1);
            source_ids.push(markers.eos as u32);
        }
        if target_ids.len() > max_len {
            target_ids.truncate(max_len - 1);
            target_ids.push(markers.eos as u32);
        }

        samples.push(TranslationSample { source_ids, target_ids });
    }

    Ok(samples)
}

/// Clean and encode a raw sentence-pair list against existing
/// vocabularies — the evaluation-side twin of Steps 2 and 4.
pub fn prepare_samples(
    pairs:        &[SentencePair],
    preprocessor: &Preprocessor,
    src_vocab:    &tokenizers::Tokenizer,
    trg_vocab:    &tokenizers::Tokenizer,
    max_len:      usize,
) -> Result<Vec<TranslationSample>> {
    let (src_texts, trg_texts): (Vec<String>, Vec<String>) = pairs
        .iter()
        .map(|p| (preprocessor.clean_source(&p.source), preprocessor.clean_target(&p.target)))
        .unzip();
    build_samples(&src_texts, &trg_texts, src_vocab, trg_vocab, max_len)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation_keeps_the_eos_bracket() {
        let dir = std::env::temp_dir().join("phrase-mt-usecase-trunc");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let store = VocabStore::new(dir.to_str().unwrap().to_string());
        let texts = vec!["a b c d e f g h a b c d e f g h".to_string()];
        let vocab = store.load_or_build("source", &texts, 100, 1).unwrap();

        let samples = build_samples(&texts, &texts, &vocab, &vocab, 6).unwrap();
        let m = VocabStore::markers();

        assert_eq!(samples[0].source_len(), 6);
        assert_eq!(samples[0].source_ids.first(), Some(&(m.sos as u32)));
        assert_eq!(samples[0].source_ids.last(),  Some(&(m.eos as u32)));
    }
}
