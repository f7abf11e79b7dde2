// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// Restores the best checkpoint and measures held-out quality:
//
//   1. Load the saved training config and both vocabularies
//   2. Rebuild the model architecture and restore the best
//      validation snapshot
//   3. Load and encode the named test split
//   4. Run teacher-forced forward passes and report average
//      loss and perplexity
//
// The model is evaluated exactly the way it was validated
// during training — ground-truth conditioned, teacher forcing
// off — so test numbers are directly comparable to the
// validation column of metrics.csv.

use anyhow::{ensure, Result};
use burn::data::dataloader::DataLoaderBuilder;
use burn::prelude::*;

use crate::application::train_use_case::prepare_samples;
use crate::data::{
    batcher::TranslationBatcher,
    dataset::TranslationDataset,
    loader::ParallelCorpusLoader,
    preprocessor::Preprocessor,
};
use crate::domain::traits::CorpusSource;
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::model::{masked_nll, PhraseModelConfig, PhraseTranslationModel};

type EvalBackend = burn::backend::Wgpu;

/// Held-out evaluation results.
pub struct EvalReport {
    pub split:      String,
    pub samples:    usize,
    pub loss:       f64,
    pub perplexity: f64,
}

pub struct EvaluateUseCase {
    checkpoint_dir: String,
    data_dir:       String,
}

impl EvaluateUseCase {
    pub fn new(checkpoint_dir: String, data_dir: String) -> Self {
        Self { checkpoint_dir, data_dir }
    }

    pub fn evaluate(&self, split: &str) -> Result<EvalReport> {
        let device = burn::backend::wgpu::WgpuDevice::default();

        // ── Step 1: Config and vocabularies ───────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&self.checkpoint_dir);
        let cfg          = ckpt_manager.load_config()?;

        let vocab_store = VocabStore::new(&self.checkpoint_dir);
        let src_vocab   = vocab_store.load("source")?;
        let trg_vocab   = vocab_store.load("target")?;
        let markers     = VocabStore::markers();

        // ── Step 2: Rebuild the architecture and restore weights ──────────────
        let model_cfg = PhraseModelConfig::new(
            src_vocab.get_vocab_size(true),
            trg_vocab.get_vocab_size(true),
            cfg.embed_dim, cfg.hidden_dim, cfg.segment_dim,
            cfg.n_layers,
            // Dropout off at evaluation time
            0.0,
            cfg.segment_threshold,
        );
        let model: PhraseTranslationModel<EvalBackend> = model_cfg.init(&markers, &device);
        let model = ckpt_manager.load_best_model(model, &device)?;
        tracing::info!("Model restored from best checkpoint");

        // ── Step 3: Load and encode the test split ────────────────────────────
        let loader = ParallelCorpusLoader::new(&self.data_dir, &cfg.src_lang, &cfg.trg_lang);
        let pairs  = loader.load_pairs(split)?;
        ensure!(!pairs.is_empty(), "Split '{split}' contains no usable sentence pairs");

        let preprocessor = Preprocessor::new(cfg.reverse_source);
        let samples = prepare_samples(&pairs, &preprocessor, &src_vocab, &trg_vocab, cfg.max_len)?;
        let sample_count = samples.len();

        let batcher     = TranslationBatcher::<EvalBackend>::new(device, markers.pad as u32);
        let data_loader = DataLoaderBuilder::new(batcher)
            .batch_size(cfg.batch_size)
            .num_workers(1)
            .build(TranslationDataset::new(samples));

        // ── Step 4: Teacher-forced evaluation passes ──────────────────────────
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in data_loader.iter() {
            let output = model.forward(batch.source, batch.target.clone(), 0.0)?;
            let loss   = masked_nll(output, batch.target, markers.pad);

            loss_sum += loss.into_scalar().elem::<f64>();
            batches  += 1;
        }

        let loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };

        Ok(EvalReport {
            split:      split.to_string(),
            samples:    sample_count,
            loss,
            perplexity: loss.exp(),
        })
    }
}
