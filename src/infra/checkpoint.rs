// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved:
//   1. Model weights (.mpk.gz file) — all learned parameters
//   2. best_epoch.json              — which snapshot scored the
//                                     best validation loss
//   3. train_config.json            — model architecture config
//
// Only IMPROVING epochs are written: the trainer calls
// save_model when validation loss beats the previous best, and
// best_epoch.json always points at that snapshot. Evaluation
// therefore restores the best model seen during the run, not
// the last one.
//
// The config is saved separately because loading needs the
// exact architecture (hidden_dim, n_layers, ...) to rebuild the
// model before the weights can be restored into it.
//
// Burn's CompactRecorder:
//   - Serialises model parameters to MessagePack format
//   - Compresses with gzip
//   - Type-safe: loading fails if the architecture doesn't match
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::PhraseTranslationModel;

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<String>) -> Self {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Save model weights for an improving epoch and move the
    /// best-epoch pointer to it.
    pub fn save_model<B: AutodiffBackend>(
        &self,
        model: &PhraseTranslationModel<B>,
        epoch: usize,
    ) -> Result<()> {
        // Recorder adds the extension itself
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        let pointer = self.dir.join("best_epoch.json");
        fs::write(&pointer, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write best_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load model weights from the best saved checkpoint.
    ///
    /// The model parameter must have the correct architecture
    /// (matching the saved checkpoint) or loading will fail.
    pub fn load_best_model<B: Backend>(
        &self,
        model:  PhraseTranslationModel<B>,
        device: &B::Device,
    ) -> Result<PhraseTranslationModel<B>> {
        let epoch = self.best_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display()
                )
            })?;

        Ok(model.load_record(record))
    }

    /// Save the training configuration to JSON.
    /// Must be called before training starts so evaluation can
    /// reconstruct the exact model architecture.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration from JSON.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. \
                 Make sure you have run 'train' before 'evaluate'.",
                path.display()
            )
        })?;

        Ok(serde_json::from_str(&json)?)
    }

    /// Read best_epoch.json and return the epoch number.
    fn best_epoch(&self) -> Result<usize> {
        let path = self.dir.join("best_epoch.json");

        let s = fs::read_to_string(&path).with_context(|| {
            "Cannot find 'best_epoch.json'. Have you run 'train' first?"
        })?;

        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
