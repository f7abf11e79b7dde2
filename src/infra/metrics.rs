// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: average per-token NLL on the training set
//   - train_ppl:  exp(train_loss) — perplexity
//   - val_loss:   average per-token NLL on the validation set
//   - val_ppl:    exp(val_loss)
//
// Perplexity is the conventional way to read translation loss:
// it is the effective branching factor the model still sees at
// each target position, so a falling PPL curve is much easier
// to eyeball than raw nats.
//
// Output file: checkpoints/metrics.csv

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average masked NLL over all training batches
    pub train_loss: f64,

    /// Average masked NLL on the validation set.
    /// Divergence from train_loss indicates overfitting.
    pub val_loss: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64) -> Self {
        Self { epoch, train_loss, val_loss }
    }

    /// Perplexity of the training pass.
    pub fn train_ppl(&self) -> f64 {
        self.train_loss.exp()
    }

    /// Perplexity of the validation pass.
    pub fn val_ppl(&self) -> f64 {
        self.val_loss.exp()
    }

    /// True if this epoch improved over the previous best val_loss.
    /// The checkpoint manager keeps only improving snapshots.
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");

        // Header only for a fresh file — appending across runs
        // keeps one continuous log
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,train_ppl,val_loss,val_ppl")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.3},{:.6},{:.3}",
            m.epoch,
            m.train_loss,
            m.train_ppl(),
            m.val_loss,
            m.val_ppl(),
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 2.5, 2.3);
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
    }

    #[test]
    fn test_perplexity_is_exp_of_loss() {
        let m = EpochMetrics::new(1, 0.0, 1.0);
        assert!((m.train_ppl() - 1.0).abs() < 1e-9);
        assert!((m.val_ppl() - std::f64::consts::E).abs() < 1e-9);
    }
}
