// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `evaluate`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the translation model on a parallel corpus
    Train(TrainArgs),

    /// Evaluate the best checkpoint on a held-out split
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory containing <split>.<lang> corpus files
    #[arg(long, default_value = "data/corpus")]
    pub data_dir: String,

    /// Directory to save model checkpoints and vocabularies
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Source-language file extension (e.g. train.en)
    #[arg(long, default_value = "en")]
    pub src_lang: String,

    /// Target-language file extension (e.g. train.hi)
    #[arg(long, default_value = "hi")]
    pub trg_lang: String,

    /// Maximum tokens per sequence including <sos>/<eos>;
    /// longer sentences are truncated
    #[arg(long, default_value_t = 50)]
    pub max_len: usize,

    /// Number of sentence pairs per forward pass
    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Gradient-norm clipping threshold
    #[arg(long, default_value_t = 1.0)]
    pub clip: f64,

    /// Token embedding width (both languages)
    #[arg(long, default_value_t = 256)]
    pub embed_dim: usize,

    /// Recurrent hidden width throughout the model
    #[arg(long, default_value_t = 256)]
    pub hidden_dim: usize,

    /// Segment recurrence width — every source span is
    /// represented by a vector of twice this size
    #[arg(long, default_value_t = 256)]
    pub segment_dim: usize,

    /// Number of stacked layers in every recurrence
    #[arg(long, default_value_t = 6)]
    pub n_layers: usize,

    /// Dropout probability (embeddings and between layers)
    #[arg(long, default_value_t = 0.4)]
    pub dropout: f64,

    /// Longest source span (in tokens) given a representation;
    /// bounds the segment sweeps
    #[arg(long, default_value_t = 5)]
    pub segment_threshold: usize,

    /// Maximum vocabulary size per language side
    #[arg(long, default_value_t = 10000)]
    pub max_vocab: usize,

    /// Words seen fewer times than this map to <unk>
    #[arg(long, default_value_t = 2)]
    pub min_freq: usize,

    /// Fraction of the corpus used for training; the remainder
    /// becomes the validation set
    #[arg(long, default_value_t = 0.9)]
    pub train_fraction: f64,

    /// Probability of feeding ground-truth tokens during decoding
    #[arg(long, default_value_t = 0.5)]
    pub teacher_forcing: f64,

    /// Reverse the token order of source sentences
    #[arg(long)]
    pub reverse_source: bool,

    /// Seed for shuffling and the train/validation split
    #[arg(long, default_value_t = 1234)]
    pub seed: u64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:          a.data_dir,
            checkpoint_dir:    a.checkpoint_dir,
            src_lang:          a.src_lang,
            trg_lang:          a.trg_lang,
            max_len:           a.max_len,
            batch_size:        a.batch_size,
            epochs:            a.epochs,
            lr:                a.lr,
            clip:              a.clip,
            embed_dim:         a.embed_dim,
            hidden_dim:        a.hidden_dim,
            segment_dim:       a.segment_dim,
            n_layers:          a.n_layers,
            dropout:           a.dropout,
            segment_threshold: a.segment_threshold,
            max_vocab:         a.max_vocab,
            min_freq:          a.min_freq,
            train_fraction:    a.train_fraction,
            teacher_forcing:   a.teacher_forcing,
            reverse_source:    a.reverse_source,
            seed:              a.seed,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Corpus split to evaluate, e.g. "test"
    #[arg(long, default_value = "test")]
    pub split: String,

    /// Directory with the corpus files (same as used during training)
    #[arg(long, default_value = "data/corpus")]
    pub data_dir: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}
