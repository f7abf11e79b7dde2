// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from raw corpus files all the
// way to GPU-ready tensor batches.
//
// The pipeline flows in this order:
//
//   train.<src> / train.<trg> files
//       │
//       ▼
//   ParallelCorpusLoader  → reads line-aligned sentence pairs
//       │
//       ▼
//   Preprocessor          → cleans text, reverses source tokens
//       │
//       ▼
//   Vocabulary            → converts words to token id numbers
//       │
//       ▼
//   TranslationDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   TranslationBatcher    → pads and stacks samples into batches
//       │
//       ▼
//   DataLoader            → feeds batches to the training loop
//
// Each module is responsible for exactly one step.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Loads line-aligned parallel text files
pub mod loader;

/// Cleans and normalises raw sentence text
pub mod preprocessor;

/// Implements Burn's Dataset trait for translation samples
pub mod dataset;

/// Implements Burn's Batcher trait to create padded tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
