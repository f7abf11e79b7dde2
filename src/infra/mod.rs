// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong to any one business
// layer:
//
//   checkpoint.rs   — Saving and loading model weights with
//                     Burn's CompactRecorder, plus the training
//                     config JSON and the best-epoch pointer.
//
//   vocab_store.rs  — Vocabulary persistence. Builds one
//                     word-level vocabulary per language side
//                     from the corpus (or loads a previously
//                     saved one) and resolves the reserved
//                     marker ids.
//
//   metrics.rs      — Writes epoch-level metrics (loss and
//                     perplexity per pass) to a CSV file.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Per-language vocabulary building, saving, and loading
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
