// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts
// of the translation system.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - NO ML-specific code
//   - Only plain Rust structs, enums, and traits
//
// Think of this layer as the "dictionary" of the system —
// it defines what things ARE, not how they work.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// An aligned source/target sentence pair from the corpus
pub mod sentence_pair;

// A contiguous token span (start, end) — both segments on the
// source side and phrases on the target side are spans
pub mod span;

// Reserved vocabulary ids (padding, sequence and phrase markers)
pub mod markers;

// Core abstractions (traits) that other layers implement
pub mod traits;
