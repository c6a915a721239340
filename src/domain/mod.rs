// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the core
// concepts of the system: labelled sentences, word polarities,
// which network to train and how.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

// A labelled sentence and a model prediction
pub mod sample;

// Sentiment polarity of a lexicon word
pub mod polarity;

// Network family and training strategy selectors
pub mod experiment;

// Core abstractions (traits) that other layers implement
pub mod traits;
