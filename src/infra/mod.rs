// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence concerns shared by training and
// prediction:
//
//   checkpoint.rs      — model weights (CompactRecorder) and the
//                        experiment config as JSON
//
//   tokenizer_store.rs — word-level vocabulary built from the
//                        training corpus, saved as tokenizer JSON
//
//   metrics.rs         — per-epoch CSV log
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;
