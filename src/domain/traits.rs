// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits so a CSV
// corpus can be swapped for any other labelled-text source, and a
// checkpoint-backed classifier for any other implementation.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::sample::{Prediction, TextSample};

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can produce labelled sentences.
///
/// Implementations:
///   - CsvCorpus → reads a `label,text` CSV file
pub trait CorpusSource {
    fn load_all(&self) -> Result<Vec<TextSample>>;
}

// ─── SentimentClassifier ──────────────────────────────────────────────────────
/// Any component that can classify a sentence.
///
/// Implementations:
///   - PredictUseCase → checkpointed SentiMLLM / SentiFastText
pub trait SentimentClassifier {
    fn classify(&self, text: &str) -> Result<Prediction>;
}
