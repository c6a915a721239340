// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Loads the tokenizer and the latest checkpoint from a training
// run and classifies sentences with them. Sentences are cleaned
// exactly like the training corpus before tokenisation.

use anyhow::Result;
use tokenizers::Tokenizer;

use crate::data::preprocessor::Preprocessor;
use crate::domain::{sample::Prediction, traits::SentimentClassifier};
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::inferencer::Inferencer;

pub struct PredictUseCase {
    tokenizer:    Tokenizer,
    inferencer:   Inferencer,
    preprocessor: Preprocessor,
}

impl PredictUseCase {
    pub fn new(checkpoint_dir: &str) -> Result<Self> {
        let tokenizer  = TokenizerStore::new(checkpoint_dir).load()?;
        let ckpt       = CheckpointManager::new(checkpoint_dir)?;
        let inferencer = Inferencer::from_checkpoint(&ckpt, &tokenizer)?;
        Ok(Self { tokenizer, inferencer, preprocessor: Preprocessor::new() })
    }

    /// Classify several sentences in one forward pass
    pub fn classify_all(&self, texts: &[String]) -> Result<Vec<Prediction>> {
        let cleaned = self.preprocessor.clean_all(texts.iter().map(String::as_str));
        self.inferencer.predict_batch(&cleaned, &self.tokenizer)
    }
}

impl SentimentClassifier for PredictUseCase {
    fn classify(&self, text: &str) -> Result<Prediction> {
        self.inferencer.predict(&self.preprocessor.clean(text), &self.tokenizer)
    }
}
