// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the trained network from experiment_config.json and
// the tokenizer, loads the latest checkpoint and classifies
// sentences. Runs on the CPU backend.

use anyhow::{Context, Result};
use burn::{prelude::*, tensor::activation};
use tokenizers::Tokenizer;

use crate::domain::{experiment::NetworkType, sample::Prediction};
use crate::infra::{
    checkpoint::CheckpointManager,
    tokenizer_store::{encode_padded, vocabulary},
};
use crate::ml::{
    fasttext::SentiFastText,
    mllm::SentiMllm,
    model::{host_values, MultiTaskModel},
};

type InferBackend = burn::backend::NdArray;

enum Network {
    Mllm(SentiMllm<InferBackend>),
    FastText(SentiFastText<InferBackend>),
}

impl Network {
    fn classify(&self, token_ids: Tensor<InferBackend, 2, Int>) -> Tensor<InferBackend, 2> {
        match self {
            Network::Mllm(m)     => m.classify(token_ids),
            Network::FastText(m) => m.classify(token_ids),
        }
    }
}

pub struct Inferencer {
    network:             Network,
    max_sequence_length: usize,
    device:              burn::backend::ndarray::NdArrayDevice,
}

impl Inferencer {
    pub fn from_checkpoint(ckpt: &CheckpointManager, tokenizer: &Tokenizer) -> Result<Self> {
        let device = burn::backend::ndarray::NdArrayDevice::default();
        let cfg    = ckpt.load_config()?;
        let (_, vocab_size) = vocabulary(tokenizer);

        let network = match cfg.network {
            NetworkType::Mllm => {
                let model = cfg.mllm_config(vocab_size)?.init_for_checkpoint(&device)?;
                Network::Mllm(ckpt.load_model(model, &device)?.refresh_operator_words()?)
            }
            NetworkType::FastText => {
                let model = cfg.fasttext_config(vocab_size).init_for_checkpoint(&device)?;
                Network::FastText(ckpt.load_model(model, &device)?)
            }
        };
        tracing::info!("{} model loaded from checkpoint (vocab_size={})", cfg.network, vocab_size);

        Ok(Self { network, max_sequence_length: cfg.max_sequence_length, device })
    }

    /// Classify cleaned sentences in one batch.
    pub fn predict_batch(&self, texts: &[String], tokenizer: &Tokenizer) -> Result<Vec<Prediction>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<i32> = Vec::with_capacity(texts.len() * self.max_sequence_length);
        for text in texts {
            let sample = encode_padded(tokenizer, text, 0, self.max_sequence_length)?;
            ids.extend(sample.token_ids.iter().map(|&id| id as i32));
        }

        let token_ids = Tensor::<InferBackend, 1, Int>::from_ints(ids.as_slice(), &self.device)
            .reshape([texts.len(), self.max_sequence_length]);

        let probs = activation::softmax(self.network.classify(token_ids), 1);
        let [_, classes] = probs.dims();
        let values = host_values(probs).context("Cannot read class probabilities")?;

        let predictions: Vec<Prediction> = values
            .chunks(classes)
            .map(|p| Prediction::from_probabilities(p.to_vec()))
            .collect();

        for (text, p) in texts.iter().zip(&predictions) {
            tracing::debug!("'{}' → {} ({:.4})", text, p.label_name(), p.confidence());
        }
        Ok(predictions)
    }

    pub fn predict(&self, text: &str, tokenizer: &Tokenizer) -> Result<Prediction> {
        self.predict_batch(&[text.to_string()], tokenizer)?
            .pop()
            .context("Empty prediction batch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::ExperimentConfig;
    use crate::data::embedding::LookupTable;
    use crate::infra::tokenizer_store::TokenizerStore;

    fn setup(network: NetworkType) -> (tempfile::TempDir, Tokenizer) {
        let dir = tempfile::tempdir().unwrap();
        let texts = vec!["a good film".to_string(), "a bad film".to_string()];
        let tokenizer = TokenizerStore::new(dir.path()).load_or_build(&texts, 100, 1).unwrap();
        let (_, vocab_size) = vocabulary(&tokenizer);

        let cfg = ExperimentConfig {
            network,
            embedding_dim: 4,
            max_sequence_length: 5,
            ngram_value: "1,3".to_string(),
            measurement_size: 2,
            hidden_units: Some(6),
            ..ExperimentConfig::default()
        };
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        ckpt.save_config(&cfg).unwrap();

        let device = Default::default();
        let lexicon = aligned_lexicon(&tokenizer);
        match network {
            NetworkType::Mllm => {
                let table = LookupTable::random(vocab_size, 4, 5);
                let model: SentiMllm<InferBackend> =
                    cfg.mllm_config(vocab_size).unwrap().init(&table, &lexicon, &device).unwrap();
                ckpt.save_model(&model, 1).unwrap();
            }
            NetworkType::FastText => {
                let model: SentiFastText<InferBackend> =
                    cfg.fasttext_config(vocab_size).init(&lexicon, &device).unwrap();
                ckpt.save_model(&model, 1).unwrap();
            }
        }
        (dir, tokenizer)
    }

    /// "good" positive, "bad" negative
    fn aligned_lexicon(tokenizer: &Tokenizer) -> Vec<f32> {
        let (vocab, vocab_size) = vocabulary(tokenizer);
        let mut lexicon = vec![0.0; vocab_size];
        lexicon[vocab["good"] as usize] = 1.0;
        lexicon[vocab["bad"] as usize]  = -1.0;
        lexicon
    }

    fn assert_distribution(p: &Prediction) {
        assert_eq!(p.probabilities.len(), 2);
        let sum: f32 = p.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(p.label < 2);
    }

    #[test]
    fn test_mllm_prediction_from_checkpoint() {
        let (dir, tokenizer) = setup(NetworkType::Mllm);
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let inferencer = Inferencer::from_checkpoint(&ckpt, &tokenizer).unwrap();

        assert_distribution(&inferencer.predict("a good film", &tokenizer).unwrap());
        let batch = inferencer
            .predict_batch(&["good".to_string(), "unseen words here".to_string()], &tokenizer)
            .unwrap();
        assert_eq!(batch.len(), 2);
        batch.iter().for_each(assert_distribution);
    }

    #[test]
    fn test_mllm_lexicon_and_masks_survive_the_checkpoint() {
        let (dir, tokenizer) = setup(NetworkType::Mllm);
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg  = ckpt.load_config().unwrap();
        let inferencer = Inferencer::from_checkpoint(&ckpt, &tokenizer).unwrap();

        let Network::Mllm(model) = &inferencer.network else {
            panic!("expected a SentiMLLM network");
        };
        let (_, vocab_size) = vocabulary(&tokenizer);
        let (train_mask, test_mask) =
            crate::ml::mllm::vocabulary_masks(vocab_size, cfg.lexicon_train_fraction, cfg.seed);

        assert_eq!(host_values(model.lexicon.val()).unwrap(), aligned_lexicon(&tokenizer));
        assert_eq!(host_values(model.train_mask.val()).unwrap(), train_mask);
        assert_eq!(host_values(model.test_mask.val()).unwrap(), test_mask);
    }

    #[test]
    fn test_fasttext_prediction_from_checkpoint() {
        let (dir, tokenizer) = setup(NetworkType::FastText);
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let inferencer = Inferencer::from_checkpoint(&ckpt, &tokenizer).unwrap();
        assert_distribution(&inferencer.predict("a bad film", &tokenizer).unwrap());
        assert!(inferencer.predict_batch(&[], &tokenizer).unwrap().is_empty());
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let texts = vec!["fine".to_string()];
        let tokenizer = TokenizerStore::new(dir.path()).load_or_build(&texts, 10, 1).unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(Inferencer::from_checkpoint(&ckpt, &tokenizer).is_err());
    }
}
