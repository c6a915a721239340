// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the experiment config
//   Step 2: Load the train / test corpora     (Layer 4 - data)
//   Step 3: Clean the sentences               (Layer 4 - data)
//   Step 4: Build / load tokenizer            (Layer 6 - infra)
//   Step 5: Encode samples into datasets      (Layer 4 - data)
//   Step 6: Word vectors and lexicon          (Layer 4 - data)
//   Step 7: Save config                       (Layer 6 - infra)
//   Step 8: Run training on the backend       (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{
    dataset::{EncodedSample, TextDataset},
    embedding::{load_glove, LookupTable},
    lexicon::SentimentLexicon,
    loader::CsvCorpus,
    preprocessor::Preprocessor,
    splitter::split_train_val,
};
use crate::domain::{
    experiment::{BackendKind, NetworkType, Strategy},
    sample::{TextSample, NUM_CLASSES},
    traits::CorpusSource,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    tokenizer_store::{encode_padded, vocabulary, TokenizerStore, PAD_ID},
};
use crate::ml::{
    fasttext::SentiFastTextConfig,
    mllm::SentiMllmConfig,
    trainer::{run_training, TrainingInputs, TrainingReport},
};

// ─── Experiment Configuration ────────────────────────────────────────────────
// Everything that defines one run. Read from JSON (missing keys
// take the defaults below), overridden from the command line and
// saved next to the checkpoints so `predict` can rebuild the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub network:        NetworkType,
    pub strategy:       Strategy,
    pub backend:        BackendKind,

    /// `label,text` CSV
    pub train_path:     String,
    /// Without a test file the train file is split
    pub test_path:      Option<String>,
    /// GloVe-style text vectors; random vectors when absent
    pub embedding_path: Option<String>,
    pub lexicon_path:   Option<String>,
    pub checkpoint_dir: String,

    /// Only used for random vectors; a vector file sets its own width
    pub embedding_dim:       usize,
    pub max_vocab_size:      usize,
    pub min_frequency:       usize,
    pub max_sequence_length: usize,
    pub batch_size:          usize,
    pub epochs:              usize,
    pub lr:                  f64,
    /// Learning rate of the unitary projection kernels
    pub unitary_lr:          f64,
    /// Weight of the lexicon loss under the multi-task strategy
    pub gamma:               f64,
    pub seed:                u64,
    /// Share of the train file kept for training when it is split
    pub train_fraction:      f64,

    /// Comma-separated n-gram sizes, one per SentiMLLM layer
    pub ngram_value:      String,
    /// Comma-separated pooling branches
    pub pooling_type:     String,
    pub measurement_size: usize,
    /// Hidden width; defaults to 64 for SentiMLLM and 200 for SentiFastText
    pub hidden_units:     Option<usize>,
    pub use_lexicon_as_measurement: bool,
    /// Share of vocabulary draws in the lexicon-head train mask
    pub lexicon_train_fraction: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            network:        NetworkType::Mllm,
            strategy:       Strategy::MultiTask,
            backend:        BackendKind::NdArray,
            train_path:     "data/train.csv".to_string(),
            test_path:      None,
            embedding_path: None,
            lexicon_path:   None,
            checkpoint_dir: "checkpoints".to_string(),
            embedding_dim:       50,
            max_vocab_size:      30000,
            min_frequency:       1,
            max_sequence_length: 60,
            batch_size:          32,
            epochs:              10,
            lr:                  1e-3,
            unitary_lr:          1e-3,
            gamma:               1.0,
            seed:                9999,
            train_fraction:      0.9,
            ngram_value:      "3".to_string(),
            pooling_type:     "max".to_string(),
            measurement_size: 5,
            hidden_units:     None,
            use_lexicon_as_measurement: false,
            lexicon_train_fraction: 0.9,
        }
    }
}

impl ExperimentConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }

    pub fn ngram_values(&self) -> Result<Vec<usize>> {
        self.ngram_value
            .split(',')
            .map(|v| {
                v.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid n-gram value '{}'", v.trim()))
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let ngrams = self.ngram_values()?;
        ensure!(!ngrams.is_empty(), "ngram_value must list at least one n-gram size");
        ensure!(ngrams.iter().all(|&n| n > 0), "n-gram sizes must be positive");
        ensure!(self.measurement_size > 0, "measurement_size must be positive");
        ensure!(self.max_sequence_length > 0, "max_sequence_length must be positive");
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(self.embedding_dim > 0, "embedding_dim must be positive");
        ensure!(self.hidden_units != Some(0), "hidden_units must be positive");
        ensure!(self.lr >= 0.0 && self.unitary_lr >= 0.0, "learning rates must not be negative");
        ensure!(self.gamma >= 0.0, "gamma must not be negative");
        if !(0.0..=1.0).contains(&self.train_fraction)
            || !(0.0..=1.0).contains(&self.lexicon_train_fraction)
        {
            bail!("fractions must lie in [0, 1]");
        }
        Ok(())
    }

    pub fn mllm_config(&self, vocab_size: usize) -> Result<SentiMllmConfig> {
        Ok(SentiMllmConfig::new(
            vocab_size,
            self.embedding_dim,
            self.max_sequence_length,
            self.ngram_values()?,
            self.pooling_type.clone(),
        )
        .with_measurement_size(self.measurement_size)
        .with_hidden_units(self.hidden_units.unwrap_or(64))
        .with_use_lexicon_as_measurement(self.use_lexicon_as_measurement)
        .with_lexicon_train_fraction(self.lexicon_train_fraction)
        .with_seed(self.seed))
    }

    pub fn fasttext_config(&self, vocab_size: usize) -> SentiFastTextConfig {
        SentiFastTextConfig::new(vocab_size, self.embedding_dim)
            .with_hidden_units(self.hidden_units.unwrap_or(200))
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: ExperimentConfig,
}

impl TrainUseCase {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingReport> {
        let mut cfg = self.config.clone();

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;
        tracing::info!("Experiment: network={} strategy={}", cfg.network, cfg.strategy);

        // ── Step 2: Load corpora ──────────────────────────────────────────────
        let train_corpus = CsvCorpus::new(&cfg.train_path);
        if !train_corpus.exists() {
            bail!("Training file '{}' does not exist", train_corpus.path().display());
        }
        let all_train = train_corpus.load_all()?;
        let (train_samples, test_samples) = match &cfg.test_path {
            Some(path) => (all_train, CsvCorpus::new(path).load_all()?),
            None => {
                tracing::info!("No test file, holding out {:.0}% of the training file", (1.0 - cfg.train_fraction) * 100.0);
                split_train_val(all_train, cfg.train_fraction, cfg.seed)
            }
        };
        ensure!(!train_samples.is_empty(), "The training set is empty");
        ensure!(!test_samples.is_empty(), "The test set is empty, nothing to evaluate on");
        tracing::info!("Loaded {} training and {} test sentences", train_samples.len(), test_samples.len());

        // ── Step 3: Clean ─────────────────────────────────────────────────────
        let preprocessor = Preprocessor::new();
        let train_samples = clean_samples(&preprocessor, train_samples);
        let test_samples  = clean_samples(&preprocessor, test_samples);

        // ── Step 4: Tokenizer (training sentences only) ───────────────────────
        let texts: Vec<String> = train_samples.iter().map(|s| s.text.clone()).collect();
        let tokenizer = TokenizerStore::new(&cfg.checkpoint_dir)
            .load_or_build(&texts, cfg.max_vocab_size, cfg.min_frequency)?;
        let (vocab, vocab_size) = vocabulary(&tokenizer);
        tracing::info!("Vocabulary size: {}", vocab_size);

        // ── Step 5: Encode ────────────────────────────────────────────────────
        let encode = |samples: &[TextSample]| -> Result<Vec<EncodedSample>> {
            samples
                .iter()
                .map(|s| encode_padded(&tokenizer, &s.text, s.label, cfg.max_sequence_length))
                .collect()
        };
        let encoded = encode(&train_samples)?;
        let mean_len = encoded.iter().map(|s| s.length(PAD_ID)).sum::<usize>() as f64
            / encoded.len().max(1) as f64;
        tracing::debug!("Mean sentence length {:.1} tokens (max {})", mean_len, cfg.max_sequence_length);
        let train = TextDataset::new(encoded);
        let test  = TextDataset::new(encode(&test_samples)?);
        tracing::info!("Training class counts: {:?}", train.class_counts(NUM_CLASSES));

        // ── Step 6: Word vectors and lexicon ──────────────────────────────────
        let table = match &cfg.embedding_path {
            Some(path) => load_glove(Path::new(path), &vocab, vocab_size, None, cfg.seed)?,
            None => {
                tracing::info!("No embedding file, using random {}-d vectors", cfg.embedding_dim);
                LookupTable::random(vocab_size, cfg.embedding_dim, cfg.seed)
            }
        };
        cfg.embedding_dim = table.dim();

        let lexicon = match &cfg.lexicon_path {
            Some(path) => SentimentLexicon::load(Path::new(path))?,
            None => {
                tracing::warn!("No lexicon given, the auxiliary head has nothing to learn");
                SentimentLexicon::default()
            }
        };
        if lexicon.is_empty() {
            tracing::warn!("The lexicon is empty");
        }
        let lexicon_words = lexicon.len();
        let lexicon = lexicon.align(&vocab, vocab_size);
        tracing::info!(
            "Lexicon covers {} of its {} words in the vocabulary",
            lexicon.iter().filter(|&&v| v != 0.0).count(),
            lexicon_words
        );

        // ── Step 7: Save config ───────────────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(&cfg)?;

        // ── Step 8: Train ─────────────────────────────────────────────────────
        let inputs = TrainingInputs { train, test, table, lexicon, vocab_size };
        match cfg.backend {
            BackendKind::NdArray => {
                type Cpu = burn::backend::Autodiff<burn::backend::NdArray>;
                let device = burn::backend::ndarray::NdArrayDevice::default();
                tracing::info!("Using NdArray device: {:?}", device);
                run_training::<Cpu>(&cfg, inputs, &ckpt, &device)
            }
            BackendKind::Wgpu => {
                type Gpu = burn::backend::Autodiff<burn::backend::Wgpu>;
                let device = burn::backend::wgpu::WgpuDevice::default();
                tracing::info!("Using WGPU device: {:?}", device);
                run_training::<Gpu>(&cfg, inputs, &ckpt, &device)
            }
        }
    }
}

fn clean_samples(preprocessor: &Preprocessor, samples: Vec<TextSample>) -> Vec<TextSample> {
    samples
        .into_iter()
        .map(|s| TextSample::new(s.label, preprocessor.clean(&s.text)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: ExperimentConfig =
            serde_json::from_str(r#"{"network": "fasttext", "ngram_value": "1,3", "epochs": 2}"#).unwrap();
        assert_eq!(cfg.network, NetworkType::FastText);
        assert_eq!(cfg.epochs, 2);
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.ngram_values().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ExperimentConfig::default().validate().is_ok());

        let bad = [
            ExperimentConfig { ngram_value: "3,x".into(), ..Default::default() },
            ExperimentConfig { ngram_value: "0".into(), ..Default::default() },
            ExperimentConfig { measurement_size: 0, ..Default::default() },
            ExperimentConfig { batch_size: 0, ..Default::default() },
            ExperimentConfig { hidden_units: Some(0), ..Default::default() },
            ExperimentConfig { lr: -1.0, ..Default::default() },
            ExperimentConfig { gamma: -0.5, ..Default::default() },
            ExperimentConfig { train_fraction: 1.5, ..Default::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
        }
    }

    #[test]
    fn test_model_configs_pick_network_defaults() {
        let cfg = ExperimentConfig { ngram_value: "1, 3 ,5".into(), ..Default::default() };
        let mllm = cfg.mllm_config(100).unwrap();
        assert_eq!(mllm.ngram_values, vec![1, 3, 5]);
        assert_eq!(mllm.hidden_units, 64);
        assert_eq!(cfg.fasttext_config(100).hidden_units, 200);

        let cfg = ExperimentConfig { hidden_units: Some(16), ..cfg };
        assert_eq!(cfg.fasttext_config(100).hidden_units, 16);
    }

    #[test]
    fn test_execute_end_to_end_on_cpu() {
        let dir = tempfile::tempdir().unwrap();
        let train_path = dir.path().join("train.csv");
        let mut csv = String::from("label,text\n");
        for i in 0..12 {
            if i % 2 == 0 {
                csv.push_str("1,\"a truly great   and wonderful film\"\n");
            } else {
                csv.push_str("0,\"an awful,<br />boring film\"\n");
            }
        }
        fs::write(&train_path, csv).unwrap();

        let lexicon_path = dir.path().join("lexicon.txt");
        fs::write(&lexicon_path, "great positive\nwonderful positive\nawful negative\nboring negative\n").unwrap();

        let cfg = ExperimentConfig {
            train_path:          train_path.display().to_string(),
            lexicon_path:        Some(lexicon_path.display().to_string()),
            checkpoint_dir:      dir.path().join("ckpt").display().to_string(),
            embedding_dim:       4,
            max_sequence_length: 8,
            batch_size:          4,
            epochs:              1,
            ngram_value:         "1,3".into(),
            measurement_size:    2,
            hidden_units:        Some(8),
            ..Default::default()
        };

        let report = TrainUseCase::new(cfg).execute().unwrap();
        assert_eq!(report.epochs.len(), 1);

        let ckpt = CheckpointManager::new(dir.path().join("ckpt")).unwrap();
        assert_eq!(ckpt.load_config().unwrap().embedding_dim, 4);
        assert!(dir.path().join("ckpt").join("tokenizer.json").exists());
    }

    #[test]
    fn test_missing_train_file_is_an_error() {
        let cfg = ExperimentConfig { train_path: "/nonexistent/train.csv".into(), ..Default::default() };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_empty_test_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let train_path = dir.path().join("train.csv");
        let test_path  = dir.path().join("test.csv");
        fs::write(&train_path, "label,text\n1,good film\n0,bad film\n").unwrap();
        fs::write(&test_path, "label,text\n").unwrap();

        let cfg = ExperimentConfig {
            train_path:     train_path.display().to_string(),
            test_path:      Some(test_path.display().to_string()),
            checkpoint_dir: dir.path().join("ckpt").display().to_string(),
            ..Default::default()
        };
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("test set is empty"));
    }
}
