// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `predict`, and their
// flags.
//
// `train` starts from a JSON experiment config (or the defaults)
// and every flag given on the command line overrides one field.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::ExperimentConfig;
use crate::domain::experiment::{BackendKind, NetworkType, Strategy};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train SentiMLLM or SentiFastText on a labelled CSV corpus
    Train(TrainArgs),

    /// Classify sentences with a trained checkpoint
    Predict(PredictArgs),
}

#[derive(Args, Debug, Default)]
pub struct TrainArgs {
    /// JSON experiment config; flags below override its fields
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// mllm or fasttext
    #[arg(long)]
    pub network: Option<NetworkType>,

    /// multi-task or single
    #[arg(long)]
    pub strategy: Option<Strategy>,

    /// ndarray (CPU) or wgpu
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// Training CSV with `label,text` columns
    #[arg(long)]
    pub train_path: Option<String>,

    /// Test CSV; without it 10% of the training file is held out
    #[arg(long)]
    pub test_path: Option<String>,

    /// GloVe-style word vectors
    #[arg(long)]
    pub embedding_path: Option<String>,

    /// Sentiment lexicon, one `word polarity` entry per line
    #[arg(long)]
    pub lexicon_path: Option<String>,

    #[arg(long)]
    pub checkpoint_dir: Option<String>,

    #[arg(long)]
    pub embedding_dim: Option<usize>,

    #[arg(long)]
    pub max_vocab_size: Option<usize>,

    /// Words seen fewer times are left out of the vocabulary
    #[arg(long)]
    pub min_frequency: Option<usize>,

    #[arg(long)]
    pub max_sequence_length: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub epochs: Option<usize>,

    #[arg(long)]
    pub lr: Option<f64>,

    #[arg(long)]
    pub unitary_lr: Option<f64>,

    /// Weight of the lexicon loss
    #[arg(long)]
    pub gamma: Option<f64>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Share of the training file kept for training when there is no test file
    #[arg(long)]
    pub train_fraction: Option<f64>,

    /// Share of vocabulary draws in the lexicon train mask
    #[arg(long)]
    pub lexicon_train_fraction: Option<f64>,

    /// Comma-separated n-gram sizes, e.g. "1,3,5"
    #[arg(long)]
    pub ngram_value: Option<String>,

    /// Comma-separated pooling branches, e.g. "max,average_col"
    #[arg(long)]
    pub pooling_type: Option<String>,

    #[arg(long)]
    pub measurement_size: Option<usize>,

    #[arg(long)]
    pub hidden_units: Option<usize>,

    /// Measure with lexicon word states instead of trained vectors
    #[arg(long)]
    pub use_lexicon_as_measurement: bool,
}

impl TrainArgs {
    /// Config file (or defaults) with the command-line overrides applied
    pub fn into_config(self) -> Result<ExperimentConfig> {
        let mut cfg = match &self.config {
            Some(path) => ExperimentConfig::from_file(path)?,
            None => ExperimentConfig::default(),
        };

        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $( if let Some(v) = self.$field { cfg.$field = v; } )*
            };
        }
        set!(
            network, strategy, backend, train_path, checkpoint_dir, embedding_dim,
            max_vocab_size, min_frequency, max_sequence_length, batch_size, epochs, lr,
            unitary_lr, gamma, seed, train_fraction, lexicon_train_fraction, ngram_value,
            pooling_type, measurement_size,
        );

        if self.test_path.is_some()      { cfg.test_path = self.test_path; }
        if self.embedding_path.is_some() { cfg.embedding_path = self.embedding_path; }
        if self.lexicon_path.is_some()   { cfg.lexicon_path = self.lexicon_path; }
        if self.hidden_units.is_some()   { cfg.hidden_units = self.hidden_units; }
        if self.use_lexicon_as_measurement {
            cfg.use_lexicon_as_measurement = true;
        }
        Ok(cfg)
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Sentence to classify; repeat for several
    #[arg(long, required = true)]
    pub text: Vec<String>,

    /// Directory of a finished training run
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_flags_override_config_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("exp.json");
        std::fs::write(&path, r#"{"network": "fasttext", "epochs": 7, "gamma": 0.5}"#).unwrap();

        let args = TrainArgs {
            config: Some(path),
            epochs: Some(2),
            hidden_units: Some(32),
            use_lexicon_as_measurement: true,
            ..Default::default()
        };
        let cfg = args.into_config().unwrap();
        assert_eq!(cfg.network, NetworkType::FastText);
        assert_eq!(cfg.epochs, 2);
        assert_eq!(cfg.gamma, 0.5);
        assert_eq!(cfg.hidden_units, Some(32));
        assert!(cfg.use_lexicon_as_measurement);
    }

    #[test]
    fn test_parse_train_command() {
        let cli = Cli::try_parse_from([
            "senti-qnn", "train", "--network", "mllm", "--strategy", "single",
            "--ngram-value", "1,3", "--lr", "0.01",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg = args.into_config().unwrap();
        assert_eq!(cfg.strategy, Strategy::Single);
        assert_eq!(cfg.ngram_value, "1,3");
        assert_eq!(cfg.lr, 0.01);
    }

    #[test]
    fn test_parse_vocabulary_and_split_flags() {
        let cli = Cli::try_parse_from([
            "senti-qnn", "train", "--min-frequency", "3", "--train-fraction", "0.8",
            "--lexicon-train-fraction", "0.5",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg = args.into_config().unwrap();
        assert_eq!(cfg.min_frequency, 3);
        assert_eq!(cfg.train_fraction, 0.8);
        assert_eq!(cfg.lexicon_train_fraction, 0.5);
    }

    #[test]
    fn test_parse_predict_command() {
        let cli = Cli::try_parse_from(["senti-qnn", "predict", "--text", "good", "--text", "bad"]).unwrap();
        let Commands::Predict(args) = cli.command else { panic!("expected predict") };
        assert_eq!(args.text, vec!["good", "bad"]);
        assert_eq!(args.checkpoint_dir, "checkpoints");
        assert!(Cli::try_parse_from(["senti-qnn", "predict"]).is_err());
    }
}
