// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved:
//   1. Model weights (.mpk.gz)   — every parameter, including the
//                                  non-trainable lexicon and
//                                  vocabulary masks of the models
//   2. latest_epoch.json         — which epoch was last saved
//   3. experiment_config.json    — network type and hyper-parameters
//
// The config is needed at prediction time to rebuild a model of
// the exact same shape before loading the weights into it.
//
// File layout:
//   checkpoints/
//     model_epoch_1.mpk.gz
//     model_epoch_2.mpk.gz
//     latest_epoch.json
//     experiment_config.json
//     tokenizer.json          (written by TokenizerStore)
//     metrics.csv             (written by MetricsLogger)
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    module::Module,
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::ExperimentConfig;

const CONFIG_FILE: &str = "experiment_config.json";
const LATEST_FILE: &str = "latest_epoch.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Save model weights for a given epoch and move the
    /// latest-epoch pointer to it.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join(LATEST_FILE);
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", latest_path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the latest saved weights into `model`.
    /// The architecture of `model` must match the checkpoint.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &ExperimentConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved experiment config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<ExperimentConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' before 'predict'.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed experiment config '{}'", path.display()))
    }

    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
