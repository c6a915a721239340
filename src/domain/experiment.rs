// ============================================================
// Layer 3 — Experiment Selectors
// ============================================================
// Which network to build, how to train it, and where to run it.
// All three are serialised in lower case inside the experiment
// config JSON and parsed from strings on the command line.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The two network families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Complex-valued multi-layer language model (SentiMLLM)
    Mllm,
    /// Averaged-embedding baseline (SentiFastText)
    FastText,
}

/// Whether the lexicon loss is added to the classification loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// loss = CE + gamma * lexicon loss
    MultiTask,
    /// loss = CE
    Single,
}

/// Compute backend used for training and inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    NdArray,
    Wgpu,
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mllm" | "senti-mllm" | "sentimllm" => Ok(NetworkType::Mllm),
            "fasttext" | "senti-fasttext" | "sentifasttext" => Ok(NetworkType::FastText),
            other => Err(format!("unknown network type '{other}' (expected mllm or fasttext)")),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multi-task" | "multitask" => Ok(Strategy::MultiTask),
            "single" | "single-task" => Ok(Strategy::Single),
            other => Err(format!("unknown strategy '{other}' (expected multi-task or single)")),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ndarray" | "cpu" => Ok(BackendKind::NdArray),
            "wgpu" | "gpu" => Ok(BackendKind::Wgpu),
            other => Err(format!("unknown backend '{other}' (expected ndarray or wgpu)")),
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkType::Mllm => write!(f, "mllm"),
            NetworkType::FastText => write!(f, "fasttext"),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::MultiTask => write!(f, "multi-task"),
            Strategy::Single => write!(f, "single"),
        }
    }
}
