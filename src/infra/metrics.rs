// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch:
//
//   epoch,train_loss,train_acc,test_loss,test_acc,senti_acc
//   1,0.912345,0.541000,0.701200,0.602000,0.513000
//
// senti_acc is the accuracy of the auxiliary lexicon head on
// held-out lexicon words (empty when nothing was measured).

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "epoch,train_loss,train_acc,test_loss,test_acc,senti_acc";

/// Metrics of one training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub train_loss: f64,
    pub train_acc:  f64,
    pub test_loss:  f64,
    pub test_acc:   f64,
    /// None when no held-out lexicon word appeared in the test set
    pub senti_acc:  Option<f64>,
}

impl EpochMetrics {
    /// Returns true if this epoch beats the previous best test accuracy
    pub fn is_improvement(&self, best_test_acc: f64) -> bool {
        self.test_acc > best_test_acc
    }

    fn csv_row(&self) -> String {
        let senti = self.senti_acc.map(|a| format!("{a:.6}")).unwrap_or_default();
        format!(
            "{},{:.6},{:.6},{:.6},{:.6},{}",
            self.epoch, self.train_loss, self.train_acc, self.test_loss, self.test_acc, senti
        )
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the header if the file does not exist yet, so
    /// repeated runs append to the same log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(f, "{}", m.csv_row())?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, test_acc={:.4}",
            m.epoch,
            m.train_loss,
            m.test_acc,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
