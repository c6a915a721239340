// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads a CSV file with a header row and two columns:
//
//   label,text
//   1,"a gripping, beautifully shot film"
//   0,the plot never gets going
//
// Labels are class indices (0 = negative, 1 = positive).
// Rows with an out-of-range label are rejected with the row
// number so broken corpora fail fast instead of training on
// garbage.
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use std::path::{Path, PathBuf};

use crate::domain::sample::{TextSample, NUM_CLASSES};
use crate::domain::traits::CorpusSource;

/// A labelled corpus stored as CSV.
pub struct CsvCorpus {
    path: PathBuf,
}

impl CsvCorpus {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorpusSource for CsvCorpus {
    fn load_all(&self) -> Result<Vec<TextSample>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open corpus '{}'", self.path.display()))?;

        let mut samples = Vec::new();
        for (row, record) in rdr.deserialize::<TextSample>().enumerate() {
            let sample = record.with_context(|| {
                format!("Malformed row {} in '{}'", row + 2, self.path.display())
            })?;
            if sample.label >= NUM_CLASSES {
                bail!(
                    "Row {} in '{}' has label {} (expected 0..{})",
                    row + 2,
                    self.path.display(),
                    sample.label,
                    NUM_CLASSES
                );
            }
            samples.push(sample);
        }

        tracing::debug!("Loaded {} samples from '{}'", samples.len(), self.path.display());
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_reads_labelled_rows() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        fs::write(&path, "label,text\n1,\"great, really great\"\n0,dull\n").unwrap();

        let samples = CsvCorpus::new(&path).load_all().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], TextSample::new(1, "great, really great"));
        assert_eq!(samples[1].label, 0);
    }

    #[test]
    fn test_rejects_out_of_range_label() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "label,text\n3,what\n").unwrap();

        let err = CsvCorpus::new(&path).load_all().unwrap_err();
        assert!(err.to_string().contains("label 3"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = CsvCorpus::new(dir.path().join("nope.csv"));
        assert!(!corpus.exists());
        assert!(corpus.load_all().is_err());
    }
}
