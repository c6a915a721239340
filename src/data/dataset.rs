use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One tokenised sentence, padded or truncated to the model's
/// fixed sequence length with [PAD] = 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedSample {
    pub token_ids: Vec<u32>,
    pub label:     usize,
}

impl EncodedSample {
    pub fn new(mut token_ids: Vec<u32>, label: usize, max_len: usize, pad_id: u32) -> Self {
        token_ids.truncate(max_len);
        token_ids.resize(max_len, pad_id);
        Self { token_ids, label }
    }

    /// Number of non-padding tokens
    pub fn length(&self, pad_id: u32) -> usize {
        self.token_ids.iter().filter(|&&t| t != pad_id).count()
    }
}

pub struct TextDataset {
    samples: Vec<EncodedSample>,
}

impl TextDataset {
    pub fn new(samples: Vec<EncodedSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Number of samples per class, indexed by label
    pub fn class_counts(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_classes];
        for s in &self.samples {
            if let Some(c) = counts.get_mut(s.label) {
                *c += 1;
            }
        }
        counts
    }
}

impl Dataset<EncodedSample> for TextDataset {
    fn get(&self, index: usize) -> Option<EncodedSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pads_short_sequences() {
        let s = EncodedSample::new(vec![5, 6], 1, 4, 0);
        assert_eq!(s.token_ids, vec![5, 6, 0, 0]);
        assert_eq!(s.length(0), 2);
    }

    #[test]
    fn test_truncates_long_sequences() {
        let s = EncodedSample::new(vec![1, 2, 3, 4, 5], 0, 3, 0);
        assert_eq!(s.token_ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_dataset_access_and_counts() {
        let ds = TextDataset::new(vec![
            EncodedSample::new(vec![2], 1, 2, 0),
            EncodedSample::new(vec![3], 1, 2, 0),
            EncodedSample::new(vec![4], 0, 2, 0),
        ]);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.get(2).map(|s| s.label), Some(0));
        assert!(ds.get(3).is_none());
        assert_eq!(ds.class_counts(2), vec![1, 2]);
    }
}
