// ============================================================
// Layer 4 — Text Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<EncodedSample>
// into device tensors.
//
//   Input:  N EncodedSamples, each with S token ids
//   Output: TextBatch { token_ids: [N, S], labels: [N] }
//
// All sequences are pre-padded to the same length, so batching
// is a flatten + reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::EncodedSample;

/// A batch of encoded sentences ready for the forward pass.
#[derive(Debug, Clone)]
pub struct TextBatch<B: Backend> {
    /// Token ids — shape: [batch_size, seq_len]
    pub token_ids: Tensor<B, 2, Int>,

    /// Class indices — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

/// Stateless: the DataLoader hands in the target device per batch.
#[derive(Clone, Debug, Default)]
pub struct TextBatcher;

impl TextBatcher {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Batcher<B, EncodedSample, TextBatch<B>> for TextBatcher {
    fn batch(&self, items: Vec<EncodedSample>, device: &B::Device) -> TextBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map(|s| s.token_ids.len()).unwrap_or(0);

        // Burn Int tensors take i32 element data
        let ids_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.token_ids.iter().map(|&x| x as i32))
            .collect();

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let token_ids = Tensor::<B, 1, Int>::from_ints(ids_flat.as_slice(), device)
            .reshape([batch_size, seq_len]);
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device);

        TextBatch { token_ids, labels }
    }
}
