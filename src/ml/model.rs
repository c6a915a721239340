// ============================================================
// Layer 5 — Multi-Task Model Interface
// ============================================================
// Both networks have a sentence classifier and an auxiliary
// head supervised by the sentiment lexicon. The trainer and the
// inferencer only talk to this trait, so they work with either
// network on any backend.

use burn::{module::Param, prelude::*, tensor::DataError};

/// Held-out accuracy bookkeeping of the auxiliary lexicon head
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LexiconScore {
    pub correct: usize,
    pub total:   usize,
}

impl LexiconScore {
    pub fn new(correct: usize, total: usize) -> Self {
        Self { correct, total }
    }

    /// None when nothing was scored
    pub fn accuracy(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

impl std::ops::AddAssign for LexiconScore {
    fn add_assign(&mut self, other: Self) {
        self.correct += other.correct;
        self.total   += other.total;
    }
}

pub trait MultiTaskModel<B: Backend> {
    /// Class logits `[batch, 2]`
    fn classify(&self, token_ids: Tensor<B, 2, Int>) -> Tensor<B, 2>;

    /// Class logits plus the auxiliary lexicon loss. The loss is
    /// only computed when `auxiliary` is set, and is None when the
    /// batch holds no supervised lexicon word.
    fn forward_train(
        &self,
        token_ids: Tensor<B, 2, Int>,
        auxiliary: bool,
    ) -> (Tensor<B, 2>, Option<Tensor<B, 1>>);

    /// Class logits plus the auxiliary head's score on held-out
    /// lexicon words.
    fn forward_eval(&self, token_ids: Tensor<B, 2, Int>) -> (Tensor<B, 2>, LexiconScore);
}

/// Indices of the vocabulary entries with the given lexicon value,
/// in ascending id order, at most `limit` of them.
pub(crate) fn lexicon_words(lexicon: &[f32], value: f32, limit: usize) -> Vec<i32> {
    lexicon
        .iter()
        .enumerate()
        .filter(|(_, &v)| v == value)
        .map(|(i, _)| i as i32)
        .take(limit)
        .collect()
}

/// A fixed vector stored as a parameter so it travels with the
/// checkpoint, but never receives gradients.
pub(crate) fn constant_vector<B: Backend>(values: Vec<f32>, device: &B::Device) -> Param<Tensor<B, 1>> {
    let len = values.len();
    Param::from_tensor(Tensor::from_data(TensorData::new(values, [len]), device)).set_require_grad(false)
}

/// Copy a float tensor to the host.
pub(crate) fn host_values<B: Backend, const D: usize>(t: Tensor<B, D>) -> Result<Vec<f32>, DataError> {
    t.into_data().convert::<f32>().to_vec::<f32>()
}

/// Copy an int tensor to the host.
#[cfg(test)]
pub(crate) fn host_ids<B: Backend, const D: usize>(t: Tensor<B, D, Int>) -> Result<Vec<i64>, DataError> {
    t.into_data().convert::<i64>().to_vec::<i64>()
}
