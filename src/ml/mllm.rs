// ============================================================
// Layer 5 — SentiMLLM
// ============================================================
// Multi-layer quantum-inspired language model with an auxiliary
// lexicon head.
//
//   ids [b, s]
//    │
//    ▼
//   ComplexEmbedding ──▶ amplitude, phase [b, s, d]
//    │  weights  = ‖amplitude‖            [b, s, 1]
//    │  state    = normalise(amp)·e^{iφ}  [b, s, d]
//    ▼
//   ┌── hidden layer i (one per n-gram value except the last) ──┐
//   │   NGram(n_i) windows of state and weights                  │
//   │   softmax(weights) over the sequence axis                  │
//   │   weighted ComplexMixture → ρ [b, s, d, d]                 │
//   │   ComplexProjMeasurement_i → new state [b, s, d]           │
//   └────────────────────────────────────────────────────────────┘
//    │
//    ▼
//   NGram(n_last), weighted mixture (raw weights) → ρ
//    │
//    ▼
//   ComplexMeasurement (2·measurement_size units, or lexicon
//   word states when use_lexicon_as_measurement is set)
//    │
//    ▼
//   pooling branches → concat → dense_1 (ReLU) → dense_2 → logits [b, 2]
//
// Auxiliary head: senti_dense2(senti_dense1(phase)) gives one
// logit per token. During training it is fitted to the lexicon
// polarity of the words selected by the vocabulary train mask;
// evaluation scores it on the complementary test mask.

use anyhow::{bail, ensure, Result};
use burn::{
    module::{Ignored, Param},
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::embedding::LookupTable;
use crate::domain::sample::NUM_CLASSES;
use crate::ml::complex::{
    complex_multiply, l2_norm, l2_normalize, ComplexEmbedding, ComplexMeasurement,
    ComplexMeasurementConfig, ComplexMixture, ComplexProjMeasurement, NGram,
};
use crate::ml::model::{
    constant_vector, host_values, lexicon_words, LexiconScore, MultiTaskModel,
};
use crate::ml::pooling::{fuse, fused_feature_count, Pooling};

#[derive(Config, Debug)]
pub struct SentiMllmConfig {
    pub vocab_size:          usize,
    pub embedding_dim:       usize,
    pub max_sequence_length: usize,
    /// One n-gram size per layer; all but the last add a hidden
    /// projection layer
    pub ngram_values:        Vec<usize>,
    /// Comma-separated pooling branches, see `Pooling`
    pub pooling:             String,
    #[config(default = 5)]
    pub measurement_size:    usize,
    #[config(default = 64)]
    pub hidden_units:        usize,
    #[config(default = false)]
    pub use_lexicon_as_measurement: bool,
    /// Share of vocabulary draws that go into the lexicon train mask
    #[config(default = 0.9)]
    pub lexicon_train_fraction: f64,
    #[config(default = 9999)]
    pub seed:                u64,
}

/// Non-parameter shape information used by the forward pass
#[derive(Debug, Clone)]
pub struct MllmLayout {
    pub ngram_values:     Vec<usize>,
    pub pooling:          Vec<Pooling>,
    pub measurement_size: usize,
    pub use_lexicon_as_measurement: bool,
    /// Ids of the lexicon words used as measurement operators,
    /// positives first. None when the lexicon is too small.
    pub operator_words:   Option<Vec<i32>>,
}

impl SentiMllmConfig {
    pub fn num_hidden_layers(&self) -> usize {
        self.ngram_values.len().saturating_sub(1)
    }

    pub fn feature_count(&self) -> usize {
        fused_feature_count(
            &Pooling::parse_list(&self.pooling),
            self.max_sequence_length,
            2 * self.measurement_size,
        )
    }

    /// Build the model from word vectors and the vocabulary-aligned lexicon.
    pub fn init<B: Backend>(
        &self,
        table:   &LookupTable,
        lexicon: &[f32],
        device:  &B::Device,
    ) -> Result<SentiMllm<B>> {
        ensure!(!self.ngram_values.is_empty(), "SentiMLLM needs at least one n-gram value");
        ensure!(self.ngram_values.iter().all(|&n| n > 0), "n-gram values must be positive");
        ensure!(self.measurement_size > 0, "measurement_size must be positive");
        if table.rows() != self.vocab_size || table.dim() != self.embedding_dim {
            bail!(
                "Lookup table is [{}, {}] but the model expects [{}, {}]",
                table.rows(), table.dim(), self.vocab_size, self.embedding_dim
            );
        }
        if lexicon.len() != self.vocab_size {
            bail!("Lexicon has {} entries for a vocabulary of {}", lexicon.len(), self.vocab_size);
        }

        let dim   = self.embedding_dim;
        let units = 2 * self.measurement_size;
        let (train_mask, test_mask) =
            vocabulary_masks(self.vocab_size, self.lexicon_train_fraction, self.seed);

        Ok(SentiMllm {
            complex_embed: ComplexEmbedding::from_lookup(table, device),
            proj_measurements: (0..self.num_hidden_layers())
                .map(|_| ComplexProjMeasurement::new(dim, device))
                .collect(),
            measurement:  ComplexMeasurementConfig::new(dim, units).init(device),
            dense_1:      LinearConfig::new(self.feature_count(), self.hidden_units).init(device),
            dense_2:      LinearConfig::new(self.hidden_units, NUM_CLASSES).init(device),
            senti_dense1: LinearConfig::new(dim, self.hidden_units).init(device),
            senti_dense2: LinearConfig::new(self.hidden_units, 1).init(device),
            lexicon:      constant_vector(lexicon.to_vec(), device),
            train_mask:   constant_vector(train_mask, device),
            test_mask:    constant_vector(test_mask, device),
            layout: Ignored(MllmLayout {
                ngram_values:     self.ngram_values.clone(),
                pooling:          Pooling::parse_list(&self.pooling),
                measurement_size: self.measurement_size,
                use_lexicon_as_measurement: self.use_lexicon_as_measurement,
                operator_words:   operator_words(lexicon, self.measurement_size),
            }),
        })
    }

    /// Same architecture with zero embeddings and an empty lexicon;
    /// every value is replaced when a checkpoint is loaded into it.
    pub fn init_for_checkpoint<B: Backend>(&self, device: &B::Device) -> Result<SentiMllm<B>> {
        let table = LookupTable::new(
            self.vocab_size,
            self.embedding_dim,
            vec![0.0; self.vocab_size * self.embedding_dim],
        )?;
        self.init(&table, &vec![0.0; self.vocab_size], device)
    }
}

/// Mixture weights of one layer's windows `[b, s, n, 1]`: softmax
/// over the sequence axis for hidden layers, raw norms for the last.
fn window_weights<B: Backend>(ngram: &NGram, weights: Tensor<B, 3>, hidden: bool) -> Tensor<B, 4> {
    let windows = ngram.forward(weights);
    if hidden {
        activation::softmax(windows, 1)
    } else {
        windows
    }
}

/// The `n` most frequent positive then negative lexicon words, or
/// None when either polarity has fewer than `n`.
fn operator_words(lexicon: &[f32], n: usize) -> Option<Vec<i32>> {
    let positive = lexicon_words(lexicon, 1.0, n);
    let negative = lexicon_words(lexicon, -1.0, n);
    if positive.len() < n || negative.len() < n {
        tracing::debug!(
            "Lexicon has {}/{} positive and {}/{} negative words, using the trained measurement",
            positive.len(), n, negative.len(), n
        );
        return None;
    }
    Some(positive.into_iter().chain(negative).collect())
}

/// Vocabulary masks for the auxiliary head. `⌊fraction·V⌋` ids are
/// drawn uniformly with replacement; drawn ids form the train mask,
/// the rest the test mask.
pub fn vocabulary_masks(vocab_size: usize, train_fraction: f64, seed: u64) -> (Vec<f32>, Vec<f32>) {
    let mut train = vec![0.0f32; vocab_size];
    if vocab_size > 0 {
        let mut rng = StdRng::seed_from_u64(seed);
        let draws = (train_fraction.clamp(0.0, 1.0) * vocab_size as f64) as usize;
        for _ in 0..draws {
            train[rng.gen_range(0..vocab_size)] = 1.0;
        }
    }
    let test = train.iter().map(|m| 1.0 - m).collect();
    (train, test)
}

#[derive(Module, Debug)]
pub struct SentiMllm<B: Backend> {
    pub complex_embed:     ComplexEmbedding<B>,
    pub proj_measurements: Vec<ComplexProjMeasurement<B>>,
    pub measurement:       ComplexMeasurement<B>,
    pub dense_1:           Linear<B>,
    pub dense_2:           Linear<B>,
    pub senti_dense1:      Linear<B>,
    pub senti_dense2:      Linear<B>,
    /// +1 / -1 / 0 per vocabulary id
    pub lexicon:           Param<Tensor<B, 1>>,
    pub train_mask:        Param<Tensor<B, 1>>,
    pub test_mask:         Param<Tensor<B, 1>>,
    pub layout:            Ignored<MllmLayout>,
}

pub struct MllmOutput<B: Backend> {
    /// Class logits [batch, 2]
    pub logits: Tensor<B, 2>,
    /// Phase embedding of the input [batch, seq, dim], feeds the lexicon head
    pub phase:  Tensor<B, 3>,
}

impl<B: Backend> SentiMllm<B> {
    pub fn forward(&self, token_ids: Tensor<B, 2, Int>) -> MllmOutput<B> {
        let layout  = &self.layout;
        let mixture = ComplexMixture::new(true);

        let (amplitude, phase) = self.complex_embed.forward(token_ids);
        let weights   = l2_norm(amplitude.clone());
        let amplitude = l2_normalize(amplitude);
        let (mut real, mut imag) = complex_multiply(phase.clone(), amplitude);

        for (proj, &n) in self.proj_measurements.iter().zip(layout.ngram_values.iter()) {
            let ngram = NGram::new(n);
            let ngram_weights = window_weights(&ngram, weights.clone(), true);
            let (rho_real, rho_imag) =
                mixture.forward(ngram.forward(real), ngram.forward(imag), Some(ngram_weights));
            (real, imag) = proj.forward(rho_real, rho_imag);
        }

        let last  = layout.ngram_values.len().saturating_sub(1);
        let ngram = NGram::new(layout.ngram_values.get(last).copied().unwrap_or(1));
        let (rho_real, rho_imag) = mixture.forward(
            ngram.forward(real),
            ngram.forward(imag),
            Some(window_weights(&ngram, weights, false)),
        );

        let operator = if layout.use_lexicon_as_measurement {
            self.lexicon_operator()
        } else {
            None
        };
        let probs = self.measurement.forward(rho_real, rho_imag, operator);

        // [b, s, units] → [b, s, units, 1]: one measurement stack
        let features = fuse(&layout.pooling, probs.unsqueeze_dim::<4>(3));
        let hidden   = activation::relu(self.dense_1.forward(features));

        MllmOutput { logits: self.dense_2.forward(hidden), phase }
    }

    /// States of the `measurement_size` most frequent positive and
    /// negative lexicon words. None when the lexicon is too small,
    /// in which case the trainable measurement kernel is used.
    pub fn lexicon_operator(&self) -> Option<(Tensor<B, 2>, Tensor<B, 2>)> {
        let words = self.layout.operator_words.as_ref()?;
        let ids   = Tensor::<B, 1, Int>::from_ints(words.as_slice(), &self.lexicon.val().device());
        Some(self.complex_embed.word_states(ids))
    }

    /// Recompute the operator words from the lexicon parameter.
    /// Needed after loading a checkpoint into a model built by
    /// `init_for_checkpoint`, whose lexicon was empty.
    pub fn refresh_operator_words(mut self) -> Result<Self> {
        let lexicon = host_values(self.lexicon.val())
            .map_err(|e| anyhow::anyhow!("Cannot read the lexicon parameter: {e:?}"))?;
        self.layout.0.operator_words = operator_words(&lexicon, self.layout.measurement_size);
        Ok(self)
    }

    /// One auxiliary logit per token, flattened to `[batch·seq]`
    fn senti_logits(&self, phase: Tensor<B, 3>) -> Tensor<B, 1> {
        self.senti_dense2
            .forward(self.senti_dense1.forward(phase))
            .flatten::<1>(0, 2)
    }

    /// Lexicon polarity of every token and the mask of tokens that
    /// are both lexicon words and selected by `vocab_mask`.
    fn lexicon_targets(
        &self,
        token_ids:  Tensor<B, 2, Int>,
        vocab_mask: Tensor<B, 1>,
    ) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let flat       = token_ids.flatten::<1>(0, 1);
        let polarity   = self.lexicon.val().select(0, flat.clone());
        let in_lexicon = polarity.clone().abs();
        let mask       = vocab_mask.select(0, flat) * in_lexicon;
        (polarity, mask)
    }

    /// Masked binary cross-entropy (summed) of the auxiliary head
    /// against `(polarity + 1) / 2` on train-mask lexicon words.
    pub fn senti_loss(&self, token_ids: Tensor<B, 2, Int>, phase: Tensor<B, 3>) -> Tensor<B, 1> {
        let logits = self.senti_logits(phase);
        let (polarity, mask) = self.lexicon_targets(token_ids, self.train_mask.val());
        let target = polarity.add_scalar(1.0).div_scalar(2.0);

        let log_likelihood = target.clone() * activation::log_sigmoid(logits.clone())
            + target.neg().add_scalar(1.0) * activation::log_sigmoid(logits.neg());
        (log_likelihood * mask).sum().neg()
    }

    /// Sign agreement of the auxiliary head with the lexicon on
    /// test-mask lexicon words.
    pub fn senti_score(&self, token_ids: Tensor<B, 2, Int>, phase: Tensor<B, 3>) -> LexiconScore {
        let logits = self.senti_logits(phase);
        let (polarity, mask) = self.lexicon_targets(token_ids, self.test_mask.val());

        let (Ok(logits), Ok(polarity), Ok(mask)) =
            (host_values(logits), host_values(polarity), host_values(mask))
        else {
            return LexiconScore::default();
        };

        logits
            .iter()
            .zip(&polarity)
            .zip(&mask)
            .filter(|(_, &m)| m > 0.0)
            .fold(LexiconScore::default(), |mut score, ((&logit, &p), _)| {
                score.total += 1;
                if (logit > 0.0) == (p > 0.0) {
                    score.correct += 1;
                }
                score
            })
    }
}

impl<B: Backend> MultiTaskModel<B> for SentiMllm<B> {
    fn classify(&self, token_ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        self.forward(token_ids).logits
    }

    fn forward_train(
        &self,
        token_ids: Tensor<B, 2, Int>,
        auxiliary: bool,
    ) -> (Tensor<B, 2>, Option<Tensor<B, 1>>) {
        let out = self.forward(token_ids.clone());
        let senti_loss = auxiliary.then(|| self.senti_loss(token_ids, out.phase));
        (out.logits, senti_loss)
    }

    fn forward_eval(&self, token_ids: Tensor<B, 2, Int>) -> (Tensor<B, 2>, LexiconScore) {
        let out   = self.forward(token_ids.clone());
        let score = self.senti_score(token_ids, out.phase);
        (out.logits, score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TB = NdArray;
    type AD = Autodiff<NdArray>;

    const VOCAB: usize = 8;
    const DIM: usize = 4;
    const SEQ: usize = 5;

    // ids 2,3 positive; 4,5 negative
    const LEXICON: [f32; VOCAB] = [0.0, 0.0, 1.0, 1.0, -1.0, -1.0, 0.0, 0.0];

    fn config(ngrams: Vec<usize>, pooling: &str) -> SentiMllmConfig {
        SentiMllmConfig::new(VOCAB, DIM, SEQ, ngrams, pooling.to_string())
            .with_measurement_size(2)
            .with_hidden_units(6)
            .with_seed(7)
    }

    fn ids<B: Backend>(device: &B::Device) -> Tensor<B, 2, Int> {
        Tensor::<B, 1, Int>::from_ints([2, 6, 4, 0, 0, 3, 5, 7, 1, 0], device).reshape([2, SEQ])
    }

    fn build<B: Backend>(cfg: &SentiMllmConfig, device: &B::Device) -> SentiMllm<B> {
        let table = LookupTable::random(VOCAB, DIM, 3);
        cfg.init(&table, &LEXICON, device).unwrap()
    }

    #[test]
    fn test_masks_are_complementary_and_seeded() {
        let (train, test) = vocabulary_masks(100, 0.9, 1);
        assert!(train.iter().zip(&test).all(|(a, b)| a + b == 1.0));
        let drawn = train.iter().filter(|&&m| m == 1.0).count();
        assert!(drawn > 0 && drawn <= 90);
        assert_eq!(vocabulary_masks(100, 0.9, 1), (train, test));
    }

    #[test]
    fn test_feature_count_follows_pooling() {
        let cfg = config(vec![3], "max,average_col,none");
        // units = 4: max → 4, average_col → 5, none → 20
        assert_eq!(cfg.feature_count(), 4 + 5 + 20);
        assert_eq!(cfg.num_hidden_layers(), 0);
        assert_eq!(config(vec![1, 3, 5], "max").num_hidden_layers(), 2);
    }

    #[test]
    fn test_rejects_mismatched_table() {
        let device = Default::default();
        let table  = LookupTable::random(VOCAB, DIM + 1, 0);
        assert!(config(vec![3], "max").init::<TB>(&table, &LEXICON, &device).is_err());
        assert!(config(vec![], "max").init_for_checkpoint::<TB>(&device).is_err());
    }

    #[test]
    fn test_forward_shapes_with_hidden_layers() {
        let device = Default::default();
        let model  = build::<TB>(&config(vec![1, 3], "max,average_col"), &device);
        assert_eq!(model.proj_measurements.len(), 1);

        let out = model.forward(ids(&device));
        assert_eq!(out.logits.dims(), [2, NUM_CLASSES]);
        assert_eq!(out.phase.dims(), [2, SEQ, DIM]);
        assert!(host_values(out.logits).unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_lexicon_operator_needs_enough_words() {
        let device = Default::default();
        let model  = build::<TB>(&config(vec![3], "max").with_use_lexicon_as_measurement(true), &device);
        let (real, imag) = model.lexicon_operator().unwrap();
        assert_eq!(real.dims(), [4, DIM]);
        assert_eq!(imag.dims(), [4, DIM]);
        assert_eq!(model.forward(ids(&device)).logits.dims(), [2, NUM_CLASSES]);

        let greedy = build::<TB>(&config(vec![3], "max").with_measurement_size(3), &device);
        assert!(greedy.lexicon_operator().is_none());
    }

    #[test]
    fn test_senti_loss_is_non_negative_and_differentiable() {
        let device = Default::default();
        let model  = build::<AD>(&config(vec![3, 3], "max"), &device);

        let (logits, loss) = model.forward_train(ids(&device), true);
        let loss = loss.unwrap();
        let value = loss.clone().into_scalar().elem::<f32>();
        assert!(value >= 0.0 && value.is_finite());

        let total = burn::nn::loss::CrossEntropyLossConfig::new()
            .init(&device)
            .forward(logits, Tensor::from_ints([1, 0], &device))
            + loss;
        let grads = total.backward();

        let phase_grad = model.complex_embed.phase.val().grad(&grads).unwrap();
        assert!(host_values(phase_grad).unwrap().iter().all(|v| v.is_finite()));
        assert!(model.proj_measurements[0].kernel.val().grad(&grads).is_some());
        assert!(model.lexicon.val().grad(&grads).is_none());
    }

    #[test]
    fn test_single_strategy_skips_auxiliary_loss() {
        let device = Default::default();
        let model  = build::<TB>(&config(vec![3], "max"), &device);
        let (_, loss) = model.forward_train(ids(&device), false);
        assert!(loss.is_none());
    }

    #[test]
    fn test_senti_score_counts_only_test_mask_lexicon_words() {
        let device = Default::default();
        let model  = build::<TB>(&config(vec![3], "max"), &device);
        let (_, score) = model.forward_eval(ids(&device));

        let test_mask = host_values(model.test_mask.val()).unwrap();
        let expected = [2usize, 6, 4, 0, 0, 3, 5, 7, 1, 0]
            .iter()
            .filter(|&&id| LEXICON[id] != 0.0 && test_mask[id] > 0.0)
            .count();
        assert_eq!(score.total, expected);
        assert!(score.correct <= score.total);
    }

    #[test]
    fn test_operator_words_survive_a_checkpoint_reload() {
        let device = Default::default();
        let cfg    = config(vec![3], "max").with_use_lexicon_as_measurement(true);
        let model  = build::<TB>(&cfg, &device);
        assert_eq!(model.layout.operator_words, Some(vec![2, 3, 4, 5]));

        let empty = cfg.init_for_checkpoint::<TB>(&device).unwrap();
        assert!(empty.layout.operator_words.is_none());

        let reloaded = empty.load_record(model.into_record()).refresh_operator_words().unwrap();
        assert_eq!(reloaded.layout.operator_words, Some(vec![2, 3, 4, 5]));
        assert!(reloaded.lexicon_operator().is_some());
    }

    #[test]
    fn test_hidden_layers_softmax_the_weights_and_the_last_layer_does_not() {
        let device  = Default::default();
        let weights = Tensor::<TB, 1>::from_floats([1.0, 2.0, 3.0], &device).reshape([1, 3, 1]);

        let raw = host_values(window_weights(&NGram::new(1), weights.clone(), false)).unwrap();
        assert_eq!(raw, vec![1.0, 2.0, 3.0]);

        let soft = host_values(window_weights(&NGram::new(1), weights.clone(), true)).unwrap();
        let z: f32 = [1.0f32, 2.0, 3.0].iter().map(|w| w.exp()).sum();
        for (s, w) in soft.iter().zip([1.0f32, 2.0, 3.0]) {
            assert!((s - w.exp() / z).abs() < 1e-6);
        }

        // every window offset is a distribution over the sequence
        let soft = window_weights(&NGram::new(3), weights, true).sum_dim(1);
        assert!(host_values(soft).unwrap().iter().all(|s| (s - 1.0).abs() < 1e-5));
    }
}
