// ============================================================
// Layer 5 — SentiFastText
// ============================================================
// Baseline network:
//
//   ids [b, s] → Embedding [b, s, d] → mean over s → Linear(d, h)
//     → BatchNorm(h) → Linear(h, 2) → logits [b, 2]
//
// Auxiliary head: every token of the batch that is a lexicon word
// is embedded and classified by senti_fc(d, 2) against its
// polarity (negative → 0, positive → 1).

use anyhow::{bail, Result};
use burn::{
    module::Param,
    nn::{
        loss::CrossEntropyLossConfig, BatchNorm, BatchNormConfig, Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::domain::sample::NUM_CLASSES;
use crate::ml::model::{constant_vector, host_values, LexiconScore, MultiTaskModel};

#[derive(Config, Debug)]
pub struct SentiFastTextConfig {
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    #[config(default = 200)]
    pub hidden_units:  usize,
}

impl SentiFastTextConfig {
    /// The embedding table is randomly initialised; `lexicon` holds
    /// one polarity value per vocabulary id.
    pub fn init<B: Backend>(&self, lexicon: &[f32], device: &B::Device) -> Result<SentiFastText<B>> {
        if lexicon.len() != self.vocab_size {
            bail!("Lexicon has {} entries for a vocabulary of {}", lexicon.len(), self.vocab_size);
        }
        Ok(SentiFastText {
            embed:    EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device),
            linear:   LinearConfig::new(self.embedding_dim, self.hidden_units).init(device),
            bn:       BatchNormConfig::new(self.hidden_units).init(device),
            fc:       LinearConfig::new(self.hidden_units, NUM_CLASSES).init(device),
            senti_fc: LinearConfig::new(self.embedding_dim, 2).init(device),
            lexicon:  constant_vector(lexicon.to_vec(), device),
        })
    }

    pub fn init_for_checkpoint<B: Backend>(&self, device: &B::Device) -> Result<SentiFastText<B>> {
        self.init(&vec![0.0; self.vocab_size], device)
    }
}

#[derive(Module, Debug)]
pub struct SentiFastText<B: Backend> {
    pub embed:    Embedding<B>,
    pub linear:   Linear<B>,
    pub bn:       BatchNorm<B>,
    pub fc:       Linear<B>,
    pub senti_fc: Linear<B>,
    pub lexicon:  Param<Tensor<B, 1>>,
}

/// Auxiliary head output for the lexicon words of one batch
pub struct SentiOutput<B: Backend> {
    /// `[k, 2]`
    pub logits:  Tensor<B, 2>,
    /// `[k]`, 0 = negative, 1 = positive
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> SentiFastText<B> {
    pub fn forward(&self, token_ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch, _] = token_ids.dims();
        let hidden = self.embed.forward(token_ids).mean_dim(1); // [b, 1, d]
        let hidden = self.linear.forward(hidden);                // [b, 1, h]
        let [_, _, units] = hidden.dims();

        // BatchNorm normalises dim 1 as channels: [b, h, 1]
        let hidden = self.bn.forward(hidden.reshape([batch, units, 1]));
        self.fc.forward(hidden.reshape([batch, units]))
    }

    /// None when the batch holds no lexicon word.
    pub fn senti_forward(&self, token_ids: Tensor<B, 2, Int>) -> Option<SentiOutput<B>> {
        let flat     = token_ids.flatten::<1>(0, 1);
        let device   = flat.device();
        let polarity = host_values(self.lexicon.val().select(0, flat.clone())).ok()?;

        let (positions, targets): (Vec<i32>, Vec<i32>) = polarity
            .iter()
            .enumerate()
            .filter(|(_, &p)| p != 0.0)
            .map(|(i, &p)| (i as i32, if p > 0.0 { 1 } else { 0 }))
            .unzip();
        if positions.is_empty() {
            return None;
        }

        let count     = positions.len();
        let positions = Tensor::<B, 1, Int>::from_ints(positions.as_slice(), &device);
        let words     = flat.select(0, positions).reshape([1, count]);
        let embedded  = self.embed.forward(words).reshape([count, self.embed.weight.val().dims()[1]]);

        Some(SentiOutput {
            logits:  self.senti_fc.forward(embedded),
            targets: Tensor::from_ints(targets.as_slice(), &device),
        })
    }
}

impl<B: Backend> MultiTaskModel<B> for SentiFastText<B> {
    fn classify(&self, token_ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        self.forward(token_ids)
    }

    fn forward_train(
        &self,
        token_ids: Tensor<B, 2, Int>,
        auxiliary: bool,
    ) -> (Tensor<B, 2>, Option<Tensor<B, 1>>) {
        let logits = self.forward(token_ids.clone());
        if !auxiliary {
            return (logits, None);
        }
        let senti_loss = self.senti_forward(token_ids).map(|out| {
            CrossEntropyLossConfig::new()
                .init(&out.logits.device())
                .forward(out.logits, out.targets)
        });
        (logits, senti_loss)
    }

    fn forward_eval(&self, token_ids: Tensor<B, 2, Int>) -> (Tensor<B, 2>, LexiconScore) {
        let logits = self.forward(token_ids.clone());
        let Some(out) = self.senti_forward(token_ids) else {
            return (logits, LexiconScore::default());
        };

        let total   = out.targets.dims()[0];
        let correct = out
            .logits
            .argmax(1)
            .flatten::<1>(0, 1)
            .equal(out.targets)
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>() as usize;
        (logits, LexiconScore::new(correct, total))
    }
}
