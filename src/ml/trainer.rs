// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Multi-task train + test loop using Burn's DataLoader.
//
//   loss = CE(logits, label) + γ · lexicon loss   (multi-task)
//   loss = CE(logits, label)                      (single)
//
// Parameter groups:
//   - SentiMLLM with hidden layers: the projection-measurement
//     kernels are stepped by the unitary optimiser, everything
//     else by RMSprop. Their gradients are split with
//     GradientsParams::from_module before either step.
//   - Otherwise RMSprop updates every parameter.
//
// Burn notes:
//   - Training runs on an AutodiffBackend
//   - model.valid() returns the model on the inner backend,
//     so the test loader batches for B::InnerBackend
//   - argmax(1) returns [batch, 1], flattened before .equal()
//
// Reference: Burn Book §5, Hinton (2012) RMSprop lecture notes

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{GradientsParams, Optimizer, RmsPropConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::ProgressBar;

use crate::application::train_use_case::ExperimentConfig;
use crate::data::{
    batcher::{TextBatch, TextBatcher},
    dataset::{EncodedSample, TextDataset},
    embedding::LookupTable,
};
use crate::domain::experiment::{NetworkType, Strategy};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    fasttext::SentiFastText,
    mllm::SentiMllm,
    model::{LexiconScore, MultiTaskModel},
    unitary::UnitaryOptimizer,
};

/// Everything the trainer needs besides the config
pub struct TrainingInputs {
    pub train:      TextDataset,
    pub test:       TextDataset,
    pub table:      LookupTable,
    /// Vocabulary-aligned lexicon polarity (+1 / -1 / 0)
    pub lexicon:    Vec<f32>,
    pub vocab_size: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingReport {
    /// Epoch with the highest test accuracy (first one on ties)
    pub fn best(&self) -> Option<&EpochMetrics> {
        self.epochs.iter().fold(None, |best: Option<&EpochMetrics>, m| match best {
            Some(b) if !m.is_improvement(b.test_acc) => Some(b),
            _ => Some(m),
        })
    }

    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

/// Running loss and accuracy over the batches of one pass
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    loss_sum: f64,
    batches:  usize,
    correct:  usize,
    total:    usize,
}

impl RunningStats {
    pub fn record(&mut self, loss: f64, correct: usize, total: usize) {
        self.loss_sum += loss;
        self.batches  += 1;
        self.correct  += correct;
        self.total    += total;
    }

    pub fn mean_loss(&self) -> f64 {
        if self.batches > 0 { self.loss_sum / self.batches as f64 } else { f64::NAN }
    }

    pub fn accuracy(&self) -> f64 {
        if self.total > 0 { self.correct as f64 / self.total as f64 } else { 0.0 }
    }
}

// ─── Parameter updates ────────────────────────────────────────────────────────

/// One optimisation step on a model given the raw gradients
pub trait ParamUpdater<B: AutodiffBackend, M: AutodiffModule<B>> {
    fn step(&mut self, model: M, grads: B::Gradients) -> M;
}

/// A single optimiser over every parameter
pub struct RmsPropUpdater<O> {
    optim: O,
    lr:    f64,
}

impl<O> RmsPropUpdater<O> {
    pub fn new(optim: O, lr: f64) -> Self {
        Self { optim, lr }
    }
}

impl<B, M, O> ParamUpdater<B, M> for RmsPropUpdater<O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    fn step(&mut self, model: M, grads: B::Gradients) -> M {
        let grads = GradientsParams::from_grads(grads, &model);
        self.optim.step(self.lr, model, grads)
    }
}

/// RMSprop on everything except the projection kernels, which
/// get the unitary step
pub struct MllmUpdater<O, U> {
    rmsprop:    O,
    unitary:    U,
    lr:         f64,
    unitary_lr: f64,
}

impl<O, U> MllmUpdater<O, U> {
    pub fn new(rmsprop: O, unitary: U, lr: f64, unitary_lr: f64) -> Self {
        Self { rmsprop, unitary, lr, unitary_lr }
    }
}

impl<B, O, U> ParamUpdater<B, SentiMllm<B>> for MllmUpdater<O, U>
where
    B: AutodiffBackend,
    O: Optimizer<SentiMllm<B>, B>,
    U: Optimizer<SentiMllm<B>, B>,
{
    fn step(&mut self, model: SentiMllm<B>, mut grads: B::Gradients) -> SentiMllm<B> {
        let unitary_grads = GradientsParams::from_module(&mut grads, &model.proj_measurements);
        let rest = GradientsParams::from_grads(grads, &model);

        let model = self.rmsprop.step(self.lr, model, rest);
        self.unitary.step(self.unitary_lr, model, unitary_grads)
    }
}

fn rmsprop<B: AutodiffBackend, M: AutodiffModule<B>>() -> impl Optimizer<M, B> {
    RmsPropConfig::new().with_alpha(0.99).with_epsilon(1e-8).init()
}

// ─── Entry point ──────────────────────────────────────────────────────────────

/// Build the configured network and train it.
pub fn run_training<B: AutodiffBackend>(
    cfg:    &ExperimentConfig,
    inputs: TrainingInputs,
    ckpt:   &CheckpointManager,
    device: &B::Device,
) -> Result<TrainingReport> {
    let metrics = MetricsLogger::new(ckpt.dir())?;

    match cfg.network {
        NetworkType::Mllm => {
            let model_cfg = cfg.mllm_config(inputs.vocab_size)?;
            let model: SentiMllm<B> = model_cfg.init(&inputs.table, &inputs.lexicon, device)?;
            tracing::info!(
                "SentiMLLM ready: dim={}, {} hidden layer(s), {} measurement units, {} pooled features",
                model.complex_embed.dim(),
                model_cfg.num_hidden_layers(),
                model.measurement.units(),
                model_cfg.feature_count(),
            );

            if model.proj_measurements.is_empty() {
                let updater = RmsPropUpdater::new(rmsprop::<B, SentiMllm<B>>(), cfg.lr);
                fit(cfg, model, updater, inputs.train, inputs.test, ckpt, &metrics, device)
            } else {
                let updater = MllmUpdater::new(
                    rmsprop::<B, SentiMllm<B>>(),
                    UnitaryOptimizer::init::<B, SentiMllm<B>>(),
                    cfg.lr,
                    cfg.unitary_lr,
                );
                fit(cfg, model, updater, inputs.train, inputs.test, ckpt, &metrics, device)
            }
        }
        NetworkType::FastText => {
            let model: SentiFastText<B> =
                cfg.fasttext_config(inputs.vocab_size).init(&inputs.lexicon, device)?;
            tracing::info!("SentiFastText ready: embedding_dim={}", cfg.embedding_dim);
            let updater = RmsPropUpdater::new(rmsprop::<B, SentiFastText<B>>(), cfg.lr);
            fit(cfg, model, updater, inputs.train, inputs.test, ckpt, &metrics, device)
        }
    }
}

/// Number of correct arg-max predictions in a batch
fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

#[allow(clippy::too_many_arguments)]
fn fit<B, M, U>(
    cfg:       &ExperimentConfig,
    mut model: M,
    mut updater: U,
    train:     TextDataset,
    test:      TextDataset,
    ckpt:      &CheckpointManager,
    metrics:   &MetricsLogger,
    device:    &B::Device,
) -> Result<TrainingReport>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + MultiTaskModel<B>,
    M::InnerModule: MultiTaskModel<B::InnerBackend>,
    U: ParamUpdater<B, M>,
{
    let auxiliary   = cfg.strategy == Strategy::MultiTask;
    let num_batches = train.sample_count().div_ceil(cfg.batch_size);

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::<B, EncodedSample, TextBatch<B>>::new(TextBatcher::new())
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .set_device(device.clone())
        .build(train);

    // ── Test data loader (InnerBackend, no autodiff overhead) ─────────────────
    let test_loader =
        DataLoaderBuilder::<B::InnerBackend, EncodedSample, TextBatch<B::InnerBackend>>::new(TextBatcher::new())
            .batch_size(cfg.batch_size)
            .num_workers(1)
            .set_device(device.clone())
            .build(test);

    let ce = CrossEntropyLossConfig::new().init(device);
    let mut report = TrainingReport::default();

    for epoch in 1..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut stats = RunningStats::default();
        let pb = ProgressBar::new(num_batches as u64);

        for batch in train_loader.iter() {
            let total = batch.labels.dims()[0];
            let (logits, senti_loss) = model.forward_train(batch.token_ids, auxiliary);
            let correct = count_correct(logits.clone(), batch.labels.clone());

            let mut loss = ce.forward(logits, batch.labels);
            if let Some(senti_loss) = senti_loss {
                loss = loss + senti_loss.mul_scalar(cfg.gamma);
            }
            stats.record(loss.clone().into_scalar().elem::<f64>(), correct, total);

            let grads = loss.backward();
            model = updater.step(model, grads);

            pb.set_message(format!(
                "epoch {epoch} loss {:.4} acc {:.4}",
                stats.mean_loss(),
                stats.accuracy()
            ));
            pb.inc(1);
        }
        pb.finish_and_clear();

        // ── Test phase ────────────────────────────────────────────────────────
        let model_valid = model.valid();
        let (test_stats, senti) = evaluate(&model_valid, test_loader.iter());

        let m = EpochMetrics {
            epoch,
            train_loss: stats.mean_loss(),
            train_acc:  stats.accuracy(),
            test_loss:  test_stats.mean_loss(),
            test_acc:   test_stats.accuracy(),
            senti_acc:  senti.accuracy(),
        };

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | train_acc={:.4} | test_loss={:.4} | test_acc={:.4}{}",
            epoch,
            cfg.epochs,
            m.train_loss,
            m.train_acc,
            m.test_loss,
            m.test_acc,
            m.senti_acc.map(|a| format!(" | senti_acc={a:.4}")).unwrap_or_default(),
        );
        if report.best().map_or(true, |b| m.is_improvement(b.test_acc)) {
            tracing::info!("New best test accuracy {:.4} at epoch {}", m.test_acc, epoch);
        }

        metrics.log(&m)?;
        ckpt.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
        report.epochs.push(m);
    }

    tracing::info!("Training complete! Metrics in '{}'", metrics.csv_path().display());
    Ok(report)
}

/// Test loss/accuracy and the lexicon head's held-out score
pub fn evaluate<B, M>(
    model:   &M,
    batches: impl Iterator<Item = TextBatch<B>>,
) -> (RunningStats, LexiconScore)
where
    B: Backend,
    M: MultiTaskModel<B>,
{
    let mut stats = RunningStats::default();
    let mut senti = LexiconScore::default();

    for batch in batches {
        let total = batch.labels.dims()[0];
        let (logits, score) = model.forward_eval(batch.token_ids);
        let ce = CrossEntropyLossConfig::new().init(&logits.device());

        let correct = count_correct(logits.clone(), batch.labels.clone());
        let loss = ce.forward(logits, batch.labels).into_scalar().elem::<f64>();

        stats.record(loss, correct, total);
        senti += score;
    }
    (stats, senti)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::data::dataloader::batcher::Batcher;
    use nalgebra::DMatrix;
    use num_complex::Complex64;

    use crate::ml::{
        model::host_values,
        unitary::{from_interleaved, tests::unitarity_error},
    };

    type AD = Autodiff<NdArray>;

    const VOCAB: usize = 10;

    fn samples(n: usize) -> Vec<EncodedSample> {
        (0..n)
            .map(|i| {
                let label = i % 2;
                // positive sentences use ids 2,3; negative ones 4,5
                let ids = if label == 1 { vec![2, 3, 6, 7] } else { vec![4, 5, 8, 9] };
                EncodedSample::new(ids, label, 6, 0)
            })
            .collect()
    }

    fn inputs() -> TrainingInputs {
        let mut lexicon = vec![0.0; VOCAB];
        lexicon[2] = 1.0;
        lexicon[3] = 1.0;
        lexicon[4] = -1.0;
        lexicon[5] = -1.0;
        TrainingInputs {
            train:      TextDataset::new(samples(8)),
            test:       TextDataset::new(samples(4)),
            table:      LookupTable::random(VOCAB, 4, 1),
            lexicon,
            vocab_size: VOCAB,
        }
    }

    fn config(network: NetworkType, ngram: &str) -> ExperimentConfig {
        ExperimentConfig {
            network,
            embedding_dim: 4,
            max_sequence_length: 6,
            batch_size: 4,
            epochs: 2,
            ngram_value: ngram.to_string(),
            pooling_type: "max,average_col".to_string(),
            measurement_size: 2,
            hidden_units: Some(8),
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn test_running_stats() {
        let mut s = RunningStats::default();
        assert!(s.mean_loss().is_nan());
        assert_eq!(s.accuracy(), 0.0);
        s.record(1.0, 3, 4);
        s.record(0.5, 1, 4);
        assert_eq!(s.mean_loss(), 0.75);
        assert_eq!(s.accuracy(), 0.5);
    }

    #[test]
    fn test_report_best_prefers_first_maximum() {
        let m = |epoch, test_acc| EpochMetrics {
            epoch,
            train_loss: 0.0,
            train_acc:  0.0,
            test_loss:  0.0,
            test_acc,
            senti_acc:  None,
        };
        let report = TrainingReport { epochs: vec![m(1, 0.5), m(2, 0.7), m(3, 0.7)] };
        assert_eq!(report.best().unwrap().epoch, 2);
        assert_eq!(report.last().unwrap().epoch, 3);
        assert!(TrainingReport::default().best().is_none());
    }

    #[test]
    fn test_mllm_with_hidden_layer_trains_and_checkpoints() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();

        let report = run_training::<AD>(&config(NetworkType::Mllm, "1,3"), inputs(), &ckpt, &device).unwrap();
        assert_eq!(report.epochs.len(), 2);
        assert!(report.epochs.iter().all(|m| m.train_loss.is_finite() && m.test_loss.is_finite()));
        assert_eq!(ckpt.latest_epoch().unwrap(), 2);

        let csv = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_fasttext_single_strategy_trains() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();

        let mut cfg = config(NetworkType::FastText, "3");
        cfg.strategy = Strategy::Single;
        cfg.epochs = 1;

        let report = run_training::<AD>(&cfg, inputs(), &ckpt, &device).unwrap();
        let last = report.last().unwrap();
        assert!((0.0..=1.0).contains(&last.test_acc));
        assert!(last.train_loss.is_finite());
    }

    fn hidden_layer_mllm(device: &<AD as Backend>::Device) -> SentiMllm<AD> {
        let inputs = inputs();
        config(NetworkType::Mllm, "1,3")
            .mllm_config(VOCAB)
            .unwrap()
            .init(&inputs.table, &inputs.lexicon, device)
            .unwrap()
    }

    fn batch_loss(model: &SentiMllm<AD>, device: &<AD as Backend>::Device) -> Tensor<AD, 1> {
        let batch: TextBatch<AD> = TextBatcher::new().batch(samples(4), device);
        let (logits, senti) = model.forward_train(batch.token_ids, true);
        CrossEntropyLossConfig::new().init(device).forward(logits, batch.labels) + senti.unwrap()
    }

    fn proj_kernel(model: &SentiMllm<AD>) -> DMatrix<Complex64> {
        from_interleaved(4, &host_values(model.proj_measurements[0].kernel.val()).unwrap()).unwrap()
    }

    #[test]
    fn test_mllm_updater_keeps_projection_kernels_unitary() {
        let device    = Default::default();
        let mut model = hidden_layer_mllm(&device);
        let mut updater = MllmUpdater::new(
            rmsprop::<AD, SentiMllm<AD>>(),
            UnitaryOptimizer::init::<AD, SentiMllm<AD>>(),
            1e-2,
            0.1,
        );

        for _ in 0..5 {
            let grads = batch_loss(&model, &device).backward();
            model = updater.step(model, grads);
        }
        assert!(unitarity_error(&proj_kernel(&model)) < 1e-4);
    }

    #[test]
    fn test_rmsprop_leaves_projection_kernels_alone() {
        let device    = Default::default();
        let mut model = hidden_layer_mllm(&device);
        let kernel_before = proj_kernel(&model);
        let dense_before  = host_values(model.dense_2.weight.val()).unwrap();

        // unitary step disabled: only RMSprop moves anything
        let mut updater = MllmUpdater::new(
            rmsprop::<AD, SentiMllm<AD>>(),
            UnitaryOptimizer::init::<AD, SentiMllm<AD>>(),
            1e-2,
            0.0,
        );
        let grads = batch_loss(&model, &device).backward();
        model = updater.step(model, grads);

        assert_eq!(proj_kernel(&model), kernel_before);
        assert_ne!(host_values(model.dense_2.weight.val()).unwrap(), dense_before);
    }
}
