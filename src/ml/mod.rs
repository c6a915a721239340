// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Every network, layer and optimiser lives here.
//
//   complex.rs    — complex-valued building blocks: amplitude /
//                   phase embedding, n-gram windows, density-matrix
//                   mixture, measurements
//   pooling.rs    — pooling branches over measurement outputs
//   model.rs      — MultiTaskModel trait shared by both networks
//   mllm.rs       — SentiMLLM
//   fasttext.rs   — SentiFastText baseline
//   unitary.rs    — Cayley-transform optimiser for unitary kernels
//   trainer.rs    — multi-task train / test loop, checkpoints
//   inferencer.rs — loads a checkpoint and classifies sentences
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Wang et al. (2019) Semantic Hilbert Space for Text

pub mod complex;
pub mod pooling;
pub mod model;
pub mod mllm;
pub mod fasttext;
pub mod unitary;
pub mod trainer;
pub mod inferencer;
