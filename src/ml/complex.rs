// ============================================================
// Layer 5 — Complex-Valued Building Blocks
// ============================================================
// Quantum-inspired layers over burn tensors. A complex vector is
// carried as two real tensors (real, imag) of the same shape; a
// density matrix likewise as (ρ_real, ρ_imag) of shape [.., d, d].
//
//   word ids ──▶ ComplexEmbedding ──▶ (amplitude, phase)
//                                        │
//                          complex_multiply: amp·e^{iφ}
//                                        │
//                      NGram windows  [b, s, n, d]
//                                        │
//                 ComplexMixture  ρ = Σ_k w_k |ψ_k⟩⟨ψ_k|   [b, s, d, d]
//                                        │
//          ComplexProjMeasurement (unitary, back to [b, s, d])
//                   or ComplexMeasurement (probabilities [b, s, units])
//
// Conventions for |ψ⟩ = r + i·m:
//   Re(ψψ†) = r rᵀ + m mᵀ
//   Im(ψψ†) = m rᵀ − r mᵀ
// and the probability of ρ collapsing onto |v⟩ is
//   ⟨v|ρ|v⟩ = Σ_ij Re(ρ)_ij Re(P)_ij + Im(ρ)_ij Im(P)_ij,   P = |v⟩⟨v|
//
// Reference: Burn Book §3 (Building Blocks)

use burn::{
    module::Param,
    nn::Initializer,
    prelude::*,
    tensor::module::embedding,
};
use std::f32::consts::PI;

use crate::data::embedding::LookupTable;

const EPS: f64 = 1e-12;

// ─── Normalisation ────────────────────────────────────────────────────────────

/// Euclidean norm over the last dimension, kept as size 1.
/// The epsilon keeps the gradient finite for all-zero rows ([PAD]).
pub fn l2_norm<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    x.powf_scalar(2.0).sum_dim(D - 1).add_scalar(EPS).sqrt()
}

/// Scale every vector along the last dimension to unit length.
pub fn l2_normalize<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    let norm = l2_norm(x.clone()).clamp_min(EPS);
    x / norm
}

/// `amplitude · e^{i·phase}` as (real, imag).
pub fn complex_multiply<B: Backend, const D: usize>(
    phase:     Tensor<B, D>,
    amplitude: Tensor<B, D>,
) -> (Tensor<B, D>, Tensor<B, D>) {
    let real = amplitude.clone() * phase.clone().cos();
    let imag = amplitude * phase.sin();
    (real, imag)
}

// ─── NGram ────────────────────────────────────────────────────────────────────

/// Sliding windows of `gram_n` consecutive tokens.
///
/// `[b, s, d] → [b, s, n, d]`. The sequence is zero-padded with
/// `(n-1)/2` positions on the left and the rest on the right, so
/// window `i` is centred on token `i` for odd `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NGram {
    pub gram_n: usize,
}

impl NGram {
    pub fn new(gram_n: usize) -> Self {
        Self { gram_n: gram_n.max(1) }
    }

    pub fn forward<B: Backend>(&self, x: Tensor<B, 3>) -> Tensor<B, 4> {
        let [batch, seq_len, dim] = x.dims();
        let n      = self.gram_n;
        let left   = (n - 1) / 2;
        let right  = n - 1 - left;
        let device = x.device();

        let mut parts = Vec::with_capacity(3);
        if left > 0 {
            parts.push(Tensor::zeros([batch, left, dim], &device));
        }
        parts.push(x);
        if right > 0 {
            parts.push(Tensor::zeros([batch, right, dim], &device));
        }
        let padded = Tensor::cat(parts, 1);

        // Offset k of every window is the padded sequence shifted by k
        let shifted: Vec<Tensor<B, 3>> = (0..n)
            .map(|k| padded.clone().narrow(1, k, seq_len))
            .collect();
        Tensor::stack(shifted, 2)
    }
}

// ─── ComplexMixture ───────────────────────────────────────────────────────────

/// Mixes the pure states of each n-gram window into one density
/// matrix. `[b, s, n, d]` ×2 → `[b, s, d, d]` ×2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexMixture {
    pub use_weights: bool,
}

impl ComplexMixture {
    pub fn new(use_weights: bool) -> Self {
        Self { use_weights }
    }

    /// `weights` has shape `[b, s, n, 1]`; ignored (plain mean over
    /// the window) when the mixture is unweighted or no weights are given.
    pub fn forward<B: Backend>(
        &self,
        real:    Tensor<B, 4>,
        imag:    Tensor<B, 4>,
        weights: Option<Tensor<B, 4>>,
    ) -> (Tensor<B, 4>, Tensor<B, 4>) {
        let [batch, seq_len, _, dim] = real.dims();

        let r_col = real.clone().unsqueeze_dim::<5>(4); // [b, s, n, d, 1]
        let r_row = real.unsqueeze_dim::<5>(3);         // [b, s, n, 1, d]
        let m_col = imag.clone().unsqueeze_dim::<5>(4);
        let m_row = imag.unsqueeze_dim::<5>(3);

        let rho_real = r_col.clone() * r_row.clone() + m_col.clone() * m_row.clone();
        let rho_imag = m_col * r_row - r_col * m_row;

        let (rho_real, rho_imag) = match weights {
            Some(w) if self.use_weights => {
                let w = w.unsqueeze_dim::<5>(4); // [b, s, n, 1, 1]
                ((rho_real * w.clone()).sum_dim(2), (rho_imag * w).sum_dim(2))
            }
            _ => (rho_real.mean_dim(2), rho_imag.mean_dim(2)),
        };

        (
            rho_real.reshape([batch, seq_len, dim, dim]),
            rho_imag.reshape([batch, seq_len, dim, dim]),
        )
    }
}

// ─── Measurement ──────────────────────────────────────────────────────────────

/// Rank-one projectors |v⟩⟨v| for every row of (v_real, v_imag):
/// `[u, d]` → `[u, d, d]` ×2.
fn projectors<B: Backend>(v_real: Tensor<B, 2>, v_imag: Tensor<B, 2>) -> (Tensor<B, 3>, Tensor<B, 3>) {
    let r_col = v_real.clone().unsqueeze_dim::<3>(2);
    let r_row = v_real.unsqueeze_dim::<3>(1);
    let m_col = v_imag.clone().unsqueeze_dim::<3>(2);
    let m_row = v_imag.unsqueeze_dim::<3>(1);
    (
        r_col.clone() * r_row.clone() + m_col.clone() * m_row.clone(),
        m_col * r_row - r_col * m_row,
    )
}

/// Probability `⟨v|ρ|v⟩` of every density matrix for every
/// measurement vector: `[b, s, d, d]` → `[b, s, u]`.
pub fn measure<B: Backend>(
    rho_real: Tensor<B, 4>,
    rho_imag: Tensor<B, 4>,
    v_real:   Tensor<B, 2>,
    v_imag:   Tensor<B, 2>,
) -> Tensor<B, 3> {
    let [batch, seq_len, dim, _] = rho_real.dims();
    let [units, _] = v_real.dims();

    let (p_real, p_imag) = projectors(v_real, v_imag);
    let p_real = p_real.reshape([units, dim * dim]).transpose();
    let p_imag = p_imag.reshape([units, dim * dim]).transpose();

    let rho_real = rho_real.reshape([batch * seq_len, dim * dim]);
    let rho_imag = rho_imag.reshape([batch * seq_len, dim * dim]);

    (rho_real.matmul(p_real) + rho_imag.matmul(p_imag)).reshape([batch, seq_len, units])
}

/// Split a `[u, d, 2]` kernel into its real and imaginary `[u, d]` parts.
fn split_kernel<B: Backend>(kernel: Tensor<B, 3>) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let [units, dim, _] = kernel.dims();
    let real = kernel.clone().narrow(2, 0, 1).reshape([units, dim]);
    let imag = kernel.narrow(2, 1, 1).reshape([units, dim]);
    (real, imag)
}

// ─── ComplexEmbedding ─────────────────────────────────────────────────────────

/// Trainable amplitude and phase tables initialised from real
/// word vectors: amplitude = |x|, phase = π(1 − sign x)/2
/// (0 for positive components, π for negative, π/2 for zero).
#[derive(Module, Debug)]
pub struct ComplexEmbedding<B: Backend> {
    pub amplitude: Param<Tensor<B, 2>>,
    pub phase:     Param<Tensor<B, 2>>,
}

impl<B: Backend> ComplexEmbedding<B> {
    pub fn from_lookup(table: &LookupTable, device: &B::Device) -> Self {
        let shape = [table.rows(), table.dim()];
        let amplitude: Vec<f32> = table.values().iter().map(|v| v.abs()).collect();
        let phase: Vec<f32> = table
            .values()
            .iter()
            .map(|&v| {
                let sign = if v > 0.0 { 1.0 } else if v < 0.0 { -1.0 } else { 0.0 };
                PI * (1.0 - sign) / 2.0
            })
            .collect();

        Self {
            amplitude: Param::from_tensor(Tensor::from_data(TensorData::new(amplitude, shape), device)),
            phase:     Param::from_tensor(Tensor::from_data(TensorData::new(phase, shape), device)),
        }
    }

    /// `[b, s]` ids → (amplitude, phase), each `[b, s, d]`
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let amplitude = embedding(self.amplitude.val(), ids.clone());
        let phase     = embedding(self.phase.val(), ids);
        (amplitude, phase)
    }

    /// Unit-norm complex states of the given words, usable as
    /// measurement vectors: `[k]` ids → `[k, d]` ×2.
    pub fn word_states(&self, word_ids: Tensor<B, 1, Int>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let amplitude = l2_normalize(self.amplitude.val().select(0, word_ids.clone()));
        let phase     = self.phase.val().select(0, word_ids);
        complex_multiply(phase, amplitude)
    }

    pub fn dim(&self) -> usize {
        self.amplitude.val().dims()[1]
    }
}

// ─── ComplexMeasurement ───────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct ComplexMeasurementConfig {
    pub embed_dim: usize,
    pub units:     usize,
}

impl ComplexMeasurementConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ComplexMeasurement<B> {
        let kernel = Initializer::Uniform { min: 0.0, max: 1.0 }
            .init([self.units, self.embed_dim, 2], device);
        ComplexMeasurement { kernel }
    }
}

/// `units` trainable measurement vectors, kernel `[units, d, 2]`.
/// Rows are normalised on every forward pass, so the kernel itself
/// needs no constraint.
#[derive(Module, Debug)]
pub struct ComplexMeasurement<B: Backend> {
    pub kernel: Param<Tensor<B, 3>>,
}

impl<B: Backend> ComplexMeasurement<B> {
    /// `[b, s, d, d]` ×2 → probabilities `[b, s, units]`.
    /// An explicit `operator` (unit vectors `[units, d]` ×2) replaces the kernel.
    pub fn forward(
        &self,
        rho_real: Tensor<B, 4>,
        rho_imag: Tensor<B, 4>,
        operator: Option<(Tensor<B, 2>, Tensor<B, 2>)>,
    ) -> Tensor<B, 3> {
        let (v_real, v_imag) = operator.unwrap_or_else(|| self.vectors());
        measure(rho_real, rho_imag, v_real, v_imag)
    }

    /// Kernel rows scaled to unit complex norm
    pub fn vectors(&self) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let (real, imag) = split_kernel(self.kernel.val());
        let norm = (real.clone().powf_scalar(2.0) + imag.clone().powf_scalar(2.0))
            .sum_dim(1)
            .add_scalar(EPS)
            .sqrt();
        (real / norm.clone(), imag / norm)
    }

    pub fn units(&self) -> usize {
        self.kernel.val().dims()[0]
    }
}

// ─── ComplexProjMeasurement ───────────────────────────────────────────────────

/// Measures each density matrix in the basis of a trainable
/// unitary U (kernel `[d, d, 2]`, rows u_k) and returns the
/// collapsed pure state
///
///   ψ = Σ_k √p_k · u_k,   p_k = ⟨u_k|ρ|u_k⟩
///
/// The kernel starts as the identity and must be updated with the
/// unitary optimiser so its rows stay orthonormal.
#[derive(Module, Debug)]
pub struct ComplexProjMeasurement<B: Backend> {
    pub kernel: Param<Tensor<B, 3>>,
}

impl<B: Backend> ComplexProjMeasurement<B> {
    pub fn new(dim: usize, device: &B::Device) -> Self {
        let mut values = vec![0.0f32; dim * dim * 2];
        for i in 0..dim {
            values[(i * dim + i) * 2] = 1.0;
        }
        let kernel = Tensor::from_data(TensorData::new(values, [dim, dim, 2]), device);
        Self { kernel: Param::from_tensor(kernel) }
    }

    /// `[b, s, d, d]` ×2 → `[b, s, d]` ×2
    pub fn forward(&self, rho_real: Tensor<B, 4>, rho_imag: Tensor<B, 4>) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let (u_real, u_imag) = split_kernel(self.kernel.val());
        let probs = measure(rho_real, rho_imag, u_real.clone(), u_imag.clone());
        let [batch, seq_len, dim] = probs.dims();

        let amplitudes = probs
            .clamp_min(0.0)
            .add_scalar(EPS)
            .sqrt()
            .reshape([batch * seq_len, dim]);

        (
            amplitudes.clone().matmul(u_real).reshape([batch, seq_len, dim]),
            amplitudes.matmul(u_imag).reshape([batch, seq_len, dim]),
        )
    }
}
